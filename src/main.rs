//! mqboard broker binary.

use log::error;

use mqboard::broker::Broker;
use mqboard::config::Config;

struct Args {
    config_path: String,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = "mqboard.toml".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                if i + 1 < args.len() {
                    config_path = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: -c requires a file path");
                    std::process::exit(1);
                }
            }
            "-h" | "--help" => {
                println!("mqboard - MQTT 3.1.1 broker with a status dashboard");
                println!();
                println!("Usage: mqboard [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>     Config file path (default: mqboard.toml)");
                println!("  -h, --help              Show this help message");
                println!();
                println!("Configuration:");
                println!("  Config file uses TOML format. All settings can be overridden");
                println!("  with environment variables using MQBOARD__ prefix:");
                println!();
                println!("  MQBOARD__SERVER__BIND=0.0.0.0:1884");
                println!("  MQBOARD__HTTP__BIND=0.0.0.0:8081");
                println!("  MQBOARD__MQTT__QOS_TIMEOUT_MS=2000");
                println!("  MQBOARD__LOG__LEVEL=debug");
                std::process::exit(0);
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
        }
    }

    Args { config_path }
}

fn main() {
    // Parse CLI args first (only for config path and help)
    let args = parse_args();

    // Load configuration from file + environment variables
    let config = match Config::load(&args.config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logger with configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.log.level),
    )
    .init();

    let mut broker = match Broker::new(config) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to start broker: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = broker.run() {
        error!("Broker error: {}", e);
        std::process::exit(1);
    }
}
