//! Topic filter matching for `+` and `#` wildcards.

/// Check if a concrete topic matches a topic filter.
///
/// `+` matches exactly one level, `#` matches the rest of the topic and must
/// be the last level of the filter. `$`-prefixed topics get no special
/// treatment.
pub fn matches(topic: &str, filter: &str) -> bool {
    let topic_levels: Vec<&str> = topic.split('/').collect();
    let filter_levels: Vec<&str> = filter.split('/').collect();

    let mut ti = 0;
    let mut fi = 0;

    while fi < filter_levels.len() {
        let filter_level = filter_levels[fi];

        if filter_level == "#" {
            // Multi-level wildcard matches everything from here,
            // including the parent level itself ("a" matches "a/#")
            return true;
        }

        if ti >= topic_levels.len() {
            // Topic has fewer levels than filter
            return false;
        }

        if filter_level == "+" || filter_level == topic_levels[ti] {
            ti += 1;
            fi += 1;
        } else {
            return false;
        }
    }

    // Both must be fully consumed
    ti == topic_levels.len()
}
