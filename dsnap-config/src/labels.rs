//! `key=value,key=value` label strings.

use indexmap::IndexMap;

/// Insertion-ordered label map; re-inserting a key keeps its first position.
pub type LabelSet = IndexMap<String, String>;

/// Parse a comma-separated `key=value` list.
///
/// Spaces are removed everywhere and empty fragments (`,,`, leading or
/// trailing commas) are ignored. A fragment without `=` or with an empty key
/// is rejected so a typo in the configuration fails the run up front.
pub fn parse_label_pairs(input: &str) -> Result<LabelSet, String> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut labels = LabelSet::new();

    for fragment in compact.split(',').filter(|f| !f.is_empty()) {
        match fragment.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                labels.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(format!(
                    "invalid label '{}' in '{}', expected key=value",
                    fragment, input
                ))
            }
        }
    }

    Ok(labels)
}

/// Render labels back to the `key=value,...` form the cloud CLI expects.
pub fn render_labels(labels: &LabelSet) -> String {
    let joined = labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");
    let compact: String = joined.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_matches(',').to_string()
}
