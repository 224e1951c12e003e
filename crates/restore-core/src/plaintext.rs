//! Guard against plaintext value material reaching a plan.

use restore_canonical::{CanonicalValue, ValuePath};

/// Keys that only ever hold plaintext row images.
const PLAINTEXT_KEYS: [&str; 3] = ["diff_plain", "before_image_plain", "after_image_plain"];

/// Returns the location of the first plaintext field in `value`, if any.
///
/// A `snapshot` key counts as plaintext unless it holds an object with a
/// `ciphertext` member.
pub fn find_plaintext(value: &CanonicalValue) -> Option<ValuePath> {
    walk(value, ValuePath::root())
}

fn walk(value: &CanonicalValue, path: ValuePath) -> Option<ValuePath> {
    match value {
        CanonicalValue::Object(map) => map.iter().find_map(|(key, child)| {
            let child_path = path.child(key.as_str());
            if PLAINTEXT_KEYS.contains(&key.as_str()) || (key == "snapshot" && !is_encrypted(child)) {
                return Some(child_path);
            }
            walk(child, child_path)
        }),
        CanonicalValue::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(idx, item)| walk(item, path.child(idx))),
        _ => None,
    }
}

fn is_encrypted(value: &CanonicalValue) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("ciphertext"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(value: serde_json::Value) -> CanonicalValue {
        CanonicalValue::try_from(&value).unwrap()
    }

    #[test]
    fn clean_values_pass() {
        let value = canonical(json!({"rows": [{"values": {"ciphertext": "x"}}]}));
        assert_eq!(find_plaintext(&value), None);
    }

    #[test]
    fn plain_image_is_located() {
        let value = canonical(json!({"rows": [{}, {"metadata": {"after_image_plain": {}}}]}));
        let path = find_plaintext(&value).unwrap();
        assert_eq!(path.to_string(), "rows.[1].metadata.after_image_plain");
    }

    #[test]
    fn encrypted_snapshot_is_allowed() {
        let ok = canonical(json!({"snapshot": {"ciphertext": "x", "iv": "y"}}));
        assert_eq!(find_plaintext(&ok), None);
        let leak = canonical(json!({"snapshot": {"short_description": "x"}}));
        assert!(find_plaintext(&leak).is_some());
    }
}
