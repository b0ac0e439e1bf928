//! Attribute path resolution
//!
//! Keys of an `attributes` filter address nested values with `:`, e.g.
//! `hvac_modes:0` or `color:rgb:1`. Anything after the first space is
//! ignored, which lets one mapping test the same attribute twice
//! (`brightness 1: ">10"`, `brightness 2: "<200"`).

use ha_core::Attributes;
use serde_json::Value;

/// Split an attribute filter key into its path segments
pub fn parse_attribute_key(key: &str) -> Vec<String> {
    let key = key.split(' ').next().unwrap_or_default();
    key.split(':').map(str::to_string).collect()
}

/// Walk `path` into `attributes`
///
/// Returns `None` as soon as a segment cannot be followed, and for a
/// `null` leaf.
pub fn resolve<'a>(path: &[String], attributes: &'a Attributes) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = attributes.get(first.as_str())?;
    for key in rest {
        current = step(current, key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn step<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => {
            let index = key.trim().parse::<i64>().ok()?;
            // Negative indexes count from the end
            let index = if index < 0 {
                index.checked_add(i64::try_from(items.len()).ok()?)?
            } else {
                index
            };
            items.get(usize::try_from(index).ok()?)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs() -> Attributes {
        json!({
            "brightness": 180,
            "hvac_modes": ["off", "heat", "cool"],
            "color": {"rgb": [255, 128, 0], "name": "orange"},
            "unset": null
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn path(key: &str) -> Vec<String> {
        parse_attribute_key(key)
    }

    #[test]
    fn test_parse_attribute_key() {
        assert_eq!(path("brightness"), vec!["brightness"]);
        assert_eq!(path("color:rgb:1"), vec!["color", "rgb", "1"]);
        assert_eq!(path("brightness 2"), vec!["brightness"]);
        assert_eq!(path("color:name extra words"), vec!["color", "name"]);
    }

    #[test]
    fn test_resolve_nested() {
        let attrs = attrs();
        assert_eq!(resolve(&path("brightness"), &attrs), Some(&json!(180)));
        assert_eq!(resolve(&path("hvac_modes:1"), &attrs), Some(&json!("heat")));
        assert_eq!(resolve(&path("hvac_modes:-1"), &attrs), Some(&json!("cool")));
        assert_eq!(resolve(&path("color:rgb:2"), &attrs), Some(&json!(0)));
        assert_eq!(resolve(&path("color:name"), &attrs), Some(&json!("orange")));
        assert_eq!(
            resolve(&path("color"), &attrs),
            Some(&json!({"rgb": [255, 128, 0], "name": "orange"}))
        );
    }

    #[test]
    fn test_resolve_missing() {
        let attrs = attrs();
        assert_eq!(resolve(&path("missing"), &attrs), None);
        assert_eq!(resolve(&path("missing:deeper"), &attrs), None);
        assert_eq!(resolve(&path("hvac_modes:9"), &attrs), None);
        assert_eq!(resolve(&path("hvac_modes:-4"), &attrs), None);
        assert_eq!(resolve(&path("hvac_modes:first"), &attrs), None);
        assert_eq!(resolve(&path("brightness:0"), &attrs), None);
        assert_eq!(resolve(&path("unset"), &attrs), None);
        assert_eq!(resolve(&[], &attrs), None);
    }
}
