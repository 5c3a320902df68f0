use serde::{Deserialize, Deserializer};

/// Deserialize an explicit `null` as the type's default.
///
/// Upstream writes empty lists and strings as `null` about as often as it
/// leaves them out, and `#[serde(default)]` only covers the latter.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Holder {
        #[serde(deserialize_with = "null_as_default")]
        names: Vec<String>,
        #[serde(deserialize_with = "null_as_default")]
        label: String,
    }

    #[test]
    fn test_null_missing_and_present() {
        let nulls: Holder = serde_json::from_str(r#"{"names": null, "label": null}"#).unwrap();
        assert!(nulls.names.is_empty());
        assert_eq!(nulls.label, "");

        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert!(missing.names.is_empty());

        let present: Holder = serde_json::from_str(r#"{"names": ["a"], "label": "b"}"#).unwrap();
        assert_eq!(present.names, vec!["a".to_string()]);
        assert_eq!(present.label, "b");
    }
}
