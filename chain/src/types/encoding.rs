//! Canonical JSON encoding for signed wire types.
//!
//! Every request and response exchanged between proposers and builders is
//! signed over a canonical JSON form with the following properties:
//!
//! - object keys sorted lexicographically at every level,
//! - no HTML escaping (`<`, `>`, `&` appear literally),
//! - heights rendered as decimal strings,
//! - byte slices rendered as padded standard base64,
//! - missing lists rendered as `[]`, missing byte slices as `""`,
//! - every key ending in `signature` stripped,
//! - no trailing newline.
//!
//! `serde_json` already sorts object keys (its map is a `BTreeMap`) and does
//! not escape HTML, so the canonical form falls out of serializing through
//! `serde_json::Value` and pruning signature keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Produces the canonical sign bytes for a wire value.
///
/// Callers are expected to blank any signature fields on a copy of the value
/// first; this function additionally strips every object key ending in
/// `signature`, at any depth, as a second line of defense.
///
/// # Panics
///
/// Panics if the value cannot be serialized to JSON. All wire types are
/// plain data, so a failure here is a programming error.
pub(crate) fn sign_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    let mut json = serde_json::to_value(value).expect("wire types should serialize to JSON");
    strip_signature_keys(&mut json);
    serde_json::to_vec(&json).expect("canonical JSON value should re-serialize")
}

fn strip_signature_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.ends_with("signature"));
            for inner in map.values_mut() {
                strip_signature_keys(inner);
            }
        }
        Value::Array(items) => {
            for inner in items {
                strip_signature_keys(inner);
            }
        }
        _ => {}
    }
}

/// `true` if an integer field should be omitted from the encoding.
pub(crate) fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Serde adapter: `i64` as a decimal string, for fields named `height`.
pub(crate) mod int_as_string {
    use super::*;

    pub fn serialize<S: Serializer>(n: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(n)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Vec<u8>` as padded standard base64.
pub(crate) mod base64_bytes {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Vec<Vec<u8>>` as a list of padded standard base64 strings.
pub(crate) mod base64_list {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    pub fn serialize<S: Serializer>(
        items: &Vec<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(|b| STANDARD.encode(b)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .into_iter()
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Nested {
        inner_signature: Vec<u8>,
        value: u32,
    }

    #[derive(Serialize)]
    struct Outer {
        b_field: String,
        a_field: String,
        signature: Vec<u8>,
        nested: Nested,
    }

    #[test]
    fn keys_are_sorted_and_signatures_stripped() {
        let outer = Outer {
            b_field: "b".into(),
            a_field: "a".into(),
            signature: vec![1, 2, 3],
            nested: Nested {
                inner_signature: vec![4],
                value: 7,
            },
        };

        let bytes = sign_bytes(&outer);
        let text = String::from_utf8(bytes).expect("sign bytes are UTF-8");

        assert_eq!(
            text,
            r#"{"a_field":"a","b_field":"b","nested":{"value":7}}"#
        );
    }

    #[test]
    fn html_is_not_escaped() {
        #[derive(Serialize)]
        struct V {
            s: String,
        }
        let bytes = sign_bytes(&V {
            s: "<script>&</script>".into(),
        });
        assert_eq!(
            String::from_utf8(bytes).expect("utf-8"),
            r#"{"s":"<script>&</script>"}"#
        );
    }
}
