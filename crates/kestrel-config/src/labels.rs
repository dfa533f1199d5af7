// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lenient parsing of semantic label names

use std::collections::BTreeMap;
use tracing::warn;

/// Parse `label_names` entries of the form `{ label = N, name = "..." }`.
///
/// A value that is not an array yields an empty map. Entries missing either
/// key, or with the wrong types, are skipped. Both cases are logged.
pub fn parse_label_names(value: &toml::Value) -> BTreeMap<u32, String> {
    let mut names = BTreeMap::new();

    let Some(entries) = value.as_array() else {
        warn!("[CONFIG] Failed to parse object label names");
        return names;
    };

    for entry in entries {
        let label = entry
            .get("label")
            .and_then(toml::Value::as_integer)
            .and_then(|l| u32::try_from(l).ok());
        let name = entry.get("name").and_then(toml::Value::as_str);

        match (label, name) {
            (Some(label), Some(name)) => {
                names.insert(label, name.to_string());
            }
            _ => warn!("[CONFIG] Label names not formatted correctly: {}", entry),
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(src: &str) -> toml::Value {
        let table: toml::Table = toml::from_str(src).unwrap();
        table["label_names"].clone()
    }

    #[test]
    fn test_parses_well_formed_entries() {
        let names = parse_label_names(&value(
            r#"label_names = [{ label = 0, name = "wall" }, { label = 3, name = "chair" }]"#,
        ));
        assert_eq!(names.len(), 2);
        assert_eq!(names[&3], "chair");
    }

    #[test]
    fn test_skips_malformed_entries() {
        let names = parse_label_names(&value(
            r#"label_names = [{ label = 1 }, { label = "two", name = "x" }, { label = 5, name = "door" }, 7]"#,
        ));
        assert_eq!(names.len(), 1);
        assert_eq!(names[&5], "door");
    }

    #[test]
    fn test_non_array_yields_empty() {
        let names = parse_label_names(&value(r#"label_names = "wall""#));
        assert!(names.is_empty());
    }
}
