// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Semantic label space shared by every stage

use kestrel_config::{parse_label_names, LabelSpaceConfig};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::{Result, StateError};

/// Validated label space
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSpace {
    total_labels: usize,
    dynamic_labels: BTreeSet<u32>,
    invalid_labels: BTreeSet<u32>,
    names: BTreeMap<u32, String>,
}

impl LabelSpace {
    pub fn new(total_labels: usize) -> Result<Self> {
        if total_labels == 0 {
            return Err(StateError::InvalidLabelSpace(
                "total_labels must be positive".to_string(),
            ));
        }
        Ok(Self {
            total_labels,
            dynamic_labels: BTreeSet::new(),
            invalid_labels: BTreeSet::new(),
            names: BTreeMap::new(),
        })
    }

    /// Build from configuration, parsing label names leniently
    pub fn from_config(config: &LabelSpaceConfig) -> Result<Self> {
        let mut space = Self::new(config.total_labels)?;
        space.dynamic_labels = space.checked_set("dynamic_labels", &config.dynamic_labels)?;
        space.invalid_labels = space.checked_set("invalid_labels", &config.invalid_labels)?;
        if let Some(raw) = &config.label_names {
            space.names = parse_label_names(raw);
        }
        Ok(space)
    }

    fn checked_set(&self, field: &str, labels: &[u32]) -> Result<BTreeSet<u32>> {
        match labels.iter().find(|&&l| l as usize >= self.total_labels) {
            Some(label) => Err(StateError::InvalidLabelSpace(format!(
                "{} contains label {} but total_labels is {}",
                field, label, self.total_labels
            ))),
            None => Ok(labels.iter().copied().collect()),
        }
    }

    pub fn total_labels(&self) -> usize {
        self.total_labels
    }

    pub fn is_dynamic(&self, label: u32) -> bool {
        self.dynamic_labels.contains(&label)
    }

    /// In range and not marked invalid
    pub fn is_valid(&self, label: u32) -> bool {
        (label as usize) < self.total_labels && !self.invalid_labels.contains(&label)
    }

    pub fn name(&self, label: u32) -> Option<&str> {
        self.names.get(&label).map(String::as_str)
    }

    pub fn names(&self) -> &BTreeMap<u32, String> {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config: LabelSpaceConfig = kestrel_config::toml::from_str(
            r#"
            total_labels = 6
            dynamic_labels = [2]
            invalid_labels = [5]
            label_names = [{ label = 2, name = "person" }, { name = "orphan" }]
            "#,
        )
        .unwrap();
        let space = LabelSpace::from_config(&config).unwrap();

        assert_eq!(space.total_labels(), 6);
        assert!(space.is_dynamic(2));
        assert!(space.is_valid(4));
        assert!(!space.is_valid(5));
        assert!(!space.is_valid(6));
        assert_eq!(space.name(2), Some("person"));
        assert_eq!(space.names().len(), 1);
    }

    #[test]
    fn test_rejects_out_of_range_labels() {
        let config = LabelSpaceConfig {
            total_labels: 3,
            dynamic_labels: vec![3],
            ..Default::default()
        };
        assert!(matches!(
            LabelSpace::from_config(&config),
            Err(StateError::InvalidLabelSpace(_))
        ));
    }

    #[test]
    fn test_rejects_empty_space() {
        assert!(LabelSpace::new(0).is_err());
    }
}
