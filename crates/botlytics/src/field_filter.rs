//! 🔍 Field filter: which columns leave the building.
//!
//! A record is rendered to a JSON object exactly once, at append time. With no filter
//! that's a straight `serde_json::to_string`. With an allow-list or deny-list the record
//! goes through a `Value` map first and the columns that didn't make the cut are omitted
//! outright (not nulled, not zeroed; gone). The map keeps insertion order, so a filtered
//! record lists its surviving columns in the same order as an unfiltered one.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::{ConfigError, DispatcherConfig};
use crate::schema::NormalizedRecord;

/// 🎯 The projection applied to every record before buffering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldFilter {
    /// Every field, as serde renders it.
    #[default]
    All,
    /// Only these fields.
    Include(HashSet<String>),
    /// Every field except these.
    Exclude(HashSet<String>),
}

impl FieldFilter {
    /// 🏗️ Build from the dispatcher config. Runs the same checks as
    /// [`DispatcherConfig::validate`] for the two lists.
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, ConfigError> {
        match (&config.include, &config.exclude) {
            (Some(_), Some(_)) => Err(ConfigError::IncludeAndExclude),
            (Some(names), None) => Ok(FieldFilter::Include(known_names(names)?)),
            (None, Some(names)) => Ok(FieldFilter::Exclude(known_names(names)?)),
            (None, None) => Ok(FieldFilter::All),
        }
    }

    fn keeps(&self, field: &str) -> bool {
        match self {
            FieldFilter::All => true,
            FieldFilter::Include(names) => names.contains(field),
            FieldFilter::Exclude(names) => !names.contains(field),
        }
    }

    /// 📦 Render one record as a JSON object string, minus whatever we were told to drop.
    pub fn render(&self, record: &NormalizedRecord) -> Result<String> {
        if matches!(self, FieldFilter::All) {
            return serde_json::to_string(record)
                .context("💀 A record refused to become JSON. It had one job.");
        }
        let mut rendered = serde_json::to_value(record)
            .context("💀 A record refused to become a JSON value on its way through the filter")?;
        if let Value::Object(fields) = &mut rendered {
            fields.retain(|name, _| self.keeps(name));
        }
        serde_json::to_string(&rendered).context("💀 The filtered record would not re-serialize")
    }
}

fn known_names(names: &[String]) -> Result<HashSet<String>, ConfigError> {
    names
        .iter()
        .map(|name| {
            if crate::schema::is_known_field(name) {
                Ok(name.clone())
            } else {
                Err(ConfigError::UnknownField(name.clone()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UpdateKind;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            update_type: UpdateKind::Message,
            to: 1,
            from: 2,
            message_text: "hello".into(),
            payload: r#"{"update_id":1}"#.into(),
            ..NormalizedRecord::default()
        }
    }

    fn keys(rendered: &str) -> Result<Vec<String>> {
        let value: Value = serde_json::from_str(rendered)?;
        let mut keys: Vec<String> = value
            .as_object()
            .context("💀 rendered record is not an object")?
            .keys()
            .cloned()
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    #[test]
    fn the_one_where_the_allow_list_is_all_you_get() -> Result<()> {
        let mut config = DispatcherConfig::new("http://collector.local");
        config.include = Some(vec!["type".into(), "from".into()]);
        let filter = FieldFilter::from_config(&config)?;
        let rendered = filter.render(&record())?;
        assert_eq!(keys(&rendered)?, vec!["from", "type"]);
        let value: Value = serde_json::from_str(&rendered)?;
        assert_eq!(value["type"], 1);
        assert_eq!(value["from"], 2);
        Ok(())
    }

    #[test]
    fn the_one_where_the_payload_is_left_at_the_door() -> Result<()> {
        let mut config = DispatcherConfig::new("http://collector.local");
        config.exclude = Some(vec!["payload".into()]);
        let filter = FieldFilter::from_config(&config)?;
        let rendered = keys(&filter.render(&record())?)?;
        assert_eq!(rendered.len(), crate::schema::FIELD_NAMES.len() - 1);
        assert!(!rendered.iter().any(|k| k == "payload"));
        Ok(())
    }

    #[test]
    fn the_one_where_filtering_does_not_shuffle_the_columns() -> Result<()> {
        let filter = FieldFilter::Exclude(["payload".to_string()].into_iter().collect());
        let rendered: Value = serde_json::from_str(&filter.render(&record())?)?;
        let in_order: Vec<&str> = rendered
            .as_object()
            .context("💀 rendered record is not an object")?
            .keys()
            .map(String::as_str)
            .collect();
        let expected: Vec<&str> = crate::schema::FIELD_NAMES
            .iter()
            .copied()
            .filter(|name| *name != "payload")
            .collect();
        assert_eq!(in_order, expected);
        Ok(())
    }

    #[test]
    fn the_one_where_no_filter_means_everything() -> Result<()> {
        let rendered = FieldFilter::All.render(&record())?;
        assert_eq!(keys(&rendered)?.len(), crate::schema::FIELD_NAMES.len());
        Ok(())
    }

    #[test]
    fn the_one_where_bad_lists_never_become_filters() {
        let mut config = DispatcherConfig::new("http://collector.local");
        config.include = Some(vec!["type".into(), "fromm".into()]);
        assert_eq!(
            FieldFilter::from_config(&config),
            Err(ConfigError::UnknownField("fromm".into()))
        );
        config.exclude = Some(vec![]);
        assert_eq!(
            FieldFilter::from_config(&config),
            Err(ConfigError::IncludeAndExclude)
        );
    }
}
