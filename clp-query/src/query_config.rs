//! Search job configuration and its MessagePack wire format.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration of a single search job, stored in the `job_config` column.
///
/// Field names and declaration order are the map the scheduler decodes.
/// Timestamps are inclusive epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    begin_timestamp: i64,
    dataset: Option<String>,
    end_timestamp: i64,
    ignore_case: bool,
    max_num_results: u32,
    query_string: String,
}

impl QueryConfig {
    /// Build a case-insensitive search over `[begin_ts, end_ts]`.
    ///
    /// Fails with [`Error::InvalidRange`] when `end_ts < begin_ts`.
    pub fn new(
        query: impl Into<String>,
        begin_ts: i64,
        end_ts: i64,
        max_num_results: u32,
    ) -> Result<Self> {
        if end_ts < begin_ts {
            return Err(Error::InvalidRange { begin_ts, end_ts });
        }

        Ok(Self {
            begin_timestamp: begin_ts,
            dataset: None,
            end_timestamp: end_ts,
            ignore_case: true,
            max_num_results,
            query_string: query.into(),
        })
    }

    /// Restrict the search to one dataset.
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Match case exactly.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.ignore_case = false;
        self
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn begin_timestamp(&self) -> i64 {
        self.begin_timestamp
    }

    pub fn end_timestamp(&self) -> i64 {
        self.end_timestamp
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn max_num_results(&self) -> u32 {
        self.max_num_results
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    /// Encode as a MessagePack map keyed by field name.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn rejects_reversed_range() {
        let err = QueryConfig::new("error", 100, 99, 1000).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRange {
                begin_ts: 100,
                end_ts: 99
            }
        ));
    }

    #[test]
    fn accepts_single_instant_range() {
        let config = QueryConfig::new("error", 100, 100, 1000).unwrap();
        assert_eq!(config.begin_timestamp(), 100);
        assert_eq!(config.end_timestamp(), 100);
    }

    #[test]
    fn defaults_to_case_insensitive_without_dataset() {
        let config = QueryConfig::new("timeout", 0, 10, 1000).unwrap();
        assert!(config.ignore_case());
        assert_eq!(config.dataset(), None);

        let config = config.case_sensitive().with_dataset("default");
        assert!(!config.ignore_case());
        assert_eq!(config.dataset(), Some("default"));
    }

    #[test]
    fn encodes_scheduler_map_keys() {
        let config = QueryConfig::new("level: ERROR", 1, 1_790_790_051_822, 1000).unwrap();
        let bytes = config.encode().unwrap();

        let decoded: BTreeMap<String, Value> = rmp_serde::from_slice(&bytes).unwrap();
        let keys: Vec<&str> = decoded.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "begin_timestamp",
                "dataset",
                "end_timestamp",
                "ignore_case",
                "max_num_results",
                "query_string",
            ]
        );
        assert_eq!(decoded["begin_timestamp"], json!(1));
        assert_eq!(decoded["dataset"], Value::Null);
        assert_eq!(decoded["end_timestamp"], json!(1_790_790_051_822_i64));
        assert_eq!(decoded["ignore_case"], json!(true));
        assert_eq!(decoded["max_num_results"], json!(1000));
        assert_eq!(decoded["query_string"], json!("level: ERROR"));
    }
}
