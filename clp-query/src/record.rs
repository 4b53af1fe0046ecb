//! Result records and the per-job results metadata document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::job::JobId;

/// One search result as stored in the results cache.
///
/// The schema belongs to the query engine; at minimum it carries a
/// `timestamp` and a `message`.
pub type Record = Map<String, Value>;

/// Name of the shared collection holding one metadata document per job.
pub const RESULTS_METADATA_COLLECTION: &str = "results-metadata";

/// Field the results cache uses as the document identifier.
pub const RECORD_ID_FIELD: &str = "_id";

/// Signal written at submission time, before the engine reports anything.
pub const SIGNAL_QUERYING: &str = "resp-querying";

/// Engine name recorded for jobs submitted by this client.
pub const QUERY_ENGINE_CLP: &str = "clp";

/// Query-engine-level outcome of a job, one document per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsMetadata {
    #[serde(rename = "_id")]
    pub id: String,
    pub last_signal: String,
    pub error_name: Option<String>,
    pub error_msg: Option<String>,
    pub query_engine: String,
}

impl ResultsMetadata {
    /// Metadata for a job that has just been queued.
    #[must_use]
    pub fn querying(job_id: JobId) -> Self {
        Self {
            id: job_id.to_string(),
            last_signal: SIGNAL_QUERYING.to_string(),
            error_name: None,
            error_msg: None,
            query_engine: QUERY_ENGINE_CLP.to_string(),
        }
    }
}

/// Drop store-internal fields from a record before handing it to callers.
#[must_use]
pub fn clean_record(mut record: Record) -> Value {
    record.remove(RECORD_ID_FIELD);
    Value::Object(record)
}

/// Clean every record, preserving order.
#[must_use]
pub fn clean_records(records: Vec<Record>) -> Vec<Value> {
    records.into_iter().map(clean_record).collect()
}
