//! MongoDB-backed results cache.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ResultsCacheConfig;
use crate::error::Result;
use crate::job::JobId;
use crate::record::{RESULTS_METADATA_COLLECTION, Record, ResultsMetadata};
use crate::traits::ResultsStore;

/// Results cache where each job's records live in a collection named by
/// its id.
#[derive(Clone)]
pub struct MongoResultsStore {
    db: Database,
}

impl MongoResultsStore {
    /// Connect to the results cache described by `config`.
    ///
    /// The driver connects lazily; errors here are URI or topology errors.
    pub async fn connect(config: &ResultsCacheConfig) -> Result<Self> {
        let client = Client::with_uri_str(config.connection_uri()).await?;
        debug!(uri = %config.connection_uri(), db = %config.db_name, "Results cache client ready");
        Ok(Self {
            db: client.database(&config.db_name),
        })
    }
}

/// Convert a stored document into a JSON record using relaxed extended JSON.
fn document_to_record(document: Document) -> Record {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

#[async_trait]
impl ResultsStore for MongoResultsStore {
    #[instrument(skip(self), level = "debug")]
    async fn create_container(&self, job_id: JobId) -> Result<()> {
        self.db.create_collection(job_id.to_string()).await?;
        Ok(())
    }

    #[instrument(skip(self, metadata), fields(id = %metadata.id), level = "debug")]
    async fn write_metadata(&self, metadata: &ResultsMetadata) -> Result<()> {
        let document = mongodb::bson::to_document(metadata)?;
        self.db
            .collection::<Document>(RESULTS_METADATA_COLLECTION)
            .insert_one(document)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn read_results(&self, job_id: JobId) -> Result<Option<Vec<Record>>> {
        let name = job_id.to_string();
        let existing = self
            .db
            .list_collection_names()
            .filter(doc! { "name": &name })
            .await?;
        if existing.is_empty() {
            return Ok(None);
        }

        let mut cursor = self.db.collection::<Document>(&name).find(doc! {}).await?;
        let mut records = Vec::new();
        while cursor.advance().await? {
            records.push(document_to_record(cursor.deserialize_current()?));
        }

        debug!(count = records.len(), "Read query results");
        Ok(Some(records))
    }
}
