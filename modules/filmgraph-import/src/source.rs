//! Raw document sources.
//!
//! Sources are pull-driven: the orchestrator asks for one record at a time,
//! so extraction never runs ahead of the batch being filled.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Cursor};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use filmgraph_common::{FieldMap, RawRecord, SourceConfig};

use crate::normalize::parse_identifier;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid identifier exclusion pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[async_trait]
pub trait DocumentSource: Send {
    /// Next raw record, or `None` once the source is exhausted.
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError>;

    /// Best-effort record count for progress reporting.
    fn estimated_total(&self) -> Option<u64> {
        None
    }
}

// ---------------------------------------------------------------------------
// MongoSource
// ---------------------------------------------------------------------------

/// Streams a filtered, projected cursor over one collection.
pub struct MongoSource {
    cursor: Cursor<Document>,
    estimated: Option<u64>,
}

impl MongoSource {
    pub async fn open(
        uri: &str,
        source: &SourceConfig,
        fields: &FieldMap,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        let client = Client::with_uri_str(uri).await?;
        let collection: Collection<Document> = client
            .database(&source.database)
            .collection(&source.collection);

        let id_key = fields.source_id.first().map(String::as_str).unwrap_or("_id");
        let mut filter = Document::new();
        if !source.exclude_id_pattern.is_empty() {
            filter.insert(
                id_key,
                doc! { "$not": { "$regex": source.exclude_id_pattern.as_str() } },
            );
        }

        let mut projection = Document::new();
        for key in fields.all_keys() {
            projection.insert(key, 1);
        }

        let estimated = match collection.count_documents(filter.clone(), None).await {
            Ok(n) => Some(n),
            Err(e) => {
                debug!(error = %e, "Could not count source documents");
                None
            }
        };

        let options = FindOptions::builder()
            .projection(projection)
            .batch_size(batch_size.min(u32::MAX as usize) as u32)
            .build();
        let cursor = collection.find(filter, options).await?;

        info!(
            database = source.database.as_str(),
            collection = source.collection.as_str(),
            estimated = ?estimated,
            "Opened MongoDB source"
        );

        Ok(Self { cursor, estimated })
    }
}

#[async_trait]
impl DocumentSource for MongoSource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        Ok(self.cursor.try_next().await?.map(document_to_record))
    }

    fn estimated_total(&self) -> Option<u64> {
        self.estimated
    }
}

/// Relaxed Extended JSON keeps plain numbers plain and turns an `ObjectId`
/// into `{"$oid": "..."}`.
fn document_to_record(doc: Document) -> RawRecord {
    match Bson::Document(doc).into_relaxed_extjson() {
        serde_json::Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

// ---------------------------------------------------------------------------
// JsonLinesSource
// ---------------------------------------------------------------------------

/// One JSON document per line, e.g. a `mongoexport` dump. Blank lines are
/// ignored; documents whose identifier matches the exclusion pattern are
/// filtered out the same way the MongoDB query does.
pub struct JsonLinesSource {
    path: PathBuf,
    lines: Lines<BufReader<tokio::fs::File>>,
    line_no: usize,
    exclude: Option<Regex>,
    id_keys: Vec<String>,
}

impl JsonLinesSource {
    pub async fn open(
        path: &Path,
        source: &SourceConfig,
        fields: &FieldMap,
    ) -> Result<Self, SourceError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let exclude = if source.exclude_id_pattern.is_empty() {
            None
        } else {
            Some(Regex::new(&source.exclude_id_pattern)?)
        };

        info!(path = %path.display(), "Opened JSON Lines source");

        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            exclude,
            id_keys: fields.source_id.clone(),
        })
    }

    fn is_excluded(&self, record: &RawRecord) -> bool {
        let Some(pattern) = &self.exclude else {
            return false;
        };
        self.id_keys
            .iter()
            .filter_map(|k| record.get(k))
            .find(|v| !v.is_null())
            .and_then(parse_identifier)
            .is_some_and(|id| pattern.is_match(&id))
    }
}

#[async_trait]
impl DocumentSource for JsonLinesSource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|source| SourceError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let value: serde_json::Value =
                serde_json::from_str(&line).map_err(|e| SourceError::Malformed {
                    path: self.path.clone(),
                    line: self.line_no,
                    message: e.to_string(),
                })?;
            let serde_json::Value::Object(record) = value else {
                return Err(SourceError::Malformed {
                    path: self.path.clone(),
                    line: self.line_no,
                    message: "expected a JSON object".to_string(),
                });
            };

            if self.is_excluded(&record) {
                debug!(line = self.line_no, "Excluded design document");
                continue;
            }
            return Ok(Some(record));
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// Records held in memory. Reports an exact total.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: VecDeque<RawRecord>,
    total: u64,
}

impl MemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        let total = records.len() as u64;
        Self {
            records: records.into(),
            total,
        }
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        Ok(self.records.pop_front())
    }

    fn estimated_total(&self) -> Option<u64> {
        Some(self.total)
    }
}
