/// An untyped document as read from the source collection.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Default number of records written per graph transaction.
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// A cleaned, typed film ready for graph insertion.
///
/// Built once per raw document and consumed by the upsert engine; `source_id`
/// is the idempotency key for the `Film` node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalFilmRecord {
    pub source_id: String,
    pub title: String,
    pub year: Option<i64>,
    pub vote_count: Option<i64>,
    pub rating_class: Option<String>,
    pub directors: Vec<String>,
    pub primary_director: Option<String>,
    pub actors: Vec<String>,
    pub genres: Vec<String>,
    pub revenue: Option<f64>,
}

impl CanonicalFilmRecord {
    /// Minimal record with only the required fields set.
    pub fn new(source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}
