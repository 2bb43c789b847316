pub mod batch;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod source;

pub use batch::{batches, BatchAccumulator};
pub use normalize::{Normalized, Normalizer, SkipReason};
pub use pipeline::{run_linker, ImportError, ImportPipeline, ImportSummary};
pub use progress::{BarProgress, LogProgress, Progress, ProgressSink, RecordingProgress};
pub use source::{DocumentSource, JsonLinesSource, MemorySource, MongoSource, SourceError};
