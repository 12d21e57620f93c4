//! Reusable view builders for top-K charts: per-key stores, retraction
//! drivers, dataflow builders and query routing.

pub mod changelog;
pub mod dataflow;
pub mod driver;
pub mod query;
pub mod store;

pub use changelog::ChangeLog;
pub use driver::{DriverOutcome, RetractionDriver};
pub use query::{shard_for, ChartQuery, ChartRouter, QueryError, ShardId, ShardMetadata, ShardSnapshot};
pub use store::{ApplyOutcome, ChartStore, ChartUpdate};

/// Chart size used by every view in this workspace.
pub const TOP_K: usize = 5;

pub type GenreCharts = ChartStore<String, TOP_K>;
