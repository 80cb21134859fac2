pub mod aggregator;
pub mod config;
pub mod history;
pub mod merge;
pub mod summary;

pub use aggregator::{IntervalAggregator, TickOutcome};
pub use config::AggregatorConfig;
pub use history::SessionHistory;
pub use merge::{layout_timeline, BarSegment, TimelineSnapshot};
