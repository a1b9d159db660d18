pub mod metrics;
pub mod report;

pub use metrics::{Metric, SchedulerMetrics, cohens_d, jains_index, percentile};
pub use report::{ComparisonReport, Improvement};
