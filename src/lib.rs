pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;

pub use analysis::{ComparisonReport, Metric, SchedulerMetrics};
pub use config::SimConfig;
pub use error::ConfigError;
pub use scheduler::{PolicyKind, Scheduler};
pub use sim::{SimOutcome, Simulator, WorkloadKind, compare};
