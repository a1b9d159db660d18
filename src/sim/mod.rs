pub mod benchmark;
pub mod driver;
pub mod trace;
pub mod workload;

pub use benchmark::{BENCHMARKS, Benchmark, Category};
pub use driver::{Simulator, compare, compare_schedulers};
pub use trace::{SimOutcome, Snapshot};
pub use workload::{WorkloadKind, generate};
