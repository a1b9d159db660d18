pub mod driver;
pub mod event;
pub mod fixed_point;
pub mod observer;
pub mod state;

pub use driver::SchedCore;
pub use event::SimEvent;
pub use fixed_point::Fp;
pub use observer::Observer;
pub use state::{
    NICE_MAX, NICE_MIN, NUM_PRIORITIES, Nice, PRI_DEFAULT, PRI_MAX, PRI_MIN, Thread, ThreadId,
    ThreadKey, ThreadStatus, ThreadTable, Ticks,
};
