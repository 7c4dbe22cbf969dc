pub mod clock;
pub mod mode;
pub mod records;
pub mod shell;
pub mod trace;

pub use clock::SimClock;
pub use mode::{SimConfig, StepMode};
