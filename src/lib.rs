pub mod builtin;
pub mod error;
pub mod npu;
pub mod simulator;

pub use error::{Error, Result};
pub use npu::{ArrayConfig, Command, Npu, QuantParams, RunDescriptor};
pub use simulator::utils::log;
