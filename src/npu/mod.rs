pub mod bank;
pub mod grid;
pub mod mac;
pub mod ppu;
pub mod queue;
pub mod reference;
pub mod sequencer;
pub mod skew;
pub mod store;
pub mod top;
pub mod types;

pub use ppu::QuantParams;
pub use sequencer::SeqState;
pub use top::{Npu, NpuStatus};
pub use types::{Acc, ArrayConfig, Command, Data, RunDescriptor};
