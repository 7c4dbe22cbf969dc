pub mod config;
pub mod driver;
pub mod sim;
pub mod simulator;
pub mod utils;
pub mod workload;

// provide to sysnpu
pub use driver::Driver;
pub use simulator::Simulator;
pub use utils::log;
pub use workload::Workload;
