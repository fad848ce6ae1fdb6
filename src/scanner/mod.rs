mod controller;
mod loop_worker;

pub use controller::ScanController;
pub use loop_worker::{scan_loop, ScanLoopConfig};
