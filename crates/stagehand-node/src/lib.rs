pub mod cli;
pub mod config;
pub mod logging;
pub mod seed;

pub use config::NodeConfig;
