pub mod cmd;
pub mod error;
pub mod net;
pub mod raw_config;
