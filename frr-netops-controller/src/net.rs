pub mod announce;
pub mod classifier;
pub mod config;
pub mod flush;
pub mod frame;
pub mod inventory;
pub mod snmp;
pub mod transmit;
