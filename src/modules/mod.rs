pub mod api;
pub mod mqtt;
pub mod simulator;
pub mod udp;
