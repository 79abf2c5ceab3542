//! HTTP clients for the remote services

pub mod arm;
pub mod client;
pub mod graph;
pub mod kudu;
pub mod luis;
