//! botdeploy library
//!
//! Provisioning and zip deployment of bot projects on Azure.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod events;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod luis;
pub mod provision;
pub mod runtime;
pub mod storage;
pub mod utils;
