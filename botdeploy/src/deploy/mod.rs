//! Deployment pipeline

pub mod fsm;
pub mod orchestrator;
pub mod packager;
pub mod zip_deployer;
