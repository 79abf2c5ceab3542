//! Wire models for the remote APIs driven by botdeploy.
//!
//! The types mirror the JSON shapes of the Azure Resource Manager, Azure AD
//! Graph, LUIS authoring and Kudu zip-deploy endpoints. Only the fields the
//! deployment workflow reads or writes are modelled; everything else is kept
//! in flattened `extra` maps where round-tripping matters.

pub mod models;

pub use models::*;
