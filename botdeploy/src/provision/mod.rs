//! Azure resource provisioning (`create`)

pub mod api;
pub mod diagnostics;
pub mod params;
pub mod provisioner;
