//! API models

pub mod bot;
pub mod envelope;
pub mod graph;
pub mod insights;
pub mod kudu;
pub mod luis;
pub mod resources;

pub use bot::*;
pub use envelope::*;
pub use graph::*;
pub use insights::*;
pub use kudu::*;
pub use luis::*;
pub use resources::*;
