//! Settings and project layout

pub mod layout;
pub mod settings;
