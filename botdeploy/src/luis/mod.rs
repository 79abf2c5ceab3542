pub mod api;
pub mod builder;
pub mod publisher;
