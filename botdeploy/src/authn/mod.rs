//! Credentials

pub mod access_token;
