//! Data models for conversion runs.

pub mod config;
pub mod request;
