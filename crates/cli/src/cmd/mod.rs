//! CLI command implementations

pub mod clean;
pub mod config;
pub mod disable;
pub mod doctor;
pub mod enable;
pub mod reset;
pub mod resume;
pub mod rewind;
pub mod show;
pub mod status;
pub mod version;
