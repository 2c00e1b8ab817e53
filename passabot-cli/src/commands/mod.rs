//! CLI command implementations.

pub mod config;
pub mod login;
pub mod probe;
pub mod run;
