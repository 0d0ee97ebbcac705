//! # BNP Common Library
//!
//! Shared code for the BirdNET-Pi API services including:
//! - Detection store connection, schema and models
//! - Error taxonomy shared by every operation
//! - Bootstrap configuration and reloadable station settings
//! - Clock abstraction for "today" / "last hour" queries
//! - Narrow subprocess boundary for helper scripts

pub mod config;
pub mod db;
pub mod error;
pub mod process;
pub mod time;

pub use error::{Error, Result};
