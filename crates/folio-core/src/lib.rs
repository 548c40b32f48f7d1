//! Core types and trait definitions for the Folio content store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod content;
pub mod entity;
pub mod error;
pub mod guard;
pub mod record;
pub mod relation;
pub mod store;

pub use error::{Error, ErrorClass, Classify, Result};
