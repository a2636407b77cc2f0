//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Analysis handler.
pub mod analysis;
/// Cache administration handlers.
pub mod cache;
/// Service banner and health check.
pub mod health;
/// Worker registry listing.
pub mod workers;
