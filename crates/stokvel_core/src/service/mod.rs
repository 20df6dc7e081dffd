//! Read-side use-case services.
//!
//! # Responsibility
//! - Compose repository snapshots into the aggregates club pages render.
//! - Keep CLI and UI layers decoupled from storage details.

pub mod aggregate;
pub mod summary_service;
