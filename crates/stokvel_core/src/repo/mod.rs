//! Repository layer for the stokvel store.
//!
//! # Responsibility
//! - Define read (`StokvelRepository`) and write (`StokvelStore`) contracts.
//! - Keep SQLite query details out of the summary service.
//!
//! # Invariants
//! - Repository writes validate models before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

mod rows;
pub mod stokvel_repo;
pub mod stokvel_store;
