//! Stokvel domain model.
//!
//! # Responsibility
//! - Define the club aggregate and its child records (members, rules,
//!   cycles, bank accounts).
//! - Own write-side validation and pure domain calculations.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Child records reference exactly one parent club.
//! - Currency amounts are `rust_decimal::Decimal`, never floats.

pub mod bank_account;
pub mod cycle;
pub mod member;
pub mod rule;
pub mod stokvel;
pub mod validation;
