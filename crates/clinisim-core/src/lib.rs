//! clinisim-core
//!
//! Pure domain types, the fixed investigation and disease catalogs, and
//! storage key conventions. No network or AWS dependency; this is the shared
//! vocabulary of the clinisim system.

pub mod catalog;
pub mod error;
pub mod keys;
pub mod models;
