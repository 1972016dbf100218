//! Test Utilities Crate
//!
//! Shared test infrastructure for the coverage and claims billing engine:
//! entity builders, fixed fixtures, proptest generators, custom
//! assertions, and a testcontainers-backed Postgres helper.

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
