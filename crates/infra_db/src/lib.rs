//! Postgres persistence for the claims engine
//!
//! Wires the domain crates to a Postgres database: connection pooling,
//! environment-driven settings, tracing setup, and one repository per
//! aggregate. Schema lives in the workspace-level `migrations/` directory.

pub mod error;
pub mod pool;
pub mod repositories;
pub mod settings;
pub mod telemetry;

pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::{BatchRepository, ClaimsRepository, CoverageRepository, TariffRepository};
pub use settings::Settings;
pub use telemetry::init_tracing;
