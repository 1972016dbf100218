//! Repository layer
//!
//! Each repository owns the SQL for one aggregate and hands fully built
//! domain values back to callers. Enum columns are stored as text and
//! translated through [`codec`]; rows that need ordering guarantees take
//! `FOR UPDATE` locks inside their transactions.

pub mod batch;
pub mod claims;
pub mod codec;
pub mod coverage;
pub mod tariff;

pub use batch::BatchRepository;
pub use claims::ClaimsRepository;
pub use coverage::CoverageRepository;
pub use tariff::TariffRepository;
