//! Tariff Domain
//!
//! Read-only reference prices used when billing an item to an insurer:
//! plan-negotiated tariffs, national-scheme (NHIS/G-DRG) tariff masters, and
//! the mapping from internal items to scheme codes.
//!
//! Price resolution never blocks the billing workflow: an item with no
//! resolvable price is flagged unpriced with a zero price and corrected
//! later from the pricing dashboard.

pub mod tariff;
pub mod scheme;
pub mod pricing;
pub mod error;

pub use tariff::{InsuranceTariff, TariffItemType};
pub use scheme::{NhisTariff, GdrgTariff, NhisItemMapping};
pub use pricing::{TariffResolver, PriceRequest, PricedItem, PriceSource};
pub use error::TariffError;
