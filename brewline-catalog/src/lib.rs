pub mod pricing;

pub use pricing::{ModifierCharge, PricedLine, PricingConfig, PricingEngine, PricingError};
