pub mod cart;
pub mod manager;
pub mod placement;

pub use cart::{Cart, CartField, CartLine, CartValidationError, CartViolation, Rule, ValidCart, ValidLine};
pub use manager::{OrderError, OrderManager};
pub use placement::{PlacedOrder, PlacementEngine, PlacementError, WriteOp};
