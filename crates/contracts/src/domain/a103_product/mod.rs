pub mod aggregate;
pub mod unit;

pub use aggregate::{Product, ProductId};
pub use unit::Unit;
