pub mod aggregate;

pub use aggregate::{VendorProduct, VendorProductId};
