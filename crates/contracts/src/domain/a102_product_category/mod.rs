pub mod aggregate;

pub use aggregate::{ProductCategory, ProductCategoryId};
