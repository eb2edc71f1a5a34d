pub mod a101_vendor;
pub mod a102_product_category;
pub mod a103_product;
pub mod a104_vendor_product;
pub mod a105_import_batch;
pub mod common;
