pub mod a105_import_batch;
