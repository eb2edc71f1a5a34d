pub mod committer;
pub mod csv_parser;
pub mod error;
pub mod normalizer;
pub mod repository;
pub mod service;
pub mod validator;
