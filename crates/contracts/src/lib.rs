//! Shared types between the import backend and its API clients.

pub mod domain;
pub mod system;
