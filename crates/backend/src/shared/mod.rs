pub mod audit;
pub mod config;
pub mod data;
pub mod slug;
