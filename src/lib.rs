pub mod commands;
pub mod config;
pub mod error;
pub mod navigation;
pub mod observability;
pub mod provenance;
pub mod utils;
