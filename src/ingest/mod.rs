// src/ingest/mod.rs
pub mod providers;
pub mod query;
pub mod types;
pub mod window;
