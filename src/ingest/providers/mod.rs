// src/ingest/providers/mod.rs
pub mod github;
pub mod hackernews;
pub mod reddit;
