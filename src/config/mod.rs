// src/config/mod.rs
pub mod sources;

pub use sources::SourcesConfig;
