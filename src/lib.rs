// src/lib.rs

pub mod clustering;
pub mod config;
pub mod export;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod utils;

pub use config::{MatchingConfig, MethodConfig};
pub use models::{ClusterConfidence, MatchMethodType, PersonRecord};
