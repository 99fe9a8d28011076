// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod context;
mod event;

// Re-export all public types
pub use config::{
    BrowserConfig, CollectorConfig, Config, Credentials, ExtractorConfig, LoggingConfig,
    OutputConfig, SelectorConfig, SessionConfig, SiteConfig, StreamConfig,
};
pub use context::CollectionContext;
pub use event::{EventLinks, EventRecord, StatusKind};
