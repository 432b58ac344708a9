// src/models/mod.rs

//! Domain models for the relay.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod record;
mod selectors;

// Re-export all public types
pub use config::{
    Config, Destinations, FeedConfig, RunMode, StorageConfig, TelegramConfig, WatchdogConfig,
};
pub use item::FeedItem;
pub use record::PublishRecord;
pub use selectors::FeedSelectors;
