//! Service layer for the relay.
//!
//! This module contains the business logic for:
//! - Reading the hpoi.net listing and detail pages (`HpoiFeed`)
//! - Normalizing labels into hashtags (`tags`)
//! - Posting to Telegram with the photo fallback (`publish`)

mod feed;
mod publisher;
pub mod tags;
mod telegram;

#[cfg(test)]
pub(crate) mod testing;

pub use feed::{FeedSource, HpoiFeed};
pub use publisher::{PublishOutcome, publish};
pub use telegram::{PublishTransport, TelegramTransport, TransportError, UNFETCHABLE_PHOTO};
