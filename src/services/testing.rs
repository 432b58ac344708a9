//! In-memory stand-ins for the feed and transport seams.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::FeedItem;
use crate::services::{FeedSource, PublishTransport, TransportError};

pub fn sample_item(id: u64, subtype_label: &str) -> FeedItem {
    FeedItem {
        id,
        link: format!("https://www.hpoi.net/hobby/{id}"),
        category_label: "手办".to_string(),
        image_url: format!("https://r.hpoi.net/cover/{id}.jpg"),
        title: format!("Item {id}"),
        subtype_label: subtype_label.to_string(),
    }
}

/// A transport call as seen by [`StubTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Photo {
        chat_id: i64,
        photo_url: String,
        caption: String,
    },
    Message {
        chat_id: i64,
        text: String,
    },
}

/// Records every call; fails the ones it was told to.
#[derive(Default)]
pub struct StubTransport {
    calls: Mutex<Vec<Call>>,
    photo_errors: HashMap<String, TransportError>,
    message_error: Option<TransportError>,
}

impl StubTransport {
    pub fn reject_photo(mut self, photo_url: &str, error: TransportError) -> Self {
        self.photo_errors.insert(photo_url.to_string(), error);
        self
    }

    pub fn reject_messages(mut self, error: TransportError) -> Self {
        self.message_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PublishTransport for StubTransport {
    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> std::result::Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Photo {
            chat_id,
            photo_url: photo_url.to_string(),
            caption: caption.to_string(),
        });
        match self.photo_errors.get(photo_url) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> std::result::Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Message {
            chat_id,
            text: text.to_string(),
        });
        match &self.message_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Serves a fixed listing and per-item labels.
#[derive(Default)]
pub struct StubFeed {
    pub listing: Vec<FeedItem>,
    pub tags: HashMap<u64, Vec<String>>,
    pub tag_requests: Mutex<Vec<u64>>,
}

impl StubFeed {
    pub fn new(listing: Vec<FeedItem>) -> Self {
        Self {
            listing,
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, id: u64, tags: &[&str]) -> Self {
        self.tags
            .insert(id, tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn tag_requests(&self) -> Vec<u64> {
        self.tag_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for StubFeed {
    async fn fetch_listing(&self) -> Result<Vec<FeedItem>> {
        Ok(self.listing.clone())
    }

    async fn fetch_tags(&self, id: u64) -> Result<Vec<String>> {
        self.tag_requests.lock().unwrap().push(id);
        self.tags
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::fetch(format!("hobby/{id}"), "no such item"))
    }
}
