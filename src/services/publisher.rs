//! Posting one item to one channel, with the photo-to-text fallback.

use crate::models::FeedItem;
use crate::services::PublishTransport;

/// Result of publishing one item to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The photo post, or its text fallback, went through
    Published,
    /// Both attempts failed, or the transport refused for another reason
    Skipped,
}

/// Post `item` to `channel_id` as a photo, falling back to text once.
///
/// The fallback only fires when the API says it could not fetch the photo.
/// Every other failure is logged and reported as [`PublishOutcome::Skipped`];
/// nothing here aborts the run.
pub async fn publish(
    item: &FeedItem,
    channel_id: i64,
    tags: &[String],
    transport: &dyn PublishTransport,
) -> PublishOutcome {
    let caption = item.caption(tags);

    let error = match transport
        .send_photo(channel_id, &item.image_url, &caption)
        .await
    {
        Ok(()) => return PublishOutcome::Published,
        Err(error) => error,
    };

    if !error.is_unfetchable_photo() {
        log::warn!(
            "Skipping item {} for chat {}: {}",
            item.id,
            channel_id,
            error
        );
        return PublishOutcome::Skipped;
    }

    log::info!(
        "Photo for item {} not fetchable by Telegram, posting as text",
        item.id
    );

    match transport.send_message(channel_id, &caption).await {
        Ok(()) => PublishOutcome::Published,
        Err(error) => {
            log::warn!(
                "Skipping item {} for chat {} after text fallback: {}",
                item.id,
                channel_id,
                error
            );
            PublishOutcome::Skipped
        }
    }
}
