// src/pipeline/relay.rs

//! The ingest → dedupe → enrich → publish → record loop.

use crate::error::Result;
use crate::models::{Config, Destinations, FeedItem, RunMode};
use crate::pipeline::Deadline;
use crate::services::{
    FeedSource, HpoiFeed, PublishOutcome, PublishTransport, TelegramTransport, publish,
};
use crate::storage::{LocalStorage, RecordStore};

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items in the listing
    pub fetched: usize,
    /// Items skipped because they were posted within the dedup window
    pub already_published: usize,
    /// Items that reached at least one channel
    pub post_count: usize,
    /// Items the transport refused everywhere
    pub skipped: usize,
    /// Rows appended to the dedup store
    pub recorded: usize,
}

/// Run one pass against hpoi.net and Telegram with the configured store.
pub async fn run_pipeline(config: &Config, deadline: &Deadline) -> Result<RunSummary> {
    log::info!("Starting relay run in {} mode", config.mode);

    let mut store = LocalStorage::initialize(&config.storage.records_file).await?;
    let feed = HpoiFeed::new(config.feed.clone())?;
    let transport = TelegramTransport::new(&config.telegram, config.transport_proxy())?;

    run_relay(config, &feed, &transport, &mut store, deadline).await
}

/// Process the listing one item at a time.
///
/// Store and listing failures abort the run, as does a failed detail fetch.
/// Publish failures never do: the item is still recorded so a broken image
/// is not retried on every run.
pub async fn run_relay(
    config: &Config,
    feed: &dyn FeedSource,
    transport: &dyn PublishTransport,
    store: &mut dyn RecordStore,
    deadline: &Deadline,
) -> Result<RunSummary> {
    let destinations = config.destinations();
    let items = deadline.guard(feed.fetch_listing()).await?;

    let mut summary = RunSummary {
        fetched: items.len(),
        ..RunSummary::default()
    };

    for item in &items {
        deadline.check()?;

        let seen = deadline
            .guard(store.was_recently_published(item.id, &item.subtype_label))
            .await?;
        if seen {
            log::debug!("Item {} ({}) already published", item.id, item.subtype_label);
            summary.already_published += 1;
            continue;
        }

        log::info!(
            "Found item {} ({}) not published, fetching tags",
            item.id,
            item.subtype_label
        );
        let tags = deadline.guard(feed.fetch_tags(item.id)).await?;

        if config.mode.publishes() {
            let targets = targets(destinations, &tags, &config.telegram.secondary_tag);
            let reached = deadline
                .guard(async { Ok(publish_to_all(item, &targets, &tags, transport).await) })
                .await?;

            if reached {
                summary.post_count += 1;
            } else {
                summary.skipped += 1;
            }
        } else {
            log::info!("Dry run, not publishing item {}", item.id);
        }

        deadline
            .guard(store.record_publish(item.id, &item.subtype_label))
            .await?;
        summary.recorded += 1;
    }

    log_summary(config.mode, &summary);
    Ok(summary)
}

/// Chats an item goes to: always the primary, plus the secondary for
/// items carrying the secondary-topic tag.
fn targets(destinations: Destinations, tags: &[String], secondary_tag: &str) -> Vec<i64> {
    let mut chats = vec![destinations.primary];
    if let Some(secondary) = destinations.secondary {
        if tags.iter().any(|t| t == secondary_tag) {
            chats.push(secondary);
        }
    }
    chats
}

/// Publish to every target; true if at least one accepted the post.
async fn publish_to_all(
    item: &FeedItem,
    targets: &[i64],
    tags: &[String],
    transport: &dyn PublishTransport,
) -> bool {
    let mut reached = false;
    for &chat_id in targets {
        log::info!("Publishing item {} to chat {}", item.id, chat_id);
        if publish(item, chat_id, tags, transport).await == PublishOutcome::Published {
            reached = true;
        }
    }
    reached
}

fn log_summary(mode: RunMode, summary: &RunSummary) {
    log::info!(
        "Run finished ({}): {} fetched, {} already published, {} posted, {} skipped, {} recorded",
        mode,
        summary.fetched,
        summary.already_published,
        summary.post_count,
        summary.skipped,
        summary.recorded
    );
}
