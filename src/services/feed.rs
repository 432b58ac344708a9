// src/services/feed.rs

//! hpoi.net feed adapter.
//!
//! Fetches the personal "home" listing and per-item detail pages and turns
//! them into [`FeedItem`]s and hashtags. All knowledge of the site's markup
//! lives here and in [`FeedSelectors`].

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, FeedItem, FeedSelectors};
use crate::services::tags;
use crate::utils::{extract_item_id, http, parse_selector, resolve_url, strip_query};

/// Listing endpoint, relative to the site root.
const LISTING_PATH: &str = "user/home/ajax";

/// First page of announcements of every category.
const LISTING_FORM: &str = "page=1&type=info&catType=all";

/// Source of announcements and their labels.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current listing, oldest announcement first.
    async fn fetch_listing(&self) -> Result<Vec<FeedItem>>;

    /// Fetch the hashtags for one item from its detail page.
    async fn fetch_tags(&self, id: u64) -> Result<Vec<String>>;
}

/// Compiled listing selectors.
struct ListingSelectors {
    entry: Selector,
    link: Selector,
    category: Selector,
    image: Selector,
    title: Selector,
    subtype: Selector,
}

impl ListingSelectors {
    fn compile(selectors: &FeedSelectors) -> Result<Self> {
        Ok(Self {
            entry: parse_selector(&selectors.entry_selector)?,
            link: parse_selector(&selectors.link_selector)?,
            category: parse_selector(&selectors.category_selector)?,
            image: parse_selector(&selectors.image_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            subtype: parse_selector(&selectors.subtype_selector)?,
        })
    }
}

/// Feed adapter for www.hpoi.net.
pub struct HpoiFeed {
    config: FeedConfig,
    base_url: Url,
    client: Client,
}

impl HpoiFeed {
    /// Create a new adapter with the given configuration.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let client = http::create_feed_client(&config)?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    fn cookie(&self) -> Option<String> {
        (!self.config.utoken.is_empty()).then(|| format!("utoken={}", self.config.utoken))
    }

    /// Parse a listing response into items, oldest first.
    ///
    /// The site lists newest first; the result is reversed so items are
    /// published, and recorded, in chronological order. Entries that do not
    /// parse are logged and left out.
    pub fn parse_listing(&self, body: &str) -> Result<Vec<FeedItem>> {
        let html = unwrap_envelope(body);
        let document = Html::parse_document(&html);
        let selectors = ListingSelectors::compile(&self.config.selectors)?;

        let mut items = Vec::new();
        for (idx, entry) in document.select(&selectors.entry).enumerate() {
            match self.parse_entry(entry, &selectors) {
                Ok(item) => items.push(item),
                Err(e) => log::warn!("Skipping listing entry #{}: {}", idx + 1, e),
            }
        }

        if items.is_empty() {
            log::warn!("Listing contained no usable entries");
        }

        items.reverse();
        Ok(items)
    }

    fn parse_entry(&self, entry: ElementRef<'_>, sel: &ListingSelectors) -> Result<FeedItem> {
        let attr = &self.config.selectors;

        let link_path = entry
            .select(&sel.link)
            .next()
            .and_then(|a| a.value().attr(&attr.link_attr))
            .ok_or_else(|| AppError::parse("entry has no detail link"))?;
        let id = extract_item_id(link_path)
            .ok_or_else(|| AppError::parse(format!("no item id in link '{link_path}'")))?;

        let image_src = entry
            .select(&sel.image)
            .next()
            .and_then(|img| img.value().attr(&attr.image_attr))
            .ok_or_else(|| AppError::parse(format!("item {id} has no cover image")))?;

        let category_label = select_text(entry, &sel.category)
            .ok_or_else(|| AppError::parse(format!("item {id} has no category")))?;
        let title = select_text(entry, &sel.title)
            .ok_or_else(|| AppError::parse(format!("item {id} has no title")))?;
        let subtype_label = entry
            .select(&sel.subtype)
            .next()
            .and_then(first_child_text)
            .ok_or_else(|| AppError::parse(format!("item {id} has no announcement kind")))?;

        Ok(FeedItem {
            id,
            link: resolve_url(&self.base_url, link_path),
            category_label,
            image_url: resolve_url(&self.base_url, strip_query(image_src)),
            title,
            subtype_label,
        })
    }

    /// Parse a detail page into hashtags.
    ///
    /// A page without the info table is an unexpected shape and fails; a
    /// table without labels yields no tags.
    pub fn parse_tags(&self, id: u64, body: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(body);
        let table_sel = parse_selector(&self.config.selectors.info_table_selector)?;
        let tag_sel = parse_selector(&self.config.selectors.tag_selector)?;

        let table = document.select(&table_sel).next().ok_or_else(|| {
            AppError::fetch(format!("hobby/{id}"), "detail page has no info table")
        })?;

        let labels: Vec<String> = table
            .select(&tag_sel)
            .map(|a| a.text().collect::<String>())
            .collect();

        Ok(tags::hashtags(labels))
    }
}

#[async_trait]
impl FeedSource for HpoiFeed {
    async fn fetch_listing(&self) -> Result<Vec<FeedItem>> {
        log::info!("Fetching latest feeds from {}", self.base_url);
        let url = self.base_url.join(LISTING_PATH)?;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(LISTING_FORM);
        if let Some(cookie) = self.cookie() {
            request = request.header(COOKIE, cookie);
        }

        let body = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch("listing", e))?
            .text()
            .await
            .map_err(|e| AppError::fetch("listing", e))?;

        let items = self.parse_listing(&body)?;
        log::info!("Listing returned {} item(s)", items.len());
        Ok(items)
    }

    async fn fetch_tags(&self, id: u64) -> Result<Vec<String>> {
        let context = format!("hobby/{id}");
        let url = self.base_url.join(&context)?;

        let mut request = self.client.get(url);
        if let Some(cookie) = self.cookie() {
            request = request.header(COOKIE, cookie);
        }

        let body = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(context.as_str(), e))?
            .text()
            .await
            .map_err(|e| AppError::fetch(context.as_str(), e))?;

        self.parse_tags(id, &body)
    }
}

/// Pull the HTML out of a JSON envelope, or return the body unchanged.
///
/// The listing endpoint has answered both with bare HTML and with JSON that
/// carries the HTML as a string (top-level, or under `html`/`data`).
fn unwrap_envelope(body: &str) -> String {
    let trimmed = body.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('"')) {
        return body.to_string();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(html)) => html,
        Ok(Value::Object(map)) => ["html", "data"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

/// Trimmed text of the first match, if any.
fn select_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Trimmed text of the element's first child node.
///
/// The kind label shares its element with a trailing timestamp span, so only
/// the leading node is wanted.
fn first_child_text(element: ElementRef<'_>) -> Option<String> {
    let child = element.children().next()?;
    let text = match child.value() {
        Node::Text(text) => String::from(&**text),
        Node::Element(_) => ElementRef::wrap(child)?.text().collect(),
        _ => return None,
    };
    Some(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <div class="home-info">
          <div class="overlay-container">
            <a href="hobby/300"><img src="https://r.hpoi.net/cover/300.jpg?date=1"></a>
            <span class="type-name"> 手办 </span>
          </div>
          <div class="home-info-content">
            <span class="user-name">官图更新<span class="time">1分钟前</span></span>
            <div class="user-content"> newest </div>
          </div>
        </div>
        <div class="home-info">
          <div class="overlay-container">
            <a href="hobby/200"><img src="https://r.hpoi.net/cover/200.jpg"></a>
            <span class="type-name">模型</span>
          </div>
          <div class="home-info-content">
            <span class="user-name">出荷</span>
            <div class="user-content">middle</div>
          </div>
        </div>
        <div class="home-info">
          <div class="overlay-container">
            <a href="hobby/100"><img src="https://r.hpoi.net/cover/100.jpg"></a>
            <span class="type-name">手办</span>
          </div>
          <div class="home-info-content">
            <span class="user-name">预定</span>
            <div class="user-content">oldest</div>
          </div>
        </div>
    "#;

    const DETAIL: &str = r#"
        <table class="info-box">
          <tr><td>名称</td><td><a>初音未来</a></td></tr>
          <tr><td>比例</td><td><a>1/7</a></td></tr>
          <tr><td>材质</td><td><a> PVC 塗装済み完成品 </a></td></tr>
          <tr><td>分类</td><td><a>比例人形</a></td></tr>
          <tr><td>原型</td><td><a>未知</a></td></tr>
        </table>
    "#;

    fn feed_with_base(base_url: &str) -> HpoiFeed {
        HpoiFeed::new(FeedConfig {
            base_url: base_url.to_string(),
            utoken: "token".to_string(),
            ..FeedConfig::default()
        })
        .unwrap()
    }

    fn feed() -> HpoiFeed {
        feed_with_base("https://www.hpoi.net/")
    }

    #[test]
    fn test_listing_is_oldest_first() {
        let items = feed().parse_listing(LISTING).unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![100, 200, 300]);
    }

    #[test]
    fn test_listing_fields() {
        let items = feed().parse_listing(LISTING).unwrap();
        let newest = &items[2];
        assert_eq!(newest.link, "https://www.hpoi.net/hobby/300");
        assert_eq!(newest.category_label, "手办");
        assert_eq!(newest.image_url, "https://r.hpoi.net/cover/300.jpg");
        assert_eq!(newest.title, "newest");
        assert_eq!(newest.subtype_label, "官图更新");
    }

    #[test]
    fn test_listing_skips_malformed_entry() {
        let body = format!(
            "{LISTING}<div class=\"home-info\"><div class=\"home-info-content\"></div></div>"
        );
        let items = feed().parse_listing(&body).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_listing_in_json_envelope() {
        let body = serde_json::json!({ "html": LISTING }).to_string();
        let items = feed().parse_listing(&body).unwrap();
        assert_eq!(items.len(), 3);

        let body = serde_json::to_string(LISTING).unwrap();
        assert_eq!(feed().parse_listing(&body).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_tags() {
        let tags = feed().parse_tags(1, DETAIL).unwrap();
        assert_eq!(
            tags,
            vec!["#初音未来", "#1比7", "#PVC_塗装済み完成品", "#比例人形"]
        );
    }

    #[test]
    fn test_parse_tags_without_table_fails() {
        let err = feed().parse_tags(1, "<html><body></body></html>").unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_listing_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/user/home/ajax")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_header("cookie", "utoken=token")
            .match_body("page=1&type=info&catType=all")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let feed = feed_with_base(&format!("{}/", server.url()));
        let items = feed.fetch_listing().await.unwrap();

        mock.assert_async().await;
        assert_eq!(items.first().map(|i| i.id), Some(100));
        assert_eq!(
            items[0].link,
            format!("{}/hobby/100", server.url())
        );
    }

    #[tokio::test]
    async fn test_fetch_listing_server_error_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/user/home/ajax")
            .with_status(503)
            .create_async()
            .await;

        let feed = feed_with_base(&format!("{}/", server.url()));
        let err = feed.fetch_listing().await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_tags() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/hobby/42")
            .with_status(200)
            .with_body(DETAIL)
            .create_async()
            .await;

        let feed = feed_with_base(&format!("{}/", server.url()));
        let tags = feed.fetch_tags(42).await.unwrap();

        mock.assert_async().await;
        assert!(tags.contains(&"#比例人形".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_tags_server_error_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/hobby/42")
            .with_status(404)
            .create_async()
            .await;

        let feed = feed_with_base(&format!("{}/", server.url()));
        let err = feed.fetch_tags(42).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, AppError::Fetch { ref context, .. } if context == "hobby/42"));
    }
}
