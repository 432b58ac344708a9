//! Feed item data structure.

use serde::{Deserialize, Serialize};

/// An announcement scraped from the hpoi.net listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    /// Hobby identifier taken from the link path
    pub id: u64,

    /// Absolute URL to the item's detail page
    pub link: String,

    /// Broad type shown on the cover (e.g. "手办")
    pub category_label: String,

    /// Cover image without its query string
    pub image_url: String,

    /// Announcement title
    pub title: String,

    /// Announcement kind shown next to the title (e.g. "官图更新").
    /// Together with `id` this is the dedup key.
    pub subtype_label: String,
}

impl FeedItem {
    /// Build the HTML caption used for both photo and text posts.
    pub fn caption(&self, tags: &[String]) -> String {
        format!(
            "<a href=\"{}\">【{}】{}</a>\nTags: {}",
            escape_html(&self.link),
            escape_html(&self.subtype_label),
            escape_html(&self.title),
            tags.join(" ")
        )
    }
}

/// Escape the characters Telegram's HTML parse mode treats specially.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> FeedItem {
        FeedItem {
            id: 12345,
            link: "https://www.hpoi.net/hobby/12345".to_string(),
            category_label: "手办".to_string(),
            image_url: "https://r.hpoi.net/cover/12345.jpg".to_string(),
            title: "初音未来 1/7".to_string(),
            subtype_label: "官图更新".to_string(),
        }
    }

    #[test]
    fn test_caption() {
        let item = sample_item();
        let tags = vec!["#手办".to_string(), "#1比7".to_string()];
        assert_eq!(
            item.caption(&tags),
            "<a href=\"https://www.hpoi.net/hobby/12345\">【官图更新】初音未来 1/7</a>\nTags: #手办 #1比7"
        );
    }

    #[test]
    fn test_caption_escapes_markup() {
        let mut item = sample_item();
        item.title = "Fate <Heaven's Feel> & more".to_string();
        let caption = item.caption(&[]);
        assert!(caption.contains("Fate &lt;Heaven's Feel&gt; &amp; more"));
        assert!(caption.ends_with("Tags: "));
    }
}
