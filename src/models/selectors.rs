// src/models/selectors.rs

//! CSS selectors for scraping the hpoi.net listing and detail pages.

use serde::{Deserialize, Serialize};

/// CSS selectors for the listing and detail documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSelectors {
    /// Selector for each announcement in the listing
    #[serde(default = "defaults::entry")]
    pub entry_selector: String,

    /// Selector for the anchor pointing at the detail page
    #[serde(default = "defaults::link")]
    pub link_selector: String,

    /// Selector for the broad type shown on the cover
    #[serde(default = "defaults::category")]
    pub category_selector: String,

    /// Selector for the cover image
    #[serde(default = "defaults::image")]
    pub image_selector: String,

    /// Selector for the announcement title
    #[serde(default = "defaults::title")]
    pub title_selector: String,

    /// Selector whose first child holds the announcement kind
    #[serde(default = "defaults::subtype")]
    pub subtype_selector: String,

    /// Selector for the label table on the detail page
    #[serde(default = "defaults::info_table")]
    pub info_table_selector: String,

    /// Selector for the label anchors inside the info table
    #[serde(default = "defaults::tag")]
    pub tag_selector: String,

    /// HTML attribute holding the detail link (usually "href")
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// HTML attribute holding the image URL (usually "src")
    #[serde(default = "defaults::image_attr")]
    pub image_attr: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            entry_selector: defaults::entry(),
            link_selector: defaults::link(),
            category_selector: defaults::category(),
            image_selector: defaults::image(),
            title_selector: defaults::title(),
            subtype_selector: defaults::subtype(),
            info_table_selector: defaults::info_table(),
            tag_selector: defaults::tag(),
            link_attr: defaults::link_attr(),
            image_attr: defaults::image_attr(),
        }
    }
}

mod defaults {
    pub fn entry() -> String {
        ".home-info".into()
    }
    pub fn link() -> String {
        ".overlay-container a".into()
    }
    pub fn category() -> String {
        ".overlay-container .type-name".into()
    }
    pub fn image() -> String {
        ".overlay-container img".into()
    }
    pub fn title() -> String {
        ".home-info-content .user-content".into()
    }
    pub fn subtype() -> String {
        ".home-info-content .user-name".into()
    }
    pub fn info_table() -> String {
        "table.info-box".into()
    }
    pub fn tag() -> String {
        "a".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn image_attr() -> String {
        "src".into()
    }
}
