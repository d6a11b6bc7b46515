//! Shared types exchanged between the scraper output, the extractor and the
//! store.
//!
//! A saved search-result detail is a JSON array of [`Section`]s, one per
//! `<h5>` heading of the details modal. A failed fetch is saved as a single
//! section carrying only `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// One titled block of a search-result detail page, kept as scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SectionTitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<String>>,
    /// Page title of an HTTP 500 response, recorded instead of content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Keys nothing here interprets; written back unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Older scraper runs saved the heading as a list of text nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionTitle {
    Text(String),
    Parts(Vec<String>),
}

impl SectionTitle {
    /// The heading as one string; text nodes are concatenated.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            SectionTitle::Text(s) => Cow::Borrowed(s),
            SectionTitle::Parts(parts) => Cow::Owned(parts.concat()),
        }
    }
}

impl Section {
    pub fn new(title: &str, content: &[&str]) -> Self {
        Self {
            title: Some(SectionTitle::Text(title.to_string())),
            content: Some(content.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }
}

/// A full detail payload as saved by the scraper.
pub type DetailRecord = Vec<Section>;
