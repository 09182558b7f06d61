pub mod loader;
pub mod query;
pub mod stage;
pub mod timestamps;
pub mod view;

use std::collections::BTreeMap;
use std::fmt;

use wasm_bindgen::JsValue;

use crate::data::RawEntry;
use query::Route;

#[derive(Debug, Clone, PartialEq)]
pub enum PageError {
    Fetch(String),
    Parse(String),
    /// Bad query parameter or unknown page key. Recovered by redirecting to
    /// the game index with a session message.
    InvalidParameter(String),
    MissingElement(&'static str),
}

impl PageError {
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, PageError::InvalidParameter(_))
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            PageError::Parse(msg) => write!(f, "invalid data: {}", msg),
            PageError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            PageError::MissingElement(selector) => write!(f, "missing element {}", selector),
        }
    }
}

impl From<JsValue> for PageError {
    fn from(value: JsValue) -> Self {
        PageError::Fetch(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl From<serde_json::Error> for PageError {
    fn from(err: serde_json::Error) -> Self {
        PageError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum PageLayout {
    /// Multi-stage run. `stage_keys[i]` is the data key of stage `i + 1`.
    Staged {
        route: Option<Route>,
        stage_labels: Vec<String>,
        stage_keys: Vec<String>,
        stages: BTreeMap<String, Vec<RawEntry>>,
    },
    Single {
        timestamps: Vec<RawEntry>,
    },
}

/// Everything a page needs to render, derived once from the data file.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub title: String,
    pub original_title: String,
    pub description: String,
    pub video_id: Option<String>,
    pub character_key: String,
    pub layout: PageLayout,
}

impl PageConfig {
    pub fn stage_count(&self) -> usize {
        match &self.layout {
            PageLayout::Staged { stage_labels, .. } => stage_labels.len(),
            PageLayout::Single { .. } => 1,
        }
    }

    pub fn stage_labels(&self) -> &[String] {
        match &self.layout {
            PageLayout::Staged { stage_labels, .. } => stage_labels,
            PageLayout::Single { .. } => &[],
        }
    }

    pub fn route(&self) -> Option<&Route> {
        match &self.layout {
            PageLayout::Staged { route, .. } => route.as_ref(),
            PageLayout::Single { .. } => None,
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self.layout, PageLayout::Staged { .. })
    }
}
