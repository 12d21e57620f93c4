use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Identity;

pub type ArticleId = Identity;

/// Default tumbling window for the per-industry article charts.
pub const DEFAULT_WINDOW_SIZE_MS: u64 = 60 * 60 * 1_000;

const ARTICLE_FLAG: &str = "ARTICLE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PageView {
    pub user: String,
    pub page: String,
    pub industry: String,
    #[serde(default)]
    pub flags: String,
    pub ts_ms: u64,
}

impl PageView {
    pub fn is_article(&self) -> bool {
        self.flags.split(',').any(|flag| flag.trim() == ARTICLE_FLAG)
    }
}

/// Grouping key of the windowed charts: one chart per industry per window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowedIndustry {
    pub industry: String,
    pub window_start_ms: u64,
}

/// Start of the tumbling window of `window_size_ms` holding `ts_ms`.
pub fn window_start(ts_ms: u64, window_size_ms: u64) -> u64 {
    ts_ms - ts_ms % window_size_ms.max(1)
}

/// Oldest window start still retained when the clock reads `clock_ms`: the
/// current window plus `retained_windows` before it.
pub fn retention_horizon(clock_ms: u64, window_size_ms: u64, retained_windows: u64) -> u64 {
    window_start(clock_ms, window_size_ms)
        .saturating_sub(retained_windows.saturating_mul(window_size_ms.max(1)))
}

impl WindowedIndustry {
    /// Assigns the view to its tumbling window of `window_size_ms`.
    pub fn for_view(view: &PageView, window_size_ms: u64) -> Self {
        Self {
            industry: view.industry.clone(),
            window_start_ms: window_start(view.ts_ms, window_size_ms),
        }
    }
}

impl fmt::Display for WindowedIndustry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.industry, self.window_start_ms)
    }
}

/// Interns page names to the integer identities charts rank by.
#[derive(Debug, Clone, Default)]
pub struct ArticleCatalog {
    ids: HashMap<String, ArticleId>,
    pages: Vec<String>,
}

impl ArticleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, page: &str) -> ArticleId {
        if let Some(id) = self.ids.get(page) {
            return *id;
        }
        let id = self.pages.len() as ArticleId;
        self.pages.push(page.to_string());
        self.ids.insert(page.to_string(), id);
        id
    }

    pub fn id(&self, page: &str) -> Option<ArticleId> {
        self.ids.get(page).copied()
    }

    pub fn page(&self, id: ArticleId) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.pages.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
