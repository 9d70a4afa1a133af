//! Typed run configuration, loaded once from a TOML file and passed into the
//! subcommands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

fn default_pages() -> u32 {
    5
}
fn default_days() -> u64 {
    8
}
fn default_start_date() -> String {
    "today".to_string()
}
fn default_filepath_template() -> String {
    "tmp_rss_{code}_{page}.rss".to_string()
}
fn default_readme_path() -> PathBuf {
    PathBuf::from("tmp.md")
}

/// One library feed: the event RSS endpoint and a short code used in
/// downloaded file names.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub url: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feeds: Vec<FeedConfig>,
    /// Feed pages to download per feed.
    #[serde(default = "default_pages")]
    pub pages: u32,
    /// Days of events to request, from the start date.
    #[serde(default = "default_days")]
    pub days: u64,
    /// "today" or a `YYYY-MM-DD` date.
    #[serde(default = "default_start_date")]
    pub start_date: String,
    /// Where downloaded pages land; `{code}` and `{page}` are substituted.
    #[serde(default = "default_filepath_template")]
    pub filepath_template: String,
    /// Where the markdown digest is written.
    #[serde(default = "default_readme_path")]
    pub readme_path: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Config = toml::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.feeds.is_empty() {
            bail!("config {} has no [[feeds]] entries", path.display());
        }
        Ok(config)
    }

    /// Resolve the configured start date against the current local date.
    pub fn resolved_start_date(&self, today: NaiveDate) -> Result<NaiveDate> {
        if self.start_date == "today" {
            return Ok(today);
        }
        NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d").with_context(|| {
            format!("could not parse start_date {:?} as a date", self.start_date)
        })
    }
}
