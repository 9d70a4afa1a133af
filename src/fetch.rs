//! Feed page download: URL construction per feed and page, destination-path
//! templating, and the HTTP fetch itself.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use url::Url;

use crate::config::Config;

/// One page of one feed: where to fetch it and where to store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: Url,
    pub file_path: PathBuf,
}

/// Substitute `{code}` and `{page}` in the configured filepath template.
fn render_file_path(template: &str, code: &str, page: u32) -> PathBuf {
    PathBuf::from(
        template
            .replace("{code}", code)
            .replace("{page}", &page.to_string()),
    )
}

/// Set `startDate`, `endDate`, and `page` on the feed URL, replacing any
/// values already present and keeping the rest of the query intact.
fn page_url(base: &Url, start: NaiveDate, end: NaiveDate, page: u32) -> Url {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "startDate" && k != "endDate" && k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("startDate", &start.format("%Y-%m-%d").to_string());
        pairs.append_pair("endDate", &end.format("%Y-%m-%d").to_string());
        pairs.append_pair("page", &page.to_string());
    }
    url
}

/// Expand the config into the full download list: every feed crossed with
/// pages 1..=pages, covering `start` through `start + days`.
pub fn build_jobs(config: &Config, start: NaiveDate) -> Result<Vec<DownloadJob>> {
    let end = start
        .checked_add_days(Days::new(config.days))
        .context("start date + days out of range")?;

    let mut jobs = Vec::with_capacity(config.feeds.len() * config.pages as usize);
    for feed in &config.feeds {
        let base =
            Url::parse(&feed.url).with_context(|| format!("invalid feed url {:?}", feed.url))?;
        for page in 1..=config.pages {
            jobs.push(DownloadJob {
                url: page_url(&base, start, end, page),
                file_path: render_file_path(&config.filepath_template, &feed.code, page),
            });
        }
    }
    Ok(jobs)
}

async fn download_one(client: &reqwest::Client, job: &DownloadJob) -> Result<()> {
    let response = client
        .get(job.url.clone())
        .send()
        .await
        .context("sending request")?
        .error_for_status()
        .context("feed server returned an error status")?;
    let body = response.bytes().await.context("reading response body")?;
    fs::write(&job.file_path, &body)
        .with_context(|| format!("writing {}", job.file_path.display()))?;
    tracing::debug!(
        url = %job.url,
        path = %job.file_path.display(),
        bytes = body.len(),
        "downloaded feed page"
    );
    Ok(())
}

/// The `download` subcommand. A failed page is logged and skipped so one bad
/// library does not sink the whole run.
pub async fn run_download(config: &Config) -> Result<()> {
    let start = config.resolved_start_date(Local::now().date_naive())?;
    let jobs = build_jobs(config, start)?;

    let client = reqwest::Client::new();
    let mut failures = 0usize;
    for job in &jobs {
        if let Err(error) = download_one(&client, job).await {
            tracing::warn!(url = %job.url, error = %error, "feed page download failed");
            failures += 1;
        }
    }
    tracing::info!(pages = jobs.len(), failures, "download finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn file_path_template_substitutes_code_and_page() {
        assert_eq!(
            render_file_path("tmp_rss_{code}_{page}.rss", "smcl", 3),
            PathBuf::from("tmp_rss_smcl_3.rss")
        );
    }

    #[test]
    fn page_url_sets_date_range_and_page() {
        let base = Url::parse("https://gateway.example/v2/libraries/smcl/rss/events?audiences=abc")
            .unwrap();
        let url = page_url(&base, date("2025-01-10"), date("2025-01-18"), 2);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("audiences".into(), "abc".into())));
        assert!(pairs.contains(&("startDate".into(), "2025-01-10".into())));
        assert!(pairs.contains(&("endDate".into(), "2025-01-18".into())));
        assert!(pairs.contains(&("page".into(), "2".into())));
    }

    #[test]
    fn page_url_replaces_stale_pagination_params() {
        let base = Url::parse("https://gateway.example/rss/events?page=9&startDate=2020-01-01")
            .unwrap();
        let url = page_url(&base, date("2025-01-10"), date("2025-01-18"), 1);
        let pages: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "page")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(pages, vec!["1".to_string()]);
    }

    #[test]
    fn build_jobs_crosses_feeds_with_pages() {
        let config = Config {
            feeds: vec![
                FeedConfig {
                    url: "https://gateway.example/smcl/rss/events".to_string(),
                    code: "smcl".to_string(),
                },
                FeedConfig {
                    url: "https://gateway.example/sfpl/rss/events".to_string(),
                    code: "sfpl".to_string(),
                },
            ],
            pages: 2,
            days: 8,
            start_date: "today".to_string(),
            filepath_template: "tmp_rss_{code}_{page}.rss".to_string(),
            readme_path: PathBuf::from("tmp.md"),
        };
        let jobs = build_jobs(&config, date("2025-01-10")).unwrap();
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[0].file_path, PathBuf::from("tmp_rss_smcl_1.rss"));
        assert_eq!(jobs[1].file_path, PathBuf::from("tmp_rss_smcl_2.rss"));
        assert_eq!(jobs[3].file_path, PathBuf::from("tmp_rss_sfpl_2.rss"));
        assert!(jobs[0].url.as_str().contains("endDate=2025-01-18"));
    }

    #[test]
    fn build_jobs_rejects_bad_urls() {
        let config = Config {
            feeds: vec![FeedConfig {
                url: "not a url".to_string(),
                code: "x".to_string(),
            }],
            pages: 1,
            days: 8,
            start_date: "today".to_string(),
            filepath_template: "tmp_rss_{code}_{page}.rss".to_string(),
            readme_path: PathBuf::from("tmp.md"),
        };
        assert!(build_jobs(&config, date("2025-01-10")).is_err());
    }
}
