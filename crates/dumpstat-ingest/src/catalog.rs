//! Export catalog resolution
//!
//! The export host publishes a plain HTML index of `<type>-YYYY-MM-DD.csv.gz`
//! files. Only the newest file per type matters; older dumps are ignored.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};

static ARCHIVE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+\.csv\.gz)""#).expect("static pattern"));

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static pattern"));

/// A dump file named in the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Text before the first `-`, e.g. `tag_aliases`
    pub dataset: String,
    /// Zero-padded ISO date, compared lexicographically
    pub date: String,
    pub file_name: String,
}

impl CatalogEntry {
    /// Parse a listing file name; `None` when it carries no valid date
    pub fn parse(file_name: &str) -> Option<Self> {
        let (dataset, _) = file_name.split_once('-')?;
        if dataset.is_empty() {
            return None;
        }

        let date = ISO_DATE.find(file_name)?.as_str();
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;

        Some(Self {
            dataset: dataset.to_string(),
            date: date.to_string(),
            file_name: file_name.to_string(),
        })
    }
}

/// Source of dump file names
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// File names of every archive currently published
    async fn list(&self) -> Result<Vec<String>>;
}

/// Scrapes the export's HTML index page
pub struct HtmlCatalog {
    client: Client,
    url: String,
}

impl HtmlCatalog {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|e| {
            IngestError::Catalog(format!("invalid listing URL {}: {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl CatalogProvider for HtmlCatalog {
    async fn list(&self) -> Result<Vec<String>> {
        debug!("Fetching export listing from: {}", self.url);

        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let html = response.text().await?;

        let files = archive_links(&html);
        debug!(count = files.len(), "Found archive links in listing");
        Ok(files)
    }
}

/// Fixed set of file names, for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    files: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.files.clone())
    }
}

/// Last path segment of every `href="….csv.gz"` in `html`
pub fn archive_links(html: &str) -> Vec<String> {
    ARCHIVE_HREF
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            href.rsplit('/').next().map(str::to_string)
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Newest file per dataset type. Dateless names never take part.
pub fn select_latest<I, S>(files: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut newest: BTreeMap<String, CatalogEntry> = BTreeMap::new();

    for name in files {
        let Some(entry) = CatalogEntry::parse(name.as_ref()) else {
            debug!(file = name.as_ref(), "Skipping listing entry without a date");
            continue;
        };

        match newest.get(&entry.dataset) {
            Some(current) if current.date >= entry.date => {},
            _ => {
                newest.insert(entry.dataset.clone(), entry);
            },
        }
    }

    newest
        .into_iter()
        .map(|(dataset, entry)| (dataset, entry.file_name))
        .collect()
}

/// List the catalog and reduce it to the newest file per type
pub async fn resolve_latest(provider: &dyn CatalogProvider) -> Result<BTreeMap<String, String>> {
    let files = provider.list().await?;
    let latest = select_latest(&files);

    info!(
        listed = files.len(),
        types = latest.len(),
        "Resolved {} dataset types from the export listing",
        latest.len()
    );

    Ok(latest)
}
