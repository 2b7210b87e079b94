// src/services/acquisition.rs

//! Listing page acquisition.
//!
//! A [`PageSource`] yields the raw text of every offer card currently on
//! the listing, in page order.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::SourceConfig;
use crate::utils::http::{create_async_client, fetch_text};

/// Supplier of raw card blocks.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the text of every card on the listing.
    ///
    /// Fails as a whole when any page cannot be obtained, so a partial
    /// listing is never mistaken for the full one.
    async fn fetch_raw_blocks(&self) -> Result<Vec<String>>;
}

/// Fetches listing pages over HTTP and cuts them into cards.
pub struct HttpPageSource {
    client: Client,
    urls: Vec<String>,
    card_selector: Selector,
    concurrency: usize,
}

impl HttpPageSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            urls: config.urls.clone(),
            card_selector: Self::parse_selector(&config.card_selector)?,
            concurrency: config.max_concurrent.max(1),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<String>> {
        let html = fetch_text(&self.client, url)
            .await
            .map_err(|e| AppError::acquisition(format!("{url}: {e}")))?;
        let blocks = extract_blocks(&html, &self.card_selector);
        log::debug!("{} cards on {}", blocks.len(), url);
        Ok(blocks)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_raw_blocks(&self) -> Result<Vec<String>> {
        let pages: Vec<Vec<String>> = stream::iter(self.urls.clone())
            .map(|url| async move { self.fetch_page(&url).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(pages.into_iter().flatten().collect())
    }
}

/// Serves a fixed list of blocks.
#[derive(Debug, Clone, Default)]
pub struct StaticPageSource {
    blocks: Vec<String>,
}

impl StaticPageSource {
    pub fn new(blocks: Vec<String>) -> Self {
        Self { blocks }
    }
}

#[async_trait]
impl PageSource for StaticPageSource {
    async fn fetch_raw_blocks(&self) -> Result<Vec<String>> {
        Ok(self.blocks.clone())
    }
}

/// Elements that start a new line of visible text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Render every card matched by `selector` as newline-separated text.
pub fn extract_blocks(html: &str, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(html);
    document.select(selector).map(card_text).collect()
}

/// Visible text of a card, one line per block. Inline elements stay on
/// the current line and whitespace runs collapse to one space.
fn card_text(card: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    collect_lines(card, &mut current, &mut lines);
    end_line(&mut current, &mut lines);
    lines.join("\n")
}

fn collect_lines(element: ElementRef<'_>, current: &mut String, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            current.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };

        let name = child.value().name();
        if name == "br" {
            end_line(current, lines);
        } else if HIDDEN_ELEMENTS.contains(&name) {
            continue;
        } else if BLOCK_ELEMENTS.contains(&name) {
            end_line(current, lines);
            collect_lines(child, current, lines);
            end_line(current, lines);
        } else {
            collect_lines(child, current, lines);
        }
    }
}

fn end_line(current: &mut String, lines: &mut Vec<String>) {
    let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}
