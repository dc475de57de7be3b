//! Link discovery on operator download pages.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::info;
use url::Url;

use crate::operators::{LinkRule, LinkSource, OperatorConfig};

/// Fetch the operator's download page and extract the archive URLs its link
/// rule matches, in page order.
pub async fn discover_urls(client: &Client, cfg: &OperatorConfig) -> Result<Vec<String>> {
    let html = client
        .get(cfg.search_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .with_context(|| format!("fetching {}", cfg.search_url))?;
    let urls = extract_links(&html, &cfg.link, cfg.search_url)?;
    info!(operator = cfg.tag, links = urls.len(), "discovered download links");
    Ok(urls)
}

/// Pure extraction half of [`discover_urls`]: run the link rule against an
/// already-fetched page.
pub fn extract_links(html: &str, rule: &LinkRule, page_url: &str) -> Result<Vec<String>> {
    // Selectors are compile-time constants per operator.
    let selector = Selector::parse(rule.selector).expect("operator link selector is valid CSS");
    let text_pattern = rule
        .text_pattern
        .map(Regex::new)
        .transpose()
        .context("operator link text pattern")?;
    let base = Url::parse(page_url).with_context(|| format!("parsing page URL {page_url:?}"))?;

    let document = Html::parse_document(html);
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let text: String = element.text().collect();
        if let Some(pattern) = &text_pattern {
            if !pattern.is_match(text.trim()) {
                continue;
            }
        }
        let link = match rule.source {
            LinkSource::Href => match element.value().attr("href") {
                Some(href) => base.join(href)?.to_string(),
                None => continue,
            },
            LinkSource::Text => match rule.prefix {
                Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), text.trim()),
                None => text.trim().to_string(),
            },
        };
        links.push(link);
    }
    Ok(links)
}

/// Keep the URLs whose text contains any of the requested years (substring
/// match, the way operators embed years in archive names).
pub fn filter_by_years(urls: Vec<String>, years: &BTreeSet<i32>) -> Vec<String> {
    urls.into_iter()
        .filter(|url| years.iter().any(|year| url.contains(&year.to_string())))
        .collect()
}
