// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

//! Remote content API: page lookup, article listings and favicons.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ContentConfig;
use crate::error::{ContentError, ContentResult};

/// Markers the CMS used to leave in blog markup before pages carried a type.
const LEGACY_BLOG_MARKERS: &[&str] = &[
	"\"pageType\":\"blog\"",
	"\"content\":",
	"\"type\":\"blog\"",
	"\"cluster\":",
	"\"author\":",
];

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
	pub title: Option<String>,
	pub description: Option<String>,
	pub html: Option<String>,
	pub content: Option<String>,
	pub slug: Option<String>,
	pub author: Option<String>,
	pub category: Option<String>,
	pub cover_image: Option<String>,
	pub created_at: Option<String>,
	pub updated_at: Option<String>,
	pub deployment_status: Option<String>,
	pub page_type: Option<String>,
	#[serde(rename = "type")]
	pub kind: Option<String>,
	pub reading_time: Option<ReadingTime>,
	pub page_stats: Option<PageStats>,
	pub site_url: Option<String>,
	pub publisher_name: Option<String>,
}

/// Minutes; the API sends this as either a number or a string.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ReadingTime {
	Minutes(u32),
	Text(String),
}

impl ReadingTime {
	pub fn minutes(&self) -> Option<u32> {
		match self {
			ReadingTime::Minutes(m) => Some(*m),
			ReadingTime::Text(s) => s.trim().trim_end_matches("min").trim().parse().ok(),
		}
	}
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageStats {
	pub gen_keywords: Keywords,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Keywords {
	List(Vec<String>),
	Joined(String),
}

impl Default for Keywords {
	fn default() -> Self {
		Keywords::List(Vec::new())
	}
}

impl Keywords {
	/// Comma-joined, empty entries dropped.
	pub fn joined(&self) -> String {
		match self {
			Keywords::List(list) => list.iter().map(|k| k.trim()).filter(|k| !k.is_empty()).collect::<Vec<_>>().join(","),
			Keywords::Joined(s) => s.trim().to_string(),
		}
	}
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
	Blog,
	Standard,
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
	let value = value?.trim();
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc()))
		.or_else(|_| chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()))
		.ok()
}

impl Article {
	pub fn is_published(&self) -> bool {
		self.deployment_status.as_deref() == Some("publish")
	}

	pub fn created(&self) -> Option<DateTime<Utc>> {
		parse_timestamp(self.created_at.as_deref())
	}

	pub fn updated(&self) -> Option<DateTime<Utc>> {
		parse_timestamp(self.updated_at.as_deref())
	}

	/// Publication time, falling back to the last update.
	pub fn published(&self) -> Option<DateTime<Utc>> {
		self.created().or_else(|| self.updated())
	}

	/// Scheme and host of `siteUrl`, the public address the CMS publishes this page under.
	/// Bare hosts are taken as https.
	pub fn site_origin(&self) -> Option<String> {
		let raw = self.site_url.as_deref()?.trim();
		if raw.is_empty() {
			return None;
		}
		let absolute = if raw.contains("://") { raw.to_string() } else { format!("https://{raw}") };
		let url = url::Url::parse(&absolute).ok()?;
		if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
			return None;
		}
		Some(url.origin().ascii_serialization())
	}

	pub fn keywords(&self) -> Option<String> {
		self.page_stats
			.as_ref()
			.map(|stats| stats.gen_keywords.joined())
			.filter(|k| !k.is_empty())
	}

	/// Blog or standard layout. Typed fields decide when present; markup sniffing is a
	/// fallback for pages created before the CMS tagged them.
	pub fn kind(&self, legacy_sniffing: bool) -> ContentKind {
		let typed = [&self.page_type, &self.kind, &self.category];
		if typed.iter().any(|field| field.as_deref().is_some_and(|v| v.eq_ignore_ascii_case("blog"))) {
			return ContentKind::Blog;
		}
		if self.page_type.is_some() || self.kind.is_some() {
			return ContentKind::Standard;
		}

		if legacy_sniffing
			&& let Some(html) = &self.html
			&& let Some(marker) = LEGACY_BLOG_MARKERS.iter().find(|marker| html.contains(**marker))
		{
			warn!(
				slug = self.slug.as_deref().unwrap_or(""),
				"Classified untyped page as blog by legacy markup marker {marker}"
			);
			return ContentKind::Blog;
		}
		ContentKind::Standard
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum PageLookup {
	Found(Box<Article>),
	NotFound,
}

#[derive(Deserialize)]
struct Envelope<T> {
	data: Option<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FaviconPayload {
	Plain(String),
	Wrapped { data: Option<String> },
}

/// What page rendering and the sitemap need from the CMS.
#[async_trait]
pub trait ContentSource: Send + Sync {
	async fn page(&self, slug: &str, language: &str, tenant: &str) -> ContentResult<PageLookup>;

	async fn articles(&self, customer_id: &str) -> ContentResult<Vec<Article>>;

	/// Best effort; any failure is `None`.
	async fn favicon(&self, tenant: &str) -> Option<String>;
}

pub struct ApiContentClient {
	client: reqwest::Client,
	base: Url,
	token: Option<String>,
}

impl ApiContentClient {
	pub fn new(config: &ContentConfig) -> ContentResult<Self> {
		// trailing slash so relative joins append instead of replacing the last segment
		let base = Url::parse(&format!("{}/", config.api_url.trim_end_matches('/')))?;
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_secs))
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Self {
			client,
			base,
			token: config.api_token.clone(),
		})
	}

	fn endpoint(&self, segments: &[&str]) -> ContentResult<Url> {
		let path = segments.iter().map(|s| urlencoding::encode(s).into_owned()).collect::<Vec<_>>().join("/");
		Ok(self.base.join(&path)?)
	}

	async fn get_json<T: serde::de::DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ContentResult<Option<T>> {
		let response = request.send().await?;
		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !status.is_success() {
			return Err(ContentError::Status {
				status: status.as_u16(),
				url: response.url().to_string(),
			});
		}
		let body = response.bytes().await?;
		Ok(Some(serde_json::from_slice(&body)?))
	}
}

#[async_trait]
impl ContentSource for ApiContentClient {
	#[instrument(skip(self))]
	async fn page(&self, slug: &str, language: &str, tenant: &str) -> ContentResult<PageLookup> {
		let url = self.endpoint(&["pages", "view", slug])?;
		let request = self.client.get(url).query(&[("lang", language), ("domain", tenant)]);
		match self.get_json::<Envelope<Article>>(request).await? {
			Some(Envelope { data: Some(article) }) => Ok(PageLookup::Found(Box::new(article))),
			_ => {
				debug!("No page for {slug:?}");
				Ok(PageLookup::NotFound)
			}
		}
	}

	#[instrument(skip(self))]
	async fn articles(&self, customer_id: &str) -> ContentResult<Vec<Article>> {
		let url = self.endpoint(&["pages", "article", customer_id])?;
		let mut request = self.client.get(url);
		if let Some(token) = &self.token {
			request = request.bearer_auth(token);
		}
		let listing = self.get_json::<Envelope<Vec<Article>>>(request).await?;
		Ok(listing.and_then(|envelope| envelope.data).unwrap_or_default())
	}

	#[instrument(skip(self))]
	async fn favicon(&self, tenant: &str) -> Option<String> {
		let url = self.endpoint(&["domain", "favicon"]).ok()?;
		let request = self.client.get(url).query(&[("domainName", tenant)]);
		let favicon = match self.get_json::<FaviconPayload>(request).await {
			Ok(Some(FaviconPayload::Plain(url))) => Some(url),
			Ok(Some(FaviconPayload::Wrapped { data })) => data,
			Ok(None) => None,
			Err(e) => {
				debug!("Favicon lookup for {tenant} failed: {e}");
				None
			}
		};
		favicon.filter(|url| !url.trim().is_empty())
	}
}
