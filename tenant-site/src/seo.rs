// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{SeoConfig, TenantConfig};
use crate::content::Article;
use crate::html_meta::ExtractedMeta;
use crate::rewrite::{Alternate, ResolvedRoute, alternates, canonical_url};

pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

const NOT_FOUND_TITLE: &str = "Not Found";
const NOT_FOUND_DESCRIPTION: &str = "The page you are looking for does not exist.";

/// Everything about the current request that page metadata depends on.
#[derive(Clone, Copy)]
pub struct PageContext<'a> {
	pub route: &'a ResolvedRoute,
	pub tenant: &'a TenantConfig,
	/// Scheme and host without trailing slash.
	pub base_url: &'a str,
	pub seo: &'a SeoConfig,
}

impl PageContext<'_> {
	pub fn canonical(&self) -> String {
		canonical_url(self.base_url, self.tenant, &self.route.language, &self.route.slug)
	}

	pub fn site_name(&self, article: Option<&Article>) -> String {
		self.tenant
			.site_name
			.clone()
			.or_else(|| article.and_then(|a| a.publisher_name.clone()))
			.unwrap_or_else(|| self.route.tenant.clone())
	}
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OgImage {
	pub url: String,
	pub width: u32,
	pub height: u32,
	pub alt: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OpenGraph {
	pub title: String,
	pub description: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub url: Option<String>,
	pub published_time: Option<String>,
	pub modified_time: Option<String>,
	pub locale: String,
	pub site_name: String,
	pub image: Option<OgImage>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TwitterCard {
	pub card: String,
	pub title: String,
	pub description: String,
	pub image: Option<String>,
	pub creator: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SeoMetadata {
	pub title: String,
	pub description: String,
	pub keywords: Option<String>,
	pub robots: String,
	pub language: String,
	pub canonical: Option<String>,
	pub alternates: Vec<Alternate>,
	pub open_graph: OpenGraph,
	pub twitter: TwitterCard,
	pub icon: String,
	pub author: Option<String>,
	pub category: Option<String>,
}

pub fn iso8601(dt: DateTime<Utc>) -> String {
	dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn non_empty(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// HTML `<link rel=icon>` beats the API favicon, which beats the configured default.
pub fn choose_icon(extracted: &ExtractedMeta, api_favicon: Option<&str>, seo: &SeoConfig) -> String {
	non_empty(extracted.icon.as_deref())
		.or_else(|| non_empty(api_favicon))
		.unwrap_or_else(|| seo.default_favicon.clone())
}

impl SeoMetadata {
	pub fn build(article: &Article, ctx: &PageContext<'_>, extracted: &ExtractedMeta, api_favicon: Option<&str>) -> SeoMetadata {
		let title = non_empty(extracted.title.as_deref())
			.or_else(|| non_empty(article.title.as_deref()))
			.unwrap_or_else(|| ctx.site_name(Some(article)));
		let description = non_empty(extracted.description.as_deref())
			.or_else(|| non_empty(article.description.as_deref()))
			.unwrap_or_default();
		let keywords = non_empty(extracted.keywords.as_deref())
			.or_else(|| article.keywords())
			.or_else(|| ctx.seo.default_keywords.clone());
		let canonical = ctx.canonical();
		let og_title = non_empty(article.title.as_deref()).unwrap_or_else(|| title.clone());
		let cover = non_empty(article.cover_image.as_deref());

		SeoMetadata {
			open_graph: OpenGraph {
				title: og_title.clone(),
				description: description.clone(),
				kind: "article".to_string(),
				url: Some(canonical.clone()),
				published_time: article.published().map(iso8601),
				modified_time: article.updated().map(iso8601),
				locale: ctx.route.language.clone(),
				site_name: ctx.site_name(Some(article)),
				image: cover.clone().map(|url| OgImage {
					url,
					width: OG_IMAGE_WIDTH,
					height: OG_IMAGE_HEIGHT,
					alt: og_title.clone(),
				}),
			},
			twitter: TwitterCard {
				card: "summary_large_image".to_string(),
				title: og_title,
				description: description.clone(),
				image: cover,
				creator: ctx.seo.twitter_creator.clone(),
			},
			title,
			description,
			keywords,
			robots: "index, follow".to_string(),
			language: ctx.route.language.clone(),
			alternates: alternates(ctx.base_url, ctx.tenant, &ctx.route.slug),
			canonical: Some(canonical),
			icon: choose_icon(extracted, api_favicon, ctx.seo),
			author: non_empty(article.author.as_deref()),
			category: non_empty(article.category.as_deref()),
		}
	}

	/// Metadata for missing or unpublished pages; never indexed, no canonical.
	pub fn not_found(ctx: &PageContext<'_>, api_favicon: Option<&str>) -> SeoMetadata {
		SeoMetadata {
			title: NOT_FOUND_TITLE.to_string(),
			description: NOT_FOUND_DESCRIPTION.to_string(),
			keywords: None,
			robots: "noindex, nofollow".to_string(),
			language: ctx.route.language.clone(),
			canonical: None,
			alternates: Vec::new(),
			open_graph: OpenGraph {
				title: NOT_FOUND_TITLE.to_string(),
				description: NOT_FOUND_DESCRIPTION.to_string(),
				kind: "website".to_string(),
				url: None,
				published_time: None,
				modified_time: None,
				locale: ctx.route.language.clone(),
				site_name: ctx.site_name(None),
				image: None,
			},
			twitter: TwitterCard {
				card: "summary".to_string(),
				title: NOT_FOUND_TITLE.to_string(),
				description: NOT_FOUND_DESCRIPTION.to_string(),
				image: None,
				creator: None,
			},
			icon: choose_icon(&ExtractedMeta::default(), api_favicon, ctx.seo),
			author: None,
			category: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::content::{Keywords, PageStats};

	fn tenant() -> TenantConfig {
		TenantConfig {
			supported_languages: vec!["en".to_string(), "zh".to_string()],
			site_name: Some("WebsiteLM".to_string()),
			..TenantConfig::default()
		}
	}

	fn route(language: &str, slug: &str) -> ResolvedRoute {
		ResolvedRoute {
			tenant: "websitelm.com".to_string(),
			language: language.to_string(),
			slug: slug.to_string(),
			internal_path: format!("/{language}/{slug}"),
			external_path: String::new(),
		}
	}

	fn article() -> Article {
		Article {
			title: Some("Article title".to_string()),
			description: Some("API description".to_string()),
			cover_image: Some("https://cdn.example/cover.png".to_string()),
			created_at: Some("2025-03-01T12:00:00Z".to_string()),
			updated_at: Some("2025-03-05T08:30:00+02:00".to_string()),
			author: Some("Ada".to_string()),
			page_stats: Some(PageStats {
				gen_keywords: Keywords::List(vec!["ai".to_string(), "seo".to_string()]),
			}),
			..Article::default()
		}
	}

	#[test]
	fn test_markup_overrides_api_fields() {
		let t = tenant();
		let r = route("zh", "features");
		let seo = SeoConfig::default();
		let ctx = PageContext {
			route: &r,
			tenant: &t,
			base_url: "https://websitelm.com",
			seo: &seo,
		};
		let extracted = ExtractedMeta {
			title: Some("Markup title".to_string()),
			description: Some("Markup description".to_string()),
			keywords: None,
			icon: None,
		};
		let meta = SeoMetadata::build(&article(), &ctx, &extracted, Some("https://api/icon.png"));

		assert_eq!(meta.title, "Markup title");
		assert_eq!(meta.description, "Markup description");
		assert_eq!(meta.keywords.as_deref(), Some("ai,seo"));
		assert_eq!(meta.robots, "index, follow");
		assert_eq!(meta.canonical.as_deref(), Some("https://websitelm.com/zh/features"));
		assert_eq!(meta.icon, "https://api/icon.png");
		assert_eq!(meta.open_graph.title, "Article title");
		assert_eq!(meta.open_graph.published_time.as_deref(), Some("2025-03-01T12:00:00Z"));
		assert_eq!(meta.open_graph.modified_time.as_deref(), Some("2025-03-05T06:30:00Z"));
		assert_eq!(meta.open_graph.locale, "zh");
		assert_eq!(meta.open_graph.site_name, "WebsiteLM");
		let image = meta.open_graph.image.as_ref().unwrap();
		assert_eq!((image.width, image.height), (1200, 630));
		assert_eq!(meta.twitter.card, "summary_large_image");

		let hreflangs: Vec<_> = meta.alternates.iter().map(|a| a.hreflang.as_str()).collect();
		assert_eq!(hreflangs, vec!["en", "zh", "x-default"]);
	}

	#[test]
	fn test_icon_precedence() {
		let seo = SeoConfig::default();
		let with_link = ExtractedMeta {
			icon: Some("/from-html.ico".to_string()),
			..ExtractedMeta::default()
		};
		assert_eq!(choose_icon(&with_link, Some("/api.ico"), &seo), "/from-html.ico");
		assert_eq!(choose_icon(&ExtractedMeta::default(), Some("/api.ico"), &seo), "/api.ico");
		assert_eq!(choose_icon(&ExtractedMeta::default(), Some("  "), &seo), "/default-favicon.ico");
		assert_eq!(choose_icon(&ExtractedMeta::default(), None, &seo), "/default-favicon.ico");
	}

	#[test]
	fn test_not_found_is_noindex() {
		let t = tenant();
		let r = route("en", "missing");
		let seo = SeoConfig::default();
		let ctx = PageContext {
			route: &r,
			tenant: &t,
			base_url: "https://websitelm.com",
			seo: &seo,
		};
		let meta = SeoMetadata::not_found(&ctx, None);
		assert_eq!(meta.robots, "noindex, nofollow");
		assert_eq!(meta.title, "Not Found");
		assert_eq!(meta.canonical, None);
		assert!(meta.alternates.is_empty());
	}

	#[test]
	fn test_title_fallbacks() {
		let t = TenantConfig::default();
		let r = route("en", "home");
		let seo = SeoConfig {
			default_keywords: Some("default,keywords".to_string()),
			..SeoConfig::default()
		};
		let ctx = PageContext {
			route: &r,
			tenant: &t,
			base_url: "https://example.com",
			seo: &seo,
		};
		let meta = SeoMetadata::build(&Article::default(), &ctx, &ExtractedMeta::default(), None);
		assert_eq!(meta.title, "websitelm.com");
		assert_eq!(meta.description, "");
		assert_eq!(meta.keywords.as_deref(), Some("default,keywords"));
		assert_eq!(meta.canonical.as_deref(), Some("https://example.com/"));
		assert_eq!(meta.open_graph.image, None);
	}
}
