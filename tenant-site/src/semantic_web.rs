// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use crate::config::TenantConfig;
use crate::content::{Article, ContentKind};
use crate::seo::{PageContext, iso8601};

fn build_author_object(article: &Article) -> Option<serde_json::Value> {
	let name = article.author.as_deref().map(str::trim).filter(|a| !a.is_empty())?;
	Some(serde_json::json!({
		"@type": "Person",
		"name": name
	}))
}

fn set_if_present(json: &mut serde_json::Value, key: &str, value: Option<&str>) {
	if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
		json[key] = serde_json::Value::String(value.to_string());
	}
}

/// `Article` or `BlogPosting` depending on the page layout.
pub fn article_ldjson(article: &Article, kind: ContentKind, ctx: &PageContext<'_>) -> serde_json::Value {
	let canonical = ctx.canonical();
	let schema_type = match kind {
		ContentKind::Blog => "BlogPosting",
		ContentKind::Standard => "Article",
	};
	let publisher = article
		.publisher_name
		.as_deref()
		.filter(|p| !p.trim().is_empty())
		.unwrap_or(&ctx.seo.publisher_name);

	let mut json = serde_json::json!({
		"@context": "https://schema.org",
		"@type": schema_type,
		"@id": canonical,
		"url": canonical,
		"inLanguage": ctx.route.language,
		"publisher": {
			"@type": "Organization",
			"name": publisher
		},
		"mainEntityOfPage": {
			"@type": "WebPage",
			"@id": canonical
		}
	});

	set_if_present(&mut json, "headline", article.title.as_deref());
	set_if_present(&mut json, "description", article.description.as_deref());
	set_if_present(&mut json, "image", article.cover_image.as_deref());
	set_if_present(&mut json, "articleSection", article.category.as_deref());
	set_if_present(&mut json, "articleBody", article.content.as_deref());
	set_if_present(&mut json, "keywords", article.keywords().as_deref());

	if let Some(published) = article.published() {
		json["datePublished"] = serde_json::Value::String(iso8601(published));
	}
	if let Some(modified) = article.updated().or_else(|| article.published()) {
		json["dateModified"] = serde_json::Value::String(iso8601(modified));
	}
	if let Some(author) = build_author_object(article) {
		json["author"] = author;
	}
	if let Some(minutes) = article.reading_time.as_ref().and_then(|r| r.minutes()) {
		json["timeRequired"] = serde_json::Value::String(format!("PT{minutes}M"));
	}

	json
}

pub fn website_ldjson(tenant_id: &str, tenant: &TenantConfig, base_url: &str, language: &str) -> serde_json::Value {
	let now = chrono::Utc::now();
	let url = tenant
		.subfolder
		.as_ref()
		.map(|subfolder| format!("{base_url}/{subfolder}"))
		.unwrap_or_else(|| format!("{base_url}/"));
	serde_json::json!({
		"@context": "https://schema.org",
		"@type": "WebSite",
		"name": tenant.site_name.as_deref().unwrap_or(tenant_id),
		"url": url,
		"inLanguage": language,
		"availableLanguage": tenant.supported_languages,
		"copyrightYear": now.format("%Y").to_string()
	})
}
