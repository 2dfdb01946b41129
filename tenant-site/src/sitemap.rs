// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use tracing::{error, info};

use crate::config::{SitemapConfig, TenantConfig};
use crate::content::{Article, ContentSource};
use crate::rewrite::{alternates, canonical_url};
use crate::utils::escape_html_attribute;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SitemapEntry {
	pub slug: String,
	/// `YYYY-MM-DD`
	pub lastmod: Option<String>,
	pub changefreq: Option<&'static str>,
	pub priority: &'static str,
}

/// With an owner configured, every other tenant answers /sitemap.xml with 404.
pub fn sitemap_allowed(config: &SitemapConfig, tenant_id: &str) -> bool {
	config.owner.as_deref().is_none_or(|owner| owner == tenant_id)
}

/// Home first, then mapped pages, then published articles. Each slug appears once.
pub fn sitemap_entries(tenant: &TenantConfig, articles: &[Article]) -> Vec<SitemapEntry> {
	let home = tenant.home_slug().to_string();
	let latest_update = articles
		.iter()
		.filter(|a| a.is_published())
		.filter_map(Article::updated)
		.max()
		.map(|d| d.format("%Y-%m-%d").to_string());

	let mut seen = HashSet::new();
	let mut entries = vec![SitemapEntry {
		slug: home.clone(),
		lastmod: latest_update,
		changefreq: None,
		priority: "1.00",
	}];
	seen.insert(home);

	for slug in tenant.path_mapping.values() {
		if seen.insert(slug.clone()) {
			entries.push(SitemapEntry {
				slug: slug.clone(),
				lastmod: None,
				changefreq: Some("monthly"),
				priority: "0.80",
			});
		}
	}

	for article in articles.iter().filter(|a| a.is_published()) {
		let Some(slug) = article.slug.as_deref().map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) else {
			continue;
		};
		let lastmod = article.updated().map(|d| d.format("%Y-%m-%d").to_string());
		if seen.insert(slug.to_string()) {
			entries.push(SitemapEntry {
				slug: slug.to_string(),
				lastmod,
				changefreq: Some("monthly"),
				priority: "0.80",
			});
		} else if let Some(existing) = entries.iter_mut().find(|e| e.slug == slug)
			&& existing.lastmod.is_none()
		{
			existing.lastmod = lastmod;
		}
	}

	entries
}

/// One `<url>` per entry and language, each listing every language version as an alternate.
pub fn render_sitemap(base_url: &str, tenant: &TenantConfig, entries: &[SitemapEntry]) -> String {
	let mut sitemap = String::from(
		"<?xml version=\"1.0\" encoding=\"UTF-8\"?><urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">",
	);

	for entry in entries {
		let links = alternates(base_url, tenant, &entry.slug);
		for language in &tenant.supported_languages {
			let loc = canonical_url(base_url, tenant, language, &entry.slug);
			sitemap.push_str(&format!("\n<url><loc>{}</loc>", escape_html_attribute(&loc)));
			for link in &links {
				sitemap.push_str(&format!(
					"<xhtml:link rel=\"alternate\" hreflang=\"{}\" href=\"{}\"/>",
					link.hreflang,
					escape_html_attribute(&link.href)
				));
			}
			if let Some(date) = &entry.lastmod {
				sitemap.push_str(&format!("<lastmod>{date}</lastmod>"));
			}
			if let Some(changefreq) = entry.changefreq {
				sitemap.push_str(&format!("<changefreq>{changefreq}</changefreq>"));
			}
			sitemap.push_str(&format!("<priority>{}</priority></url>", entry.priority));
		}
	}

	sitemap.push_str("\n</urlset>\n");
	sitemap
}

/// Falls back to the statically known pages when the article listing is unavailable.
pub async fn build_sitemap(source: &dyn ContentSource, tenant_id: &str, tenant: &TenantConfig, base_url: &str) -> String {
	let articles = match tenant.customer_id.as_deref() {
		Some(customer_id) => match source.articles(customer_id).await {
			Ok(articles) => articles,
			Err(e) => {
				error!("Failed to list articles for {tenant_id} sitemap: {e}");
				Vec::new()
			}
		},
		None => Vec::new(),
	};

	let entries = sitemap_entries(tenant, &articles);
	info!("Built sitemap for {tenant_id} with {} pages", entries.len());
	render_sitemap(base_url, tenant, &entries)
}

pub fn robots_txt(base_url: &str) -> String {
	format!("User-agent: *\nAllow: /\n\nSitemap: {base_url}/sitemap.xml\n")
}
