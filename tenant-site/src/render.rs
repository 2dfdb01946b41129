// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::{info, instrument, warn};

use crate::content::{Article, ContentKind};
use crate::seo::SeoMetadata;
use crate::utils::EscapeHtmlAttribute;

/// Slug that renders the domain verification page without touching the content API.
pub const VERIFICATION_SLUG: &str = "test-rendering";

const BASE_TEMPLATE: &str = r#"<!doctype html>
<html lang="{{ seo.language }}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{ seo.title }}</title>
<meta name="description" content="{{ seo.description | escape_html_attribute }}">
{% if seo.keywords %}<meta name="keywords" content="{{ seo.keywords | escape_html_attribute }}">
{% endif %}<meta name="robots" content="{{ seo.robots }}">
{% if seo.author %}<meta name="author" content="{{ seo.author | escape_html_attribute }}">
{% endif %}{% if seo.canonical %}<link rel="canonical" href="{{ seo.canonical | escape_html_attribute }}">
{% endif %}{% for alternate in seo.alternates %}<link rel="alternate" hreflang="{{ alternate.hreflang }}" href="{{ alternate.href | escape_html_attribute }}">
{% endfor %}<link rel="icon" href="{{ seo.icon | escape_html_attribute }}">
<meta property="og:title" content="{{ seo.open_graph.title | escape_html_attribute }}">
<meta property="og:description" content="{{ seo.open_graph.description | escape_html_attribute }}">
<meta property="og:type" content="{{ seo.open_graph.type }}">
<meta property="og:locale" content="{{ seo.open_graph.locale }}">
<meta property="og:site_name" content="{{ seo.open_graph.site_name | escape_html_attribute }}">
{% if seo.open_graph.url %}<meta property="og:url" content="{{ seo.open_graph.url | escape_html_attribute }}">
{% endif %}{% if seo.open_graph.published_time %}<meta property="article:published_time" content="{{ seo.open_graph.published_time }}">
{% endif %}{% if seo.open_graph.modified_time %}<meta property="article:modified_time" content="{{ seo.open_graph.modified_time }}">
{% endif %}{% if seo.open_graph.image %}<meta property="og:image" content="{{ seo.open_graph.image.url | escape_html_attribute }}">
<meta property="og:image:width" content="{{ seo.open_graph.image.width }}">
<meta property="og:image:height" content="{{ seo.open_graph.image.height }}">
<meta property="og:image:alt" content="{{ seo.open_graph.image.alt | escape_html_attribute }}">
{% endif %}<meta name="twitter:card" content="{{ seo.twitter.card }}">
<meta name="twitter:title" content="{{ seo.twitter.title | escape_html_attribute }}">
<meta name="twitter:description" content="{{ seo.twitter.description | escape_html_attribute }}">
{% if seo.twitter.image %}<meta name="twitter:image" content="{{ seo.twitter.image | escape_html_attribute }}">
{% endif %}{% if seo.twitter.creator %}<meta name="twitter:creator" content="{{ seo.twitter.creator | escape_html_attribute }}">
{% endif %}{% for ld in ldjson %}<script type="application/ld+json">{{ ld | safe }}</script>
{% endfor %}</head>
<body>
{% block body %}{% endblock body %}
</body>
</html>
"#;

const PAGE_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block body %}<main class="page" lang="{{ seo.language }}">
{{ body | safe }}
</main>{% endblock body %}
"#;

const BLOG_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block body %}<main class="blog" lang="{{ seo.language }}">
<article>
<header>
{% if article.title %}<h1>{{ article.title }}</h1>{% endif %}
<p class="byline">{% if article.author %}<span class="author">{{ article.author }}</span>{% endif %}{% if seo.open_graph.published_time %} <time datetime="{{ seo.open_graph.published_time }}">{{ seo.open_graph.published_time | truncate(length=10, end="") }}</time>{% endif %}{% if reading_minutes %} <span class="reading-time">{{ reading_minutes }} min</span>{% endif %}</p>
{% if article.coverImage %}<img class="cover" src="{{ article.coverImage | escape_html_attribute }}" alt="{{ seo.open_graph.title | escape_html_attribute }}" width="1200" height="630">{% endif %}
</header>
{{ body | safe }}
</article>
</main>{% endblock body %}
"#;

const NOT_FOUND_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block body %}<main class="not-found">
<h1>{{ seo.title }}</h1>
<p>{{ seo.description }}</p>
</main>{% endblock body %}
"#;

const VERIFIED_TEMPLATE: &str = r#"<!doctype html>
<html lang="{{ language }}">
<head>
<meta charset="utf-8">
<meta name="robots" content="noindex, nofollow">
<title>Configured Successfully</title>
</head>
<body>
<main class="verified">
<h1>Configured Successfully</h1>
<p>{{ tenant }} is connected and serving pages in {{ languages | join(sep=", ") }}.</p>
</main>
</body>
</html>
"#;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
	("base.html", BASE_TEMPLATE),
	("page.html", PAGE_TEMPLATE),
	("blog.html", BLOG_TEMPLATE),
	("not_found.html", NOT_FOUND_TEMPLATE),
	("verified.html", VERIFIED_TEMPLATE),
];

pub struct PageView<'a> {
	pub article: &'a Article,
	pub kind: ContentKind,
	pub seo: &'a SeoMetadata,
	/// Already serialized JSON-LD documents.
	pub ldjson: Vec<String>,
}

#[derive(Serialize)]
struct VerifiedView<'a> {
	tenant: &'a str,
	language: &'a str,
	languages: &'a [String],
}

/// Inner markup of `<body>` when the CMS hands over a whole document.
fn body_fragment(html: &str) -> &str {
	let lower = html.to_ascii_lowercase();
	let Some(open) = lower.find("<body") else {
		return html;
	};
	let Some(start) = lower[open..].find('>').map(|i| open + i + 1) else {
		return html;
	};
	let end = lower.rfind("</body>").filter(|&end| end >= start).unwrap_or(html.len());
	&html[start..end]
}

/// Template files under `dir`, named by their `/`-separated path relative to `root`.
fn collect_template_files(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, Option<String>)>) -> std::io::Result<()> {
	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		if file_name.starts_with('.') || file_name.ends_with('~') || file_name.ends_with(".tmp") {
			continue;
		}
		if path.is_dir() {
			collect_template_files(root, &path, out)?;
		} else if let Ok(relative) = path.strip_prefix(root) {
			let name = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
			out.push((path, Some(name)));
		}
	}
	Ok(())
}

pub struct Renderer {
	tera: Tera,
}

impl Renderer {
	/// Built-in templates, with any same-named files under `templates_dir` taking precedence.
	/// Overrides may extend built-in layouts such as `base.html`.
	#[instrument]
	pub fn new(templates_dir: Option<&str>) -> tera::Result<Renderer> {
		let mut tera = Tera::default();
		tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())?;

		if let Some(dir) = templates_dir {
			let root = Path::new(dir);
			if root.is_dir() {
				let mut overrides = Vec::new();
				collect_template_files(root, root, &mut overrides)
					.map_err(|e| tera::Error::msg(format!("failed to read templates directory {dir}: {e}")))?;
				info!("Loaded {} template overrides from {dir}", overrides.len());
				// rebuilds inheritance over built-ins and overrides together
				tera.add_template_files(overrides)?;
			} else {
				warn!("Templates directory {dir} does not exist, using built-in templates");
			}
		}
		tera.register_filter("escape_html_attribute", EscapeHtmlAttribute);
		Ok(Renderer { tera })
	}

	pub fn render_page(&self, view: &PageView<'_>) -> tera::Result<String> {
		let template = match view.kind {
			ContentKind::Blog => "blog.html",
			ContentKind::Standard => "page.html",
		};
		let markup = match view.kind {
			ContentKind::Blog => view.article.content.as_deref().or(view.article.html.as_deref()),
			ContentKind::Standard => view.article.html.as_deref().or(view.article.content.as_deref()),
		}
		.unwrap_or("");

		let mut context = Context::new();
		context.insert("seo", view.seo);
		context.insert("article", view.article);
		context.insert("kind", &view.kind);
		context.insert("ldjson", &view.ldjson);
		context.insert("body", body_fragment(markup));
		context.insert("reading_minutes", &view.article.reading_time.as_ref().and_then(|r| r.minutes()));
		self.tera.render(template, &context)
	}

	pub fn render_not_found(&self, seo: &SeoMetadata) -> tera::Result<String> {
		let mut context = Context::new();
		context.insert("seo", seo);
		context.insert("ldjson", &Vec::<String>::new());
		self.tera.render("not_found.html", &context)
	}

	pub fn render_verified(&self, tenant: &str, language: &str, languages: &[String]) -> tera::Result<String> {
		let context = Context::from_serialize(VerifiedView {
			tenant,
			language,
			languages,
		})?;
		self.tera.render("verified.html", &context)
	}
}
