// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

// hyper 1.4 imports. Don't change these, don't assume things that work in hyper 0.x
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Request, StatusCode};

use autometrics::autometrics;
use http_body_util::Full;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::{Environment, SiteConfig, TenantConfig};
use crate::content::{ApiContentClient, ContentSource, PageLookup};
use crate::error::SiteError;
use crate::host::{resolve_tenant, tenant_origin};
use crate::html_meta::extract_meta;
use crate::render::{PageView, Renderer, VERIFICATION_SLUG};
use crate::rewrite::{ResolvedRoute, RouteDecision};
use crate::routing::{RequestParts, RoutedRequest, is_excluded, route_request};
use crate::semantic_web::{article_ldjson, website_ldjson};
use crate::seo::{PageContext, SeoMetadata};
use crate::sitemap::{build_sitemap, robots_txt, sitemap_allowed};
use crate::utils::json_for_script;

const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";
const VARY_LOCALE: &str = "Accept-Language, Cookie";

/// Everything a request needs, swapped as a unit on config reload.
pub struct Site {
	pub config: SiteConfig,
	pub renderer: Renderer,
	pub content: Box<dyn ContentSource>,
}

impl Site {
	pub fn new(config: SiteConfig) -> Result<Site, SiteError> {
		let renderer = Renderer::new(config.server.templates_dir.as_deref())?;
		let content = Box::new(ApiContentClient::new(&config.content)?);
		Ok(Site {
			config,
			renderer,
			content,
		})
	}
}

pub struct RequestContext {
	pub site: RwLock<Arc<Site>>,
	pub environment: Environment,
}

impl RequestContext {
	pub fn new(site: Site, environment: Environment) -> Self {
		Self {
			site: RwLock::new(Arc::new(site)),
			environment,
		}
	}

	/// One snapshot per request; a reload mid-request doesn't affect it.
	pub async fn snapshot(&self) -> Arc<Site> {
		self.site.read().await.clone()
	}
}

struct Body {
	content_type: &'static str,
	content: Bytes,
	last_modified: Option<SystemTime>,
}

/// HTTP response builder with extensible header and content support
struct Response {
	status: StatusCode,
	headers: Vec<(HeaderName, HeaderValue)>,
	body: Option<Body>,
}

impl Response {
	fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: vec![],
			body: None,
		}
	}

	fn text(status: StatusCode, text: &str) -> Self {
		Self::new(status).with_body("text/plain; charset=utf-8", Bytes::from(text.to_string()), None)
	}

	fn html(status: StatusCode, html: String, last_modified: Option<SystemTime>) -> Self {
		Self::new(status).with_body("text/html; charset=utf-8", Bytes::from(html), last_modified)
	}

	fn with_body(mut self, content_type: &'static str, content: Bytes, last_modified: Option<SystemTime>) -> Self {
		self.body = Some(Body {
			content_type,
			content,
			last_modified,
		});
		self
	}

	/// Values that aren't valid header text are dropped with a warning.
	fn with_header(mut self, name: HeaderName, value: impl AsRef<str>) -> Self {
		match HeaderValue::from_str(value.as_ref()) {
			Ok(value) => self.headers.push((name, value)),
			Err(_) => warn!("Dropping invalid {name} header value {:?}", value.as_ref()),
		}
		self
	}

	fn into_response(self, method: &Method) -> hyper::Response<Full<Bytes>> {
		use hyper::header::*;

		let mut headers = HeaderMap::new();
		add_security_headers(&mut headers);
		for (name, value) in self.headers {
			headers.append(name, value);
		}

		let body = match self.body {
			Some(body) => {
				headers.insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type));
				headers.insert(CONTENT_LENGTH, HeaderValue::from(body.content.len()));
				if let Some(last_modified) = body.last_modified
					&& let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(last_modified))
				{
					headers.insert(LAST_MODIFIED, value);
				}
				if method == Method::HEAD { Bytes::new() } else { body.content }
			}
			None => Bytes::new(),
		};

		let mut response = hyper::Response::new(Full::new(body));
		*response.status_mut() = self.status;
		*response.headers_mut() = headers;
		response
	}
}

fn add_security_headers(headers: &mut HeaderMap) {
	// Prevents MIME type sniffing, reducing risks of MIME confusion attacks
	headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
	// Limits referrer information to origin for cross-origin requests
	headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"));
	// Enforces HTTPS for one year, including subdomains
	headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static("max-age=31536000; includeSubDomains"));
	headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
	headers.insert(
		HeaderName::from_static("cross-origin-resource-policy"),
		HeaderValue::from_static("cross-origin"),
	);
}

fn check_if_modified(last_modified: SystemTime, headers: &HeaderMap) -> bool {
	let Some(if_modified_since) = headers
		.get(header::IF_MODIFIED_SINCE)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| httpdate::parse_http_date(v).ok())
	else {
		return false;
	};
	// HTTP dates have second resolution
	let secs = last_modified.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
	SystemTime::UNIX_EPOCH + Duration::from_secs(secs) <= if_modified_since
}

/// Configured base URL, else the client's origin when it is one of a configured tenant's own hosts,
/// else https on the tenant id.
fn base_url_for(tenant_id: &str, tenant: &TenantConfig, headers: &HeaderMap, site: &Site, environment: Environment) -> String {
	if let Some(base_url) = &tenant.base_url {
		return base_url.clone();
	}
	let origin = if site.config.is_known_tenant(tenant_id) || environment.is_development() {
		tenant_origin(headers, &site.config.host, environment, tenant_id)
	} else {
		None
	};
	origin.unwrap_or_else(|| format!("https://{tenant_id}"))
}

#[autometrics]
pub async fn handle_request(req: Request<Incoming>, request_context: Arc<RequestContext>) -> Result<hyper::Response<Full<Bytes>>, hyper::Error> {
	let span = tracing::span!(
		tracing::Level::INFO,
		"handle_request",
		http.method = ?req.method(),
		url.path = ?req.uri().path(),
		url.full = ?req.uri().to_string(),
		server.address = ?req.headers().get(header::HOST).and_then(|v| v.to_str().ok()).unwrap_or(""),
		network.protocol.name = "http",
		network.protocol.version = ?req.version(),
		user_agent.original = ?req.headers().get(header::USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or(""),
		http.response.status_code = tracing::field::Empty,
	);

	let method = req.method().clone();
	let parts = RequestParts::from_request(&req);
	let site = request_context.snapshot().await;

	let response = respond(&site, request_context.environment, &method, &parts)
		.instrument(span.clone())
		.await;
	span.record("http.response.status_code", response.status().as_u16());
	Ok(response)
}

/// Request dispatch against one site snapshot.
pub async fn respond(site: &Site, environment: Environment, method: &Method, parts: &RequestParts) -> hyper::Response<Full<Bytes>> {
	if method == Method::OPTIONS {
		return Response::new(StatusCode::NO_CONTENT)
			.with_header(header::ALLOW, ALLOWED_METHODS)
			.into_response(method);
	}
	if method != Method::GET && method != Method::HEAD {
		return Response::new(StatusCode::METHOD_NOT_ALLOWED)
			.with_header(header::ALLOW, ALLOWED_METHODS)
			.into_response(method);
	}
	if is_excluded(&parts.path) {
		debug!("{} is excluded from routing", parts.path);
		return Response::text(StatusCode::NOT_FOUND, "Not Found").into_response(method);
	}

	let response = match parts.path.as_str() {
		"/sitemap.xml" => serve_sitemap(site, environment, parts).await,
		"/robots.txt" => {
			let tenant_id = resolve_tenant(&parts.headers, &site.config.host, environment);
			let tenant = site.config.tenant(&tenant_id);
			let base_url = base_url_for(&tenant_id, tenant, &parts.headers, site, environment);
			Response::text(StatusCode::OK, &robots_txt(&base_url)).with_header(header::CACHE_CONTROL, &site.config.server.cache_control)
		}
		_ => {
			let routed = route_request(&site.config, environment, parts);
			serve_routed(site, environment, parts, routed).await
		}
	};
	response.into_response(method)
}

async fn serve_sitemap(site: &Site, environment: Environment, parts: &RequestParts) -> Response {
	let tenant_id = resolve_tenant(&parts.headers, &site.config.host, environment);
	if !sitemap_allowed(&site.config.sitemap, &tenant_id) {
		debug!("Sitemap requested for {tenant_id}, which does not own it");
		return Response::text(StatusCode::NOT_FOUND, "Not Found");
	}
	let tenant = site.config.tenant(&tenant_id);
	let base_url = base_url_for(&tenant_id, tenant, &parts.headers, site, environment);
	let sitemap = build_sitemap(site.content.as_ref(), &tenant_id, tenant, &base_url).await;
	Response::new(StatusCode::OK)
		.with_body("application/xml; charset=utf-8", Bytes::from(sitemap), None)
		.with_header(header::CACHE_CONTROL, &site.config.server.cache_control)
}

async fn serve_routed(site: &Site, environment: Environment, parts: &RequestParts, routed: RoutedRequest) -> Response {
	let tenant = site.config.tenant(&routed.tenant);
	let base_url = base_url_for(&routed.tenant, tenant, &parts.headers, site, environment);

	let response = match &routed.decision {
		RouteDecision::Redirect { location } => {
			return Response::new(StatusCode::PERMANENT_REDIRECT).with_header(header::LOCATION, location);
		}
		RouteDecision::NotFound => {
			let route = ResolvedRoute {
				tenant: routed.tenant.clone(),
				language: tenant.default_language.clone(),
				slug: String::new(),
				internal_path: String::new(),
				external_path: parts.path.clone(),
			};
			let ctx = PageContext {
				route: &route,
				tenant,
				base_url: &base_url,
				seo: &site.config.seo,
			};
			not_found_page(site, &ctx, None)
		}
		RouteDecision::Rewrite { route, .. } => {
			let ctx = PageContext {
				route,
				tenant,
				base_url: &base_url,
				seo: &site.config.seo,
			};
			serve_page(site, &ctx, &parts.headers).await
		}
	};

	let response = response.with_header(header::VARY, VARY_LOCALE);
	match &routed.set_cookie {
		Some(cookie) => response.with_header(header::SET_COOKIE, cookie),
		None => response,
	}
}

fn not_found_page(site: &Site, ctx: &PageContext<'_>, favicon: Option<&str>) -> Response {
	let seo = SeoMetadata::not_found(ctx, favicon);
	let response = match site.renderer.render_not_found(&seo) {
		Ok(html) => Response::html(StatusCode::NOT_FOUND, html, None),
		Err(e) => {
			error!("Failed to render not found page: {e:?}");
			Response::text(StatusCode::NOT_FOUND, "Not Found")
		}
	};
	response
		.with_header(header::CONTENT_LANGUAGE, &ctx.route.language)
		.with_header(header::CACHE_CONTROL, &site.config.server.cache_control)
}

async fn serve_page(site: &Site, ctx: &PageContext<'_>, request_headers: &HeaderMap) -> Response {
	let route = ctx.route;
	if route.slug == VERIFICATION_SLUG {
		info!("Serving verification page for {}", route.tenant);
		return match site.renderer.render_verified(&route.tenant, &route.language, &ctx.tenant.supported_languages) {
			Ok(html) => Response::html(StatusCode::OK, html, None)
				.with_header(header::CONTENT_LANGUAGE, &route.language)
				.with_header(header::CACHE_CONTROL, "no-store"),
			Err(e) => {
				error!("Failed to render verification page: {e:?}");
				Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
			}
		};
	}

	let (lookup, favicon) = tokio::join!(
		site.content.page(&route.slug, &route.language, &route.tenant),
		site.content.favicon(&route.tenant)
	);

	let article = match lookup {
		Ok(PageLookup::Found(article)) if article.is_published() => article,
		Ok(PageLookup::Found(_)) => {
			debug!("Page {} for {} is not published", route.slug, route.tenant);
			return not_found_page(site, ctx, favicon.as_deref());
		}
		Ok(PageLookup::NotFound) => return not_found_page(site, ctx, favicon.as_deref()),
		Err(e) => {
			error!("Content lookup for {} {} failed: {e}", route.tenant, route.internal_path);
			return Response::text(StatusCode::BAD_GATEWAY, "Bad Gateway").with_header(header::CACHE_CONTROL, "no-store");
		}
	};

	// the CMS's published address wins over whatever host the request came in on
	let site_origin = if ctx.tenant.base_url.is_none() { article.site_origin() } else { None };
	let ctx = &PageContext {
		base_url: site_origin.as_deref().unwrap_or(ctx.base_url),
		..*ctx
	};

	let last_modified = article.updated().or_else(|| article.published()).map(SystemTime::from);
	if let Some(last_modified) = last_modified
		&& check_if_modified(last_modified, request_headers)
	{
		return Response::new(StatusCode::NOT_MODIFIED);
	}

	let kind = article.kind(site.config.content.legacy_kind_sniffing);
	let extracted = extract_meta(article.html.as_deref().unwrap_or(""));
	let seo = SeoMetadata::build(&article, ctx, &extracted, favicon.as_deref());
	let ldjson = vec![
		json_for_script(&article_ldjson(&article, kind, ctx)),
		json_for_script(&website_ldjson(&route.tenant, ctx.tenant, ctx.base_url, &route.language)),
	];

	let view = PageView {
		article: &article,
		kind,
		seo: &seo,
		ldjson,
	};
	match site.renderer.render_page(&view) {
		Ok(html) => {
			let mut response = Response::html(StatusCode::OK, html, last_modified)
				.with_header(header::CONTENT_LANGUAGE, &route.language)
				.with_header(header::CACHE_CONTROL, &site.config.server.cache_control);
			if let Some(canonical) = &seo.canonical {
				response = response.with_header(header::LINK, format!("<{canonical}>; rel=\"canonical\""));
			}
			response
		}
		Err(e) => {
			error!("Failed to render {}: {e:?}", route.internal_path);
			Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::content::Article;
	use crate::error::{ContentError, ContentResult};
	use async_trait::async_trait;
	use http_body_util::BodyExt;
	use std::collections::HashMap;

	/// In-memory CMS keyed by (slug, language, tenant).
	#[derive(Default)]
	struct FakeContent {
		pages: HashMap<(String, String, String), Article>,
		failing: bool,
	}

	#[async_trait]
	impl ContentSource for FakeContent {
		async fn page(&self, slug: &str, language: &str, tenant: &str) -> ContentResult<PageLookup> {
			if self.failing {
				return Err(ContentError::Status {
					status: 503,
					url: "fake".to_string(),
				});
			}
			Ok(self
				.pages
				.get(&(slug.to_string(), language.to_string(), tenant.to_string()))
				.cloned()
				.map(|a| PageLookup::Found(Box::new(a)))
				.unwrap_or(PageLookup::NotFound))
		}

		async fn articles(&self, _customer_id: &str) -> ContentResult<Vec<Article>> {
			Ok(self.pages.values().cloned().collect())
		}

		async fn favicon(&self, _tenant: &str) -> Option<String> {
			None
		}
	}

	const CONFIG: &str = r#"
[sitemap]
owner = "websitelm.com"

[tenants."websitelm.com"]
supported_languages = ["en", "zh"]
customer_id = "c1"

[tenants."websitelm.com".path_mapping]
"/pricing" = "pricing-plans"
"#;

	fn site(content: FakeContent) -> Site {
		Site {
			config: SiteConfig::from_toml_str(CONFIG).unwrap(),
			renderer: Renderer::new(None).unwrap(),
			content: Box::new(content),
		}
	}

	fn published(title: &str) -> Article {
		Article {
			title: Some(title.to_string()),
			html: Some(format!("<html><head><title>{title}</title></head><body><p>{title} body</p></body></html>")),
			deployment_status: Some("publish".to_string()),
			updated_at: Some("2025-01-01T00:00:00Z".to_string()),
			..Article::default()
		}
	}

	fn content_with(pages: &[(&str, &str, Article)]) -> FakeContent {
		FakeContent {
			pages: pages
				.iter()
				.map(|(slug, lang, article)| ((slug.to_string(), lang.to_string(), "websitelm.com".to_string()), article.clone()))
				.collect(),
			..FakeContent::default()
		}
	}

	fn get(path: &str, headers: &[(&'static str, &'static str)]) -> RequestParts {
		let mut builder = Request::builder().uri(path).header("host", "www.websitelm.com");
		for (name, value) in headers {
			builder = builder.header(*name, *value);
		}
		RequestParts::from_request(&builder.body(()).unwrap())
	}

	async fn body_text(response: hyper::Response<Full<Bytes>>) -> String {
		let bytes = response.into_body().collect().await.unwrap().to_bytes();
		String::from_utf8(bytes.to_vec()).unwrap()
	}

	#[tokio::test]
	async fn test_page_served_with_headers() {
		let site = site(content_with(&[("home", "zh", published("首页"))]));
		let response = respond(&site, Environment::Production, &Method::GET, &get("/", &[("accept-language", "zh-CN")])).await;

		assert_eq!(response.status(), StatusCode::OK);
		let headers = response.headers();
		assert_eq!(headers[header::CONTENT_LANGUAGE], "zh");
		assert_eq!(headers[header::SET_COOKIE], "NEXT_LOCALE=zh; Path=/; Max-Age=2592000; SameSite=Lax");
		assert_eq!(headers[header::VARY], "Accept-Language, Cookie");
		assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600, s-maxage=3600, stale-while-revalidate=86400");
		assert_eq!(headers[header::LINK], "<https://www.websitelm.com/zh>; rel=\"canonical\"");
		assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
		assert!(headers.contains_key(header::LAST_MODIFIED));

		let html = body_text(response).await;
		assert!(html.contains("<p>首页 body</p>"));
		assert!(html.contains(r#"<script type="application/ld+json">"#));
	}

	#[tokio::test]
	async fn test_mapped_path_uses_slug() {
		let content = content_with(&[("pricing-plans", "en", published("Pricing"))]);
		let site = site(content);
		let response = respond(&site, Environment::Production, &Method::GET, &get("/pricing", &[("cookie", "NEXT_LOCALE=en")])).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert!(!response.headers().contains_key(header::SET_COOKIE));
		assert_eq!(response.headers()[header::LINK], "<https://www.websitelm.com/pricing>; rel=\"canonical\"");
	}

	#[tokio::test]
	async fn test_head_has_no_body() {
		let site = site(content_with(&[("home", "en", published("Home"))]));
		let response = respond(&site, Environment::Production, &Method::HEAD, &get("/", &[])).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_ne!(response.headers()[header::CONTENT_LENGTH], "0");
		assert_eq!(body_text(response).await, "");
	}

	#[tokio::test]
	async fn test_missing_and_unpublished_are_404() {
		let mut draft = published("Draft");
		draft.deployment_status = Some("draft".to_string());
		let site = site(content_with(&[("draft", "en", draft)]));

		for path in ["/nope", "/draft"] {
			let response = respond(&site, Environment::Production, &Method::GET, &get(path, &[])).await;
			assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
			let html = body_text(response).await;
			assert!(html.contains(r#"<meta name="robots" content="noindex, nofollow">"#));
		}
	}

	#[tokio::test]
	async fn test_content_failure_is_502() {
		let site = site(FakeContent {
			failing: true,
			..FakeContent::default()
		});
		let response = respond(&site, Environment::Production, &Method::GET, &get("/about", &[])).await;
		assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	}

	#[tokio::test]
	async fn test_verification_page_skips_content_api() {
		let content = FakeContent {
			failing: true,
			..FakeContent::default()
		};
		let site = site(content);
		let response = respond(&site, Environment::Production, &Method::GET, &get("/zh/test-rendering", &[])).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.headers()[header::CONTENT_LANGUAGE], "zh");
		// a failing content API would have produced a 502
		assert!(body_text(response).await.contains("Configured Successfully"));
	}

	#[tokio::test]
	async fn test_redirect_and_excluded() {
		let site = site(FakeContent::default());
		let response = respond(&site, Environment::Production, &Method::GET, &get("/zh/pricing/?a=1", &[])).await;
		assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
		assert_eq!(response.headers()[header::LOCATION], "/zh/pricing?a=1");
		assert!(!response.headers().contains_key(header::SET_COOKIE));

		for path in ["/api/pages", "/_next/static/x.js", "/favicon.ico"] {
			let response = respond(&site, Environment::Production, &Method::GET, &get(path, &[])).await;
			assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
		}
	}

	#[tokio::test]
	async fn test_methods() {
		let site = site(FakeContent::default());
		let response = respond(&site, Environment::Production, &Method::OPTIONS, &get("/", &[])).await;
		assert_eq!(response.status(), StatusCode::NO_CONTENT);
		assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, OPTIONS");

		let response = respond(&site, Environment::Production, &Method::POST, &get("/", &[])).await;
		assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	}

	#[tokio::test]
	async fn test_sitemap_owner_only() {
		let site = site(content_with(&[("post-a", "en", {
			let mut a = published("Post");
			a.slug = Some("post-a".to_string());
			a
		})]));
		let response = respond(&site, Environment::Production, &Method::GET, &get("/sitemap.xml", &[])).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml; charset=utf-8");
		let xml = body_text(response).await;
		assert!(xml.contains("<loc>https://www.websitelm.com/post-a</loc>"));

		let other = RequestParts::from_request(&Request::builder().uri("/sitemap.xml").header("host", "other.com").body(()).unwrap());
		let response = respond(&site, Environment::Production, &Method::GET, &other).await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_robots() {
		let site = site(FakeContent::default());
		let response = respond(&site, Environment::Production, &Method::GET, &get("/robots.txt", &[])).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert!(body_text(response).await.ends_with("Sitemap: https://www.websitelm.com/sitemap.xml\n"));
	}

	#[tokio::test]
	async fn test_not_modified() {
		let site = site(content_with(&[("home", "en", published("Home"))]));
		let parts = get("/", &[("if-modified-since", "Wed, 01 Jan 2025 00:00:00 GMT")]);
		let response = respond(&site, Environment::Production, &Method::GET, &parts).await;
		assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
	}

	#[tokio::test]
	async fn test_site_url_sets_canonical_origin() {
		let mut article = published("Docs");
		article.site_url = Some("https://docs.websitelm.com/".to_string());
		let site = site(content_with(&[("guide", "en", article)]));
		let response = respond(&site, Environment::Production, &Method::GET, &get("/guide", &[])).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.headers()[header::LINK], "<https://docs.websitelm.com/guide>; rel=\"canonical\"");
		let html = body_text(response).await;
		assert!(html.contains(r#""@id":"https://docs.websitelm.com/guide""#));
	}

	#[tokio::test]
	async fn test_foreign_hosts_not_echoed_into_urls() {
		let site = site(FakeContent::default());

		let unknown = RequestParts::from_request(&Request::builder().uri("/robots.txt").header("host", "www.unknown.net:8443").body(()).unwrap());
		let response = respond(&site, Environment::Production, &Method::GET, &unknown).await;
		assert!(body_text(response).await.ends_with("Sitemap: https://unknown.net/sitemap.xml\n"));

		let preview = RequestParts::from_request(&Request::builder().uri("/robots.txt").header("host", "evil.vercel.app").body(()).unwrap());
		let response = respond(&site, Environment::Production, &Method::GET, &preview).await;
		assert!(body_text(response).await.ends_with("Sitemap: https://seopage.ai/sitemap.xml\n"));
	}

	#[tokio::test]
	async fn test_snapshot_swap() {
		let context = RequestContext::new(site(FakeContent::default()), Environment::Production);
		let before = context.snapshot().await;
		*context.site.write().await = Arc::new(site(FakeContent::default()));
		let after = context.snapshot().await;
		assert!(!Arc::ptr_eq(&before, &after));
	}
}
