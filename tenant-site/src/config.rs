// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use argh::FromArgs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::error::ConfigError;

static TENANT_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-_.]*\.[a-zA-Z]{2,}$").unwrap());

#[derive(FromArgs)]
/// Multi-tenant, multi-language site router and page server
pub struct Args {
	#[argh(subcommand)]
	pub command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum Command {
	Serve(ServeArgs),
	Resolve(ResolveArgs),
	Check(CheckArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// Serve all configured tenants
pub struct ServeArgs {
	#[argh(positional)]
	/// path to the site config (TOML)
	pub config: String,
	#[argh(switch)]
	/// run in development mode (fixed tenant, http origins)
	pub development: bool,
	#[argh(option)]
	/// override the listen address from the config
	pub listen: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "resolve")]
/// Print the routing decision for a synthetic request
pub struct ResolveArgs {
	#[argh(positional)]
	/// path to the site config (TOML)
	pub config: String,
	#[argh(option)]
	/// value of the Host header
	pub host: String,
	#[argh(option, default = "String::from(\"/\")")]
	/// request path, optionally with a query string
	pub path: String,
	#[argh(option)]
	/// raw Cookie header
	pub cookie: Option<String>,
	#[argh(option)]
	/// raw Accept-Language header
	pub accept_language: Option<String>,
	#[argh(option)]
	/// extra request header as NAME=VALUE, may be repeated
	pub header: Vec<String>,
	#[argh(switch)]
	/// resolve as the development environment
	pub development: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "check")]
/// Validate the site config and print the tenant table
pub struct CheckArgs {
	#[argh(positional)]
	/// path to the site config (TOML)
	pub config: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	#[default]
	Production,
	Development,
}

impl Environment {
	/// CLI switch and `SITE_ENV` win over the config file.
	pub fn effective(configured: Environment, development_switch: bool) -> Environment {
		let from_env = std::env::var("SITE_ENV").map(|v| v.eq_ignore_ascii_case("development")).unwrap_or(false);
		if development_switch || from_env {
			Environment::Development
		} else {
			configured
		}
	}

	pub fn is_development(self) -> bool {
		self == Environment::Development
	}
}

/// How the default language shows up in external URLs.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefaultLanguagePrefix {
	/// Default language is served unprefixed; `/{default}/...` still works but canonicalises to the bare path.
	#[default]
	Omit,
	/// Like `Omit`, but `/{default}/...` is redirected to the bare path.
	Redirect,
	/// Every URL carries a language; bare paths are served as the default language.
	Always,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct SiteConfig {
	pub environment: Environment,
	pub server: ServerConfig,
	pub host: HostConfig,
	pub locale: LocaleConfig,
	pub content: ContentConfig,
	pub sitemap: SitemapConfig,
	pub seo: SeoConfig,
	pub routing: RoutingConfig,
	pub fallback_tenant: TenantConfig,
	pub tenants: BTreeMap<String, TenantConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
	pub listen: String,
	pub templates_dir: Option<String>,
	pub cache_control: String,
	pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:3030".to_string(),
			templates_dir: None,
			cache_control: "public, max-age=3600, s-maxage=3600, stale-while-revalidate=86400".to_string(),
			worker_threads: None,
		}
	}
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct HostConfig {
	/// Proxy-set header that carries the original host; checked before `x-forwarded-host`.
	pub custom_header: String,
	pub default_tenant: String,
	pub development_tenant: String,
	pub platform_suffixes: Vec<String>,
	pub platform_tenant: String,
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			custom_header: "x-alterpage-host".to_string(),
			default_tenant: "websitelm.com".to_string(),
			development_tenant: "seopage.ai".to_string(),
			platform_suffixes: vec!["vercel.app".to_string()],
			platform_tenant: "seopage.ai".to_string(),
		}
	}
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct LocaleConfig {
	pub cookie_name: String,
	pub cookie_max_age_secs: u64,
}

impl Default for LocaleConfig {
	fn default() -> Self {
		Self {
			cookie_name: "NEXT_LOCALE".to_string(),
			cookie_max_age_secs: 60 * 60 * 24 * 30,
		}
	}
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ContentConfig {
	pub api_url: String,
	pub timeout_secs: u64,
	pub api_token: Option<String>,
	/// Fall back to sniffing raw markup when the API does not tag a page as blog/standard.
	pub legacy_kind_sniffing: bool,
}

impl Default for ContentConfig {
	fn default() -> Self {
		Self {
			api_url: "https://api.websitelm.com/v1".to_string(),
			timeout_secs: 10,
			api_token: None,
			legacy_kind_sniffing: true,
		}
	}
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct SitemapConfig {
	/// When set, only this tenant serves /sitemap.xml; everyone else gets a 404.
	pub owner: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SeoConfig {
	pub publisher_name: String,
	pub default_favicon: String,
	pub default_keywords: Option<String>,
	pub twitter_creator: Option<String>,
}

impl Default for SeoConfig {
	fn default() -> Self {
		Self {
			publisher_name: "WebsiteLM".to_string(),
			default_favicon: "/default-favicon.ico".to_string(),
			default_keywords: None,
			twitter_creator: None,
		}
	}
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct RoutingConfig {
	/// Internal routes are `/{tenant}/{lang}/{slug}` instead of `/{lang}/{slug}`.
	pub tenant_prefix: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct TenantConfig {
	pub default_language: String,
	pub supported_languages: Vec<String>,
	/// External path (relative to language and subfolder) -> content slug.
	pub path_mapping: BTreeMap<String, String>,
	pub home_slug: Option<String>,
	pub default_language_prefix: DefaultLanguagePrefix,
	pub locale_detection: bool,
	pub subfolder: Option<String>,
	pub base_url: Option<String>,
	pub customer_id: Option<String>,
	pub site_name: Option<String>,
}

impl Default for TenantConfig {
	fn default() -> Self {
		Self {
			default_language: "en".to_string(),
			supported_languages: vec!["en".to_string()],
			path_mapping: BTreeMap::new(),
			home_slug: None,
			default_language_prefix: DefaultLanguagePrefix::default(),
			locale_detection: true,
			subfolder: None,
			base_url: None,
			customer_id: None,
			site_name: None,
		}
	}
}

impl TenantConfig {
	pub fn supports(&self, language: &str) -> bool {
		self.supported_languages.iter().any(|l| l == language)
	}

	pub fn is_default_language(&self, language: &str) -> bool {
		self.default_language == language
	}

	pub fn home_slug(&self) -> &str {
		self.home_slug
			.as_deref()
			.or_else(|| self.path_mapping.get("/").map(|s| s.as_str()))
			.unwrap_or("home")
	}

	/// Looks up `/features` style external paths; `None` when the path is not mapped.
	pub fn slug_for_path(&self, external: &str) -> Option<&str> {
		self.path_mapping.get(external).map(|s| s.as_str())
	}

	/// Reverse of `slug_for_path`, used when building canonical URLs.
	pub fn path_for_slug(&self, slug: &str) -> Option<&str> {
		if slug == self.home_slug() {
			return Some("/");
		}
		self.path_mapping
			.iter()
			.find(|(path, mapped)| mapped.as_str() == slug && path.as_str() != "/")
			.map(|(path, _)| path.as_str())
	}

	fn normalise(&mut self) {
		self.default_language = self.default_language.trim().to_ascii_lowercase();
		let mut seen = Vec::with_capacity(self.supported_languages.len() + 1);
		for lang in self.supported_languages.drain(..) {
			let lang = lang.trim().to_ascii_lowercase();
			if !lang.is_empty() && !seen.contains(&lang) {
				seen.push(lang);
			}
		}
		if !seen.contains(&self.default_language) {
			seen.insert(0, self.default_language.clone());
		}
		self.supported_languages = seen;

		self.path_mapping = std::mem::take(&mut self.path_mapping)
			.into_iter()
			.map(|(path, slug)| {
				let path = format!("/{}", path.trim_matches('/'));
				(path, slug.trim_matches('/').to_string())
			})
			.collect();

		if let Some(subfolder) = &self.subfolder {
			let trimmed = subfolder.trim_matches('/');
			self.subfolder = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
		}
		if let Some(base_url) = &self.base_url {
			self.base_url = Some(base_url.trim_end_matches('/').to_string());
		}
	}

	fn validate(&self, scope: &str) -> Result<(), ConfigError> {
		let invalid = |reason: String| ConfigError::Invalid {
			scope: scope.to_string(),
			reason,
		};

		for lang in &self.supported_languages {
			if lang.len() != 2 || !lang.chars().all(|c| c.is_ascii_lowercase()) {
				return Err(invalid(format!("language code {lang:?} is not a two-letter code")));
			}
		}
		if let Some(subfolder) = &self.subfolder
			&& subfolder.contains('/')
		{
			return Err(invalid(format!("subfolder {subfolder:?} must be a single path segment")));
		}
		if let Some(subfolder) = &self.subfolder
			&& self.supports(subfolder)
		{
			return Err(invalid(format!("subfolder {subfolder:?} collides with a language code")));
		}
		if let Some(base_url) = &self.base_url {
			url::Url::parse(base_url).map_err(|e| invalid(format!("base_url {base_url:?}: {e}")))?;
		}
		Ok(())
	}
}

impl SiteConfig {
	pub fn load(path: &Path) -> Result<SiteConfig, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config = SiteConfig::from_toml_str(&content)?;
		info!("Loaded {} tenants from {}", config.tenants.len(), path.display());
		Ok(config)
	}

	pub fn from_toml_str(content: &str) -> Result<SiteConfig, ConfigError> {
		let mut config: SiteConfig = toml::from_str(content)?;
		config.normalise();
		config.validate()?;
		Ok(config)
	}

	fn normalise(&mut self) {
		self.fallback_tenant.normalise();
		self.tenants = std::mem::take(&mut self.tenants)
			.into_iter()
			.map(|(id, mut tenant)| {
				tenant.normalise();
				(id.trim().to_ascii_lowercase(), tenant)
			})
			.collect();
		self.host.custom_header = self.host.custom_header.trim().to_ascii_lowercase();
		self.host.default_tenant = self.host.default_tenant.trim().to_ascii_lowercase();
		self.host.development_tenant = self.host.development_tenant.trim().to_ascii_lowercase();
		self.host.platform_tenant = self.host.platform_tenant.trim().to_ascii_lowercase();
		for suffix in &mut self.host.platform_suffixes {
			*suffix = suffix.trim().trim_start_matches('.').to_ascii_lowercase();
		}
		if let Some(owner) = &self.sitemap.owner {
			self.sitemap.owner = Some(owner.trim().to_ascii_lowercase());
		}
		self.content.api_url = self.content.api_url.trim_end_matches('/').to_string();
	}

	fn validate(&self) -> Result<(), ConfigError> {
		self.fallback_tenant.validate("fallback_tenant")?;
		for (id, tenant) in &self.tenants {
			tenant.validate(id)?;
			if !is_plausible_tenant_id(id) {
				warn!("Tenant identifier {id:?} does not look like a registrable domain");
			}
		}
		if self.host.custom_header.is_empty() || hyper::header::HeaderName::from_bytes(self.host.custom_header.as_bytes()).is_err() {
			return Err(ConfigError::Invalid {
				scope: "host".to_string(),
				reason: format!("custom_header {:?} is not a valid header name", self.host.custom_header),
			});
		}
		url::Url::parse(&self.content.api_url).map_err(|e| ConfigError::Invalid {
			scope: "content".to_string(),
			reason: format!("api_url {:?}: {e}", self.content.api_url),
		})?;
		Ok(())
	}

	/// Configured tenant, or the fallback tenant for unknown hosts.
	pub fn tenant(&self, id: &str) -> &TenantConfig {
		self.tenants.get(id).unwrap_or(&self.fallback_tenant)
	}

	pub fn is_known_tenant(&self, id: &str) -> bool {
		self.tenants.contains_key(id)
	}
}

fn is_plausible_tenant_id(id: &str) -> bool {
	id == "localhost" || id.parse::<std::net::IpAddr>().is_ok() || TENANT_ID_REGEX.is_match(id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_from_empty_config() {
		let config = SiteConfig::from_toml_str("").unwrap();
		assert_eq!(config.host.custom_header, "x-alterpage-host");
		assert_eq!(config.locale.cookie_name, "NEXT_LOCALE");
		assert_eq!(config.locale.cookie_max_age_secs, 2_592_000);
		assert_eq!(config.fallback_tenant.default_language, "en");
		assert_eq!(config.fallback_tenant.home_slug(), "home");
		assert_eq!(config.environment, Environment::Production);
	}

	#[test]
	fn test_default_language_is_always_supported() {
		let config = SiteConfig::from_toml_str(
			r#"
[tenants."example.com"]
default_language = "DE"
supported_languages = ["en", "zh", "en"]
"#,
		)
		.unwrap();
		let tenant = config.tenant("example.com");
		assert_eq!(tenant.default_language, "de");
		assert_eq!(tenant.supported_languages, vec!["de", "en", "zh"]);
	}

	#[test]
	fn test_tenant_keys_are_lowercased() {
		let config = SiteConfig::from_toml_str(
			r#"
[tenants."WebsiteLM.com"]
supported_languages = ["en", "zh"]
"#,
		)
		.unwrap();
		assert!(config.is_known_tenant("websitelm.com"));
		assert!(config.tenant("websitelm.com").supports("zh"));
	}

	#[test]
	fn test_unknown_tenant_uses_fallback() {
		let config = SiteConfig::from_toml_str(
			r#"
[fallback_tenant]
default_language = "fr"
"#,
		)
		.unwrap();
		assert!(!config.is_known_tenant("nope.example"));
		assert_eq!(config.tenant("nope.example").default_language, "fr");
	}

	#[test]
	fn test_path_mapping_normalised_and_reversible() {
		let config = SiteConfig::from_toml_str(
			r#"
[tenants."example.com".path_mapping]
"/" = "home"
"features/" = "/product-features"
"#,
		)
		.unwrap();
		let tenant = config.tenant("example.com");
		assert_eq!(tenant.home_slug(), "home");
		assert_eq!(tenant.slug_for_path("/features"), Some("product-features"));
		assert_eq!(tenant.path_for_slug("product-features"), Some("/features"));
		assert_eq!(tenant.path_for_slug("home"), Some("/"));
		assert_eq!(tenant.path_for_slug("unmapped"), None);
	}

	#[test]
	fn test_rejects_bad_language_codes() {
		let err = SiteConfig::from_toml_str(
			r#"
[tenants."example.com"]
supported_languages = ["en", "zh-hans"]
"#,
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { ref scope, .. } if scope == "example.com"), "{err}");
	}

	#[test]
	fn test_rejects_nested_subfolder() {
		let err = SiteConfig::from_toml_str(
			r#"
[tenants."example.com"]
subfolder = "/blog/posts/"
"#,
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { .. }));
	}

	#[test]
	fn test_subfolder_trimmed() {
		let config = SiteConfig::from_toml_str(
			r#"
[tenants."example.com"]
subfolder = "/blog/"
base_url = "https://example.com/"
"#,
		)
		.unwrap();
		let tenant = config.tenant("example.com");
		assert_eq!(tenant.subfolder.as_deref(), Some("blog"));
		assert_eq!(tenant.base_url.as_deref(), Some("https://example.com"));
	}

	#[test]
	fn test_parse_error_reported() {
		let err = SiteConfig::from_toml_str("tenants = 3").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn test_load_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = SiteConfig::load(&dir.path().join("site.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}

	#[test]
	fn test_load_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("site.toml");
		std::fs::write(
			&path,
			r#"
environment = "development"

[tenants."websitelm.com"]
supported_languages = ["en", "zh"]
default_language_prefix = "always"
"#,
		)
		.unwrap();
		let config = SiteConfig::load(&path).unwrap();
		assert_eq!(config.environment, Environment::Development);
		assert_eq!(
			config.tenant("websitelm.com").default_language_prefix,
			DefaultLanguagePrefix::Always
		);
	}

	#[test]
	fn test_plausible_tenant_ids() {
		assert!(is_plausible_tenant_id("websitelm.com"));
		assert!(is_plausible_tenant_id("localhost"));
		assert!(is_plausible_tenant_id("127.0.0.1"));
		assert!(!is_plausible_tenant_id("-bad.com"));
		assert!(!is_plausible_tenant_id("nodot"));
	}
}
