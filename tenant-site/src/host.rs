// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

//! Host header -> tenant identifier.
//!
//! Header precedence is fixed: the configured custom proxy header, then
//! `x-forwarded-host`, then `x-vercel-deployment-url`, then `host`. The first
//! non-empty value wins. Resolution is total: anything unusable ends up at
//! `host.default_tenant`.

use hyper::HeaderMap;
use hyper::header::HOST;
use tracing::debug;

use crate::config::{Environment, HostConfig};

pub const FORWARDED_HOST: &str = "x-forwarded-host";
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const VERCEL_DEPLOYMENT_URL: &str = "x-vercel-deployment-url";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		// proxies may append: "client.example, proxy.internal"
		.and_then(|v| v.split(',').next())
		.map(str::trim)
		.filter(|v| !v.is_empty())
}

/// First non-empty host candidate, untouched apart from whitespace trimming.
pub fn raw_host<'a>(headers: &'a HeaderMap, config: &HostConfig) -> Option<&'a str> {
	[config.custom_header.as_str(), FORWARDED_HOST, VERCEL_DEPLOYMENT_URL, HOST.as_str()]
		.into_iter()
		.find_map(|name| header_str(headers, name))
}

/// Strips scheme, userinfo, path, query and port from a host-ish header value.
/// Keeps the port when `keep_port` is set.
fn strip_to_authority(raw: &str, keep_port: bool) -> Option<String> {
	let s = raw.trim();
	let s = s.split_once("://").map(|(_, rest)| rest).unwrap_or(s);
	let s = s.split(['/', '?', '#']).next().unwrap_or("");
	let s = s.rsplit('@').next().unwrap_or(s);

	let host = if keep_port {
		s
	} else if let Some(bracketed) = s.strip_prefix('[') {
		bracketed.split(']').next().unwrap_or("")
	} else {
		s.split(':').next().unwrap_or("")
	};

	let host = host.trim_end_matches('.').to_ascii_lowercase();
	if host.is_empty()
		|| !host
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':' | '[' | ']'))
	{
		return None;
	}
	Some(host)
}

/// Bare, lowercase hostname without protocol, path or port.
pub fn clean_host(raw: &str) -> Option<String> {
	strip_to_authority(raw, false)
}

/// Last two dot-separated labels. Single labels and IP literals are returned unchanged.
pub fn registrable_domain(host: &str) -> &str {
	if host.parse::<std::net::IpAddr>().is_ok() {
		return host;
	}
	let mut dots = host.rmatch_indices('.');
	dots.next();
	match dots.next() {
		Some((idx, _)) => &host[idx + 1..],
		None => host,
	}
}

fn is_platform_host(host: &str, config: &HostConfig) -> bool {
	config
		.platform_suffixes
		.iter()
		.any(|suffix| host.len() > suffix.len() && host.ends_with(suffix.as_str()) && host[..host.len() - suffix.len()].ends_with('.'))
}

/// Pure core of tenant resolution, split out so it can be driven without a header map.
pub fn tenant_from_host(raw: Option<&str>, config: &HostConfig, environment: Environment) -> String {
	if environment.is_development() {
		return config.development_tenant.clone();
	}

	let Some(host) = raw.and_then(clean_host) else {
		debug!("No usable host in {raw:?}, using default tenant");
		return config.default_tenant.clone();
	};

	if is_platform_host(&host, config) {
		return config.platform_tenant.clone();
	}

	registrable_domain(&host).to_string()
}

pub fn resolve_tenant(headers: &HeaderMap, config: &HostConfig, environment: Environment) -> String {
	tenant_from_host(raw_host(headers, config), config, environment)
}

/// `scheme://host[:port]` the client used, for absolute URLs when a tenant has no configured base URL.
pub fn request_origin(headers: &HeaderMap, config: &HostConfig, environment: Environment) -> Option<String> {
	let authority = raw_host(headers, config).and_then(|raw| strip_to_authority(raw, true))?;
	let scheme = match header_str(headers, FORWARDED_PROTO) {
		Some(proto) if proto.eq_ignore_ascii_case("http") => "http",
		Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
		_ if environment.is_development() => "http",
		_ => "https",
	};
	Some(format!("{scheme}://{authority}"))
}

/// `request_origin`, but only when the client's host is `tenant_id` or one of its subdomains.
/// Development accepts any origin.
pub fn tenant_origin(headers: &HeaderMap, config: &HostConfig, environment: Environment, tenant_id: &str) -> Option<String> {
	let origin = request_origin(headers, config, environment)?;
	if environment.is_development() {
		return Some(origin);
	}
	let host = raw_host(headers, config).and_then(clean_host)?;
	let belongs = host == tenant_id || host.strip_suffix(tenant_id).is_some_and(|rest| rest.ends_with('.'));
	if !belongs {
		debug!("Not using origin {origin} for tenant {tenant_id}");
	}
	belongs.then_some(origin)
}

#[cfg(test)]
mod tests {
	use super::*;
	use hyper::header::HeaderValue;

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.append(*name, HeaderValue::from_static(value));
		}
		map
	}

	fn prod(pairs: &[(&'static str, &'static str)]) -> String {
		resolve_tenant(&headers(pairs), &HostConfig::default(), Environment::Production)
	}

	#[test]
	fn test_clean_host() {
		assert_eq!(clean_host("WebsiteLM.com:3000").as_deref(), Some("websitelm.com"));
		assert_eq!(clean_host("https://blog.example.com/path?q=1").as_deref(), Some("blog.example.com"));
		assert_eq!(clean_host("  example.com.  ").as_deref(), Some("example.com"));
		assert_eq!(clean_host("[::1]:8080").as_deref(), Some("::1"));
		assert_eq!(clean_host("user@example.com").as_deref(), Some("example.com"));
		assert_eq!(clean_host(""), None);
		assert_eq!(clean_host("https://"), None);
		assert_eq!(clean_host("bad host!"), None);
	}

	#[test]
	fn test_registrable_domain() {
		assert_eq!(registrable_domain("www.websitelm.com"), "websitelm.com");
		assert_eq!(registrable_domain("a.b.c.example.org"), "example.org");
		assert_eq!(registrable_domain("example.org"), "example.org");
		assert_eq!(registrable_domain("localhost"), "localhost");
		assert_eq!(registrable_domain("192.168.1.20"), "192.168.1.20");
	}

	#[test]
	fn test_precedence_custom_header_first() {
		let tenant = prod(&[
			("host", "internal.vercel.app"),
			("x-forwarded-host", "forwarded.com"),
			("x-alterpage-host", "www.custom.com"),
		]);
		assert_eq!(tenant, "custom.com");
	}

	#[test]
	fn test_precedence_forwarded_over_host() {
		assert_eq!(prod(&[("host", "origin.net"), ("x-forwarded-host", "blog.client.io, proxy.local")]), "client.io");
	}

	#[test]
	fn test_precedence_vercel_deployment_over_host() {
		assert_eq!(prod(&[("host", "origin.net"), ("x-vercel-deployment-url", "https://app.tenant.dev/")]), "tenant.dev");
	}

	#[test]
	fn test_empty_headers_skipped() {
		assert_eq!(prod(&[("x-alterpage-host", ""), ("host", "websitelm.com:443")]), "websitelm.com");
	}

	#[test]
	fn test_platform_subdomain_uses_override() {
		assert_eq!(prod(&[("host", "my-app-git-main.vercel.app")]), "seopage.ai");
		// the bare platform domain is not a deployment subdomain
		assert_eq!(prod(&[("host", "vercel.app")]), "vercel.app");
		assert_eq!(prod(&[("host", "notvercel.app")]), "notvercel.app");
	}

	#[test]
	fn test_missing_host_falls_back() {
		assert_eq!(prod(&[]), "websitelm.com");
		assert_eq!(prod(&[("host", "???")]), "websitelm.com");
	}

	#[test]
	fn test_development_override() {
		let tenant = resolve_tenant(
			&headers(&[("host", "localhost:3000")]),
			&HostConfig::default(),
			Environment::Development,
		);
		assert_eq!(tenant, "seopage.ai");
	}

	#[test]
	fn test_request_origin() {
		let config = HostConfig::default();
		let map = headers(&[("host", "WebsiteLM.com:8443"), ("x-forwarded-proto", "http")]);
		assert_eq!(
			request_origin(&map, &config, Environment::Production).as_deref(),
			Some("http://websitelm.com:8443")
		);

		let map = headers(&[("host", "websitelm.com")]);
		assert_eq!(request_origin(&map, &config, Environment::Production).as_deref(), Some("https://websitelm.com"));
		assert_eq!(request_origin(&map, &config, Environment::Development).as_deref(), Some("http://websitelm.com"));
		assert_eq!(request_origin(&HeaderMap::new(), &config, Environment::Production), None);
	}

	#[test]
	fn test_tenant_origin_only_for_own_hosts() {
		let config = HostConfig::default();
		let prod = |pairs: &[(&'static str, &'static str)], tenant: &str| tenant_origin(&headers(pairs), &config, Environment::Production, tenant);

		assert_eq!(prod(&[("host", "www.websitelm.com")], "websitelm.com").as_deref(), Some("https://www.websitelm.com"));
		assert_eq!(prod(&[("host", "websitelm.com")], "websitelm.com").as_deref(), Some("https://websitelm.com"));
		assert_eq!(prod(&[("host", "evil-websitelm.com")], "websitelm.com"), None);
		assert_eq!(prod(&[("host", "preview-1.vercel.app")], "seopage.ai"), None);
		assert_eq!(prod(&[("host", "websitelm.com"), ("x-forwarded-host", "attacker.example")], "websitelm.com"), None);

		let dev = tenant_origin(&headers(&[("host", "localhost:3030")]), &config, Environment::Development, "seopage.ai");
		assert_eq!(dev.as_deref(), Some("http://localhost:3030"));
	}
}
