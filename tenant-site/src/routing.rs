// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use hyper::header::{ACCEPT_LANGUAGE, COOKIE};
use hyper::{HeaderMap, Request};
use serde::Serialize;
use tracing::debug;

use crate::config::{Environment, SiteConfig};
use crate::host::resolve_tenant;
use crate::locale::{cookie_value, locale_cookie};
use crate::rewrite::{RewriteRequest, RouteDecision, rewrite_path};

/// Paths the router never touches. This server hosts no assets so these end up as 404s.
const EXCLUDED_PREFIXES: &[&str] = &["/api/", "/_next/static/", "/_next/image", "/static/"];
const EXCLUDED_EXACT: &[&str] = &["/api", "/favicon.ico", "/_next/static", "/static"];

pub fn is_excluded(path: &str) -> bool {
	EXCLUDED_EXACT.contains(&path) || EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// The parts of a request the router looks at.
#[derive(Clone, Debug, Default)]
pub struct RequestParts {
	pub headers: HeaderMap,
	pub path: String,
	pub query: Option<String>,
}

impl RequestParts {
	pub fn from_request<B>(req: &Request<B>) -> Self {
		Self {
			headers: req.headers().clone(),
			path: req.uri().path().to_string(),
			query: req.uri().query().map(str::to_string),
		}
	}

	fn header(&self, name: hyper::header::HeaderName) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RoutedRequest {
	pub tenant: String,
	pub known_tenant: bool,
	pub decision: RouteDecision,
	/// `Set-Cookie` value to attach to the response, if the locale should be remembered.
	pub set_cookie: Option<String>,
}

/// Host -> tenant -> locale -> rewrite for a single request against one config snapshot.
pub fn route_request(config: &SiteConfig, environment: Environment, parts: &RequestParts) -> RoutedRequest {
	let tenant_id = resolve_tenant(&parts.headers, &config.host, environment);
	let tenant = config.tenant(&tenant_id);
	let known_tenant = config.is_known_tenant(&tenant_id);
	if !known_tenant {
		debug!("Tenant {tenant_id:?} is not configured, using fallback tenant settings");
	}

	let cookie = parts
		.header(COOKIE)
		.and_then(|header| cookie_value(header, &config.locale.cookie_name));

	let request = RewriteRequest {
		tenant_id: &tenant_id,
		path: &parts.path,
		query: parts.query.as_deref(),
		cookie,
		accept_language: parts.header(ACCEPT_LANGUAGE),
	};
	let decision = rewrite_path(&request, tenant, &config.routing);

	let set_cookie = match &decision {
		RouteDecision::Rewrite {
			route,
			persist_cookie: true,
			..
		} => Some(locale_cookie(&config.locale, &route.language)),
		_ => None,
	};

	match &decision {
		RouteDecision::Rewrite { route, locale_source, .. } => debug!(
			tenant = %tenant_id,
			language = %route.language,
			locale_source = ?locale_source,
			internal = %route.internal_path,
			"Rewrote {}",
			parts.path
		),
		RouteDecision::Redirect { location } => debug!(tenant = %tenant_id, "Redirecting {} to {location}", parts.path),
		RouteDecision::NotFound => debug!(tenant = %tenant_id, "{} is outside the tenant mount", parts.path),
	}

	RoutedRequest {
		tenant: tenant_id,
		known_tenant,
		decision,
		set_cookie,
	}
}
