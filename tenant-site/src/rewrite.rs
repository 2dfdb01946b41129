// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

//! External URL <-> (tenant, language, slug).
//!
//! `rewrite_path` maps what the browser asked for onto an internal content route,
//! `external_path` is its inverse and is what canonical URLs, hreflang alternates
//! and the sitemap are built from. For any (tenant, language, slug) the external
//! path requested without cookies or Accept-Language resolves back to the same triple.

use serde::Serialize;
use std::borrow::Cow;

use crate::config::{DefaultLanguagePrefix, RoutingConfig, TenantConfig};
use crate::locale::{LocaleInputs, LocaleSource, resolve_locale};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoute {
	pub tenant: String,
	pub language: String,
	pub slug: String,
	/// `/{tenant}/{lang}/{slug}` or `/{lang}/{slug}`, depending on `routing.tenant_prefix`.
	pub internal_path: String,
	/// Preferred public path for this content.
	pub external_path: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteDecision {
	Rewrite {
		route: ResolvedRoute,
		locale_source: LocaleSource,
		persist_cookie: bool,
	},
	/// Always a 308; the browser should keep the method.
	Redirect { location: String },
	/// Outside the tenant's subfolder mount.
	NotFound,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RewriteRequest<'a> {
	pub tenant_id: &'a str,
	/// Raw request path, percent-encoded as received.
	pub path: &'a str,
	pub query: Option<&'a str>,
	pub cookie: Option<&'a str>,
	pub accept_language: Option<&'a str>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Alternate {
	pub hreflang: String,
	pub href: String,
}

fn with_query(path: String, query: Option<&str>) -> String {
	match query {
		Some(q) if !q.is_empty() => format!("{path}?{q}"),
		_ => path,
	}
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
	urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

fn encode_path(path: &str) -> String {
	path.split('/').map(|s| urlencoding::encode(s).into_owned()).collect::<Vec<_>>().join("/")
}

fn detects_locale(tenant: &TenantConfig) -> bool {
	tenant.locale_detection && tenant.default_language_prefix != DefaultLanguagePrefix::Always
}

/// `/features` -> mapped slug, or the path itself minus the leading slash.
fn slug_for(tenant: &TenantConfig, external: &str) -> String {
	if external == "/" || external.is_empty() {
		return tenant.home_slug().to_string();
	}
	tenant
		.slug_for_path(external)
		.map(str::to_string)
		.unwrap_or_else(|| external.trim_start_matches('/').to_string())
}

pub fn internal_path(routing: &RoutingConfig, tenant_id: &str, language: &str, slug: &str) -> String {
	if routing.tenant_prefix {
		format!("/{tenant_id}/{language}/{slug}")
	} else {
		format!("/{language}/{slug}")
	}
}

/// Public path for (language, slug) under `tenant`, percent-encoded.
pub fn external_path(tenant: &TenantConfig, language: &str, slug: &str) -> String {
	let slug = slug.trim_matches('/');
	let mapped = tenant
		.path_for_slug(slug)
		.map(str::to_string)
		.unwrap_or_else(|| format!("/{slug}"));

	// a bare slug that starts like a language code would be read back as that language
	let collides = mapped
		.trim_start_matches('/')
		.split('/')
		.next()
		.is_some_and(|first| tenant.supports(&first.to_ascii_lowercase()));

	let unprefixed = tenant.is_default_language(language) && tenant.default_language_prefix != DefaultLanguagePrefix::Always && !collides;

	let localized = if unprefixed {
		mapped
	} else if mapped == "/" {
		format!("/{language}")
	} else {
		format!("/{language}{mapped}")
	};

	let mounted = match &tenant.subfolder {
		Some(subfolder) if localized == "/" => format!("/{subfolder}"),
		Some(subfolder) => format!("/{subfolder}{localized}"),
		None => localized,
	};

	encode_path(&mounted)
}

pub fn canonical_url(base_url: &str, tenant: &TenantConfig, language: &str, slug: &str) -> String {
	format!("{}{}", base_url.trim_end_matches('/'), external_path(tenant, language, slug))
}

/// One entry per supported language plus `x-default` pointing at the default-language URL.
pub fn alternates(base_url: &str, tenant: &TenantConfig, slug: &str) -> Vec<Alternate> {
	let mut alternates: Vec<Alternate> = tenant
		.supported_languages
		.iter()
		.map(|lang| Alternate {
			hreflang: lang.clone(),
			href: canonical_url(base_url, tenant, lang, slug),
		})
		.collect();
	alternates.push(Alternate {
		hreflang: "x-default".to_string(),
		href: canonical_url(base_url, tenant, &tenant.default_language, slug),
	});
	alternates
}

pub fn rewrite_path(request: &RewriteRequest<'_>, tenant: &TenantConfig, routing: &RoutingConfig) -> RouteDecision {
	let path = if request.path.starts_with('/') {
		Cow::Borrowed(request.path)
	} else {
		Cow::Owned(format!("/{}", request.path))
	};

	if path.len() > 1 && path.ends_with('/') {
		// leading slashes are collapsed too: `//host` in Location is protocol-relative
		let location = format!("/{}", path.trim_matches('/'));
		return RouteDecision::Redirect {
			location: with_query(location, request.query),
		};
	}

	let (mount, rest) = match &tenant.subfolder {
		Some(subfolder) => {
			let prefix = format!("/{subfolder}");
			match path.strip_prefix(prefix.as_str()) {
				Some("") => (prefix, "/"),
				Some(rest) if rest.starts_with('/') => (prefix, rest),
				_ => return RouteDecision::NotFound,
			}
		}
		None => (String::new(), path.as_ref()),
	};

	let segments: Vec<Cow<'_, str>> = rest.split('/').filter(|s| !s.is_empty()).map(decode_segment).collect();
	let first = segments.first().map(|s| s.to_ascii_lowercase());

	let mut inputs = LocaleInputs {
		path_segment: None,
		cookie: request.cookie,
		accept_language: request.accept_language,
	};

	let (locale, slug) = match first {
		Some(first) if tenant.supports(&first) => {
			// `/{default}/{lang}/...` is how `external_path` spells slugs that start like a language
			let keeps_prefix = segments.get(1).is_some_and(|next| tenant.supports(&next.to_ascii_lowercase()));
			if tenant.is_default_language(&first) && tenant.default_language_prefix == DefaultLanguagePrefix::Redirect && !keeps_prefix {
				let remaining = segments[1..].iter().map(|s| urlencoding::encode(s).into_owned()).collect::<Vec<_>>().join("/");
				let location = match (mount.is_empty(), remaining.is_empty()) {
					(true, true) => "/".to_string(),
					(false, true) => mount,
					(_, false) => format!("{mount}/{remaining}"),
				};
				return RouteDecision::Redirect {
					location: with_query(location, request.query),
				};
			}
			inputs.path_segment = Some(&first);
			let locale = resolve_locale(&inputs, tenant, detects_locale(tenant));
			let remaining = format!("/{}", segments[1..].join("/"));
			(locale, slug_for(tenant, &remaining))
		}
		_ => {
			let locale = resolve_locale(&inputs, tenant, detects_locale(tenant));
			let external = format!("/{}", segments.join("/"));
			(locale, slug_for(tenant, &external))
		}
	};

	let route = ResolvedRoute {
		tenant: request.tenant_id.to_string(),
		internal_path: internal_path(routing, request.tenant_id, &locale.language, &slug),
		external_path: external_path(tenant, &locale.language, &slug),
		language: locale.language,
		slug,
	};

	RouteDecision::Rewrite {
		route,
		locale_source: locale.source,
		persist_cookie: locale.persist_cookie,
	}
}
