// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use serde::Serialize;

use crate::config::{LocaleConfig, TenantConfig};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocaleSource {
	Path,
	Cookie,
	AcceptLanguage,
	TenantDefault,
}

#[derive(Default, Clone, Copy, Debug)]
pub struct LocaleInputs<'a> {
	pub path_segment: Option<&'a str>,
	pub cookie: Option<&'a str>,
	pub accept_language: Option<&'a str>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LocaleDecision {
	pub language: String,
	pub source: LocaleSource,
	/// No locale cookie came with the request, so the chosen language should be stored.
	pub persist_cookie: bool,
}

/// Primary subtag of the first Accept-Language entry: `zh-CN,zh;q=0.9` -> `zh`.
pub fn first_accept_language(header: &str) -> Option<String> {
	let first = header.split(',').next()?;
	let tag = first.split(';').next()?.trim();
	let primary = tag.split(['-', '_']).next()?.trim().to_ascii_lowercase();
	if primary.is_empty() || primary == "*" {
		None
	} else {
		Some(primary)
	}
}

/// Value of cookie `name` in a `Cookie` header. Malformed pairs are skipped.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
	header
		.split(';')
		.filter_map(|pair| pair.split_once('='))
		.find(|(key, _)| key.trim() == name)
		.map(|(_, value)| value.trim().trim_matches('"'))
		.filter(|value| !value.is_empty())
}

/// Picks the request language by precedence: path segment, cookie, Accept-Language, tenant default.
/// With `detect` unset only the path segment and the tenant default are considered.
pub fn resolve_locale(inputs: &LocaleInputs<'_>, tenant: &TenantConfig, detect: bool) -> LocaleDecision {
	let persist_cookie = inputs.cookie.is_none();
	let decide = |language: String, source| LocaleDecision {
		language,
		source,
		persist_cookie,
	};

	if let Some(segment) = inputs.path_segment {
		let segment = segment.to_ascii_lowercase();
		if tenant.supports(&segment) {
			return decide(segment, LocaleSource::Path);
		}
	}

	if detect {
		if let Some(cookie) = inputs.cookie {
			let cookie = cookie.trim().to_ascii_lowercase();
			if tenant.supports(&cookie) {
				return decide(cookie, LocaleSource::Cookie);
			}
			tracing::debug!("Ignoring unsupported locale cookie {cookie:?}");
		}

		if let Some(lang) = inputs.accept_language.and_then(first_accept_language)
			&& tenant.supports(&lang)
		{
			return decide(lang, LocaleSource::AcceptLanguage);
		}
	}

	decide(tenant.default_language.clone(), LocaleSource::TenantDefault)
}

/// `Set-Cookie` value persisting the chosen language site-wide.
pub fn locale_cookie(config: &LocaleConfig, language: &str) -> String {
	format!(
		"{}={}; Path=/; Max-Age={}; SameSite=Lax",
		config.cookie_name, language, config.cookie_max_age_secs
	)
}
