// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid configuration for {scope}: {reason}")]
	Invalid { scope: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
	#[error("content API request failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("content API returned {status} for {url}")]
	Status { status: u16, url: String },

	#[error("content API returned an unreadable body: {0}")]
	Decode(#[from] serde_json::Error),

	#[error("invalid content API url: {0}")]
	Url(#[from] url::ParseError),
}

pub type ContentResult<T> = std::result::Result<T, ContentError>;

/// Anything that stops a site snapshot from being built.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Content(#[from] ContentError),

	#[error("failed to load templates: {0}")]
	Templates(#[from] tera::Error),

	#[error("invalid listen address {addr:?}: {source}")]
	ListenAddr {
		addr: String,
		#[source]
		source: std::net::AddrParseError,
	},

	#[error("failed to bind {addr}: {source}")]
	Bind {
		addr: std::net::SocketAddr,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to start worker runtime: {0}")]
	Runtime(#[source] std::io::Error),
}
