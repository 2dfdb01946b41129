// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

mod config;
mod content;
mod error;
mod host;
mod html_meta;
mod locale;
mod render;
mod rewrite;
mod routing;
mod semantic_web;
mod seo;
mod server;
mod sitemap;
mod utils;


// hyper 1.4 imports. Don't change these, don't assume things that work in hyper 0.x
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use opentelemetry::trace::TracerProvider as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::prelude::*;

use config::*;
use error::SiteError;
use routing::{RequestParts, route_request};
use server::{RequestContext, Site, handle_request};

fn load_site(config_path: &Path) -> Result<Site, SiteError> {
	let config = SiteConfig::load(config_path)?;
	Site::new(config)
}

#[instrument(skip(request_context))]
fn setup_hot_reload(request_context: Arc<RequestContext>, config_path: PathBuf, templates_dir: Option<PathBuf>) {
	tokio::spawn(async move {
		let (tx, mut rx) = tokio::sync::mpsc::channel(1000);

		let mut watcher = match RecommendedWatcher::new(
			move |res: Result<notify::Event, notify::Error>| {
				// Filter out Access events (opens, reads) before sending
				if let Ok(ref event) = res
					&& event.kind.is_access()
				{
					return;
				}

				// Use try_send to avoid blocking notify's thread
				if let Err(e) = tx.try_send(res) {
					eprintln!("Failed to send file watch event (channel full?): {e:?}");
				}
			},
			notify::Config::default(),
		) {
			Ok(watcher) => watcher,
			Err(e) => {
				error!("Failed to create config watcher, hot reload disabled: {e:?}");
				return;
			}
		};

		// editors replace files on save, so watch the directory rather than the file
		let config_dir = config_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
		match watcher.watch(&config_dir, RecursiveMode::NonRecursive) {
			Ok(_) => info!("Watching config: {}", config_path.display()),
			Err(e) => {
				error!("Failed to watch config directory '{}': {e:?}", config_dir.display());
				return;
			}
		}

		if let Some(templates_dir) = &templates_dir
			&& templates_dir.exists()
		{
			match watcher.watch(templates_dir, RecursiveMode::Recursive) {
				Ok(_) => info!("Watching templates directory: {}", templates_dir.display()),
				Err(e) => error!("Failed to watch templates directory: {e:?}"),
			}
		}

		let config_file_name = config_path.file_name().map(|n| n.to_os_string());
		let mut pending_events: HashSet<PathBuf> = HashSet::new();
		let mut last_event_time = std::time::Instant::now();
		let debounce_duration = Duration::from_millis(500);

		loop {
			let timeout_duration = if pending_events.is_empty() {
				Duration::from_secs(3600)
			} else {
				debounce_duration.saturating_sub(last_event_time.elapsed())
			};

			match tokio::time::timeout(timeout_duration, rx.recv()).await {
				Ok(Some(Ok(event))) => {
					debug!("Received file system event: kind={:?}, paths={:?}", event.kind, event.paths);

					if event.need_rescan() || event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
						let relevant_paths: Vec<_> = event
							.paths
							.into_iter()
							.filter(|path| {
								let is_config = path.file_name().map(|n| n.to_os_string()) == config_file_name;
								let is_template = templates_dir.as_ref().is_some_and(|dir| path.starts_with(dir));
								let path_str = path.to_string_lossy();
								(is_config || is_template) && !path_str.ends_with('~') && !path_str.contains(".tmp")
							})
							.collect();

						if !relevant_paths.is_empty() {
							debug!("Queuing file change events: {:?}", relevant_paths);
							pending_events.extend(relevant_paths);
							last_event_time = std::time::Instant::now();
						}
					}
				}
				Ok(Some(Err(e))) => error!("Watch error: {:?}", e),
				Ok(None) => {
					warn!("Watcher channel closed, retrying in 5 seconds...");
					sleep(Duration::from_secs(5)).await;
				}
				Err(_) => {
					if !pending_events.is_empty() {
						info!("Reloading site config due to changes in {} files", pending_events.len());
						match load_site(&config_path) {
							Ok(site) => {
								let tenants = site.config.tenants.len();
								*request_context.site.write().await = Arc::new(site);
								info!("Reloaded site config with {tenants} tenants");
							}
							Err(e) => error!("Keeping previous config, reload failed: {e}"),
						}
						pending_events.clear();
					}
				}
			}
		}
	});
}

fn setup_opentelemetry() {
	use opentelemetry_otlp::WithExportConfig;
	let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();

	let subscriber = tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_filter(tracing_subscriber::filter::filter_fn(
		|metadata| {
			let level = metadata.level();
			match (cfg!(debug_assertions), metadata.target().starts_with(env!("CARGO_CRATE_NAME"))) {
				(true, true) => level <= &tracing::Level::TRACE,
				_ => level <= &tracing::Level::INFO,
			}
		},
	)));

	let exporter = otlp_endpoint.map(|endpoint| opentelemetry_otlp::SpanExporter::builder().with_http().with_endpoint(endpoint).build());

	match exporter {
		Some(Ok(exporter)) => {
			let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder()
				.with_batch_exporter(exporter)
				.with_resource(
					opentelemetry_sdk::Resource::builder()
						.with_service_name(env!("CARGO_PKG_NAME"))
						.build(),
				)
				.build()
				.tracer(module_path!());

			let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
			subscriber.with(telemetry).init();
		}
		Some(Err(e)) => {
			subscriber.init();
			error!("Failed to set up OTLP exporter, continuing without it: {e}");
		}
		None => subscriber.init(),
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	setup_opentelemetry();

	let args: Args = argh::from_env();

	let result = match args.command {
		Command::Serve(serve_args) => serve(serve_args).await,
		Command::Resolve(resolve_args) => resolve(resolve_args),
		Command::Check(check_args) => check(check_args),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			ExitCode::FAILURE
		}
	}
}

async fn serve(serve_args: ServeArgs) -> Result<(), SiteError> {
	let config_path = PathBuf::from(&serve_args.config);
	let site = load_site(&config_path)?;
	let environment = Environment::effective(site.config.environment, serve_args.development);

	let listen = serve_args.listen.clone().unwrap_or_else(|| site.config.server.listen.clone());
	let addr: std::net::SocketAddr = listen.parse().map_err(|source| SiteError::ListenAddr { addr: listen.clone(), source })?;
	let worker_threads = site.config.server.worker_threads.unwrap_or((num_cpus::get() / 2).clamp(1, 8));
	let templates_dir = site.config.server.templates_dir.as_ref().map(PathBuf::from);

	info!("Serving {} tenants ({environment:?})", site.config.tenants.len());
	if environment.is_development() {
		info!("Development mode: every request resolves to {}", site.config.host.development_tenant);
	}

	let request_context = Arc::new(RequestContext::new(site, environment));
	setup_hot_reload(request_context.clone(), config_path, templates_dir);

	let listener = tokio::net::TcpListener::bind(addr).await.map_err(|source| SiteError::Bind { addr, source })?;
	info!("Starting server on http://{}", addr);

	let runtime = tokio::runtime::Builder::new_multi_thread()
		.worker_threads(worker_threads)
		.enable_all()
		.build()
		.map_err(SiteError::Runtime)?;

	loop {
		let (stream, _) = match listener.accept().await {
			Ok(conn) => conn,
			Err(e) => {
				warn!("Failed to accept connection: {e}");
				continue;
			}
		};
		let io = TokioIo::new(stream);

		let request_context = request_context.clone();

		runtime.spawn(async move {
			if let Err(err) = http1::Builder::new()
				.serve_connection(
					io,
					hyper::service::service_fn(move |req| handle_request(req, request_context.clone())),
				)
				.await
			{
				debug!("Error serving connection: {err:?}");
			}
		});
	}
}

/// Dry-runs the router for one synthetic request and prints the decision as JSON.
fn resolve(args: ResolveArgs) -> Result<(), SiteError> {
	let config = SiteConfig::load(Path::new(&args.config))?;
	let environment = Environment::effective(config.environment, args.development);

	let mut builder = hyper::Request::builder().uri(args.path.as_str()).header(hyper::header::HOST, args.host.as_str());
	if let Some(cookie) = &args.cookie {
		builder = builder.header(hyper::header::COOKIE, cookie.as_str());
	}
	if let Some(accept_language) = &args.accept_language {
		builder = builder.header(hyper::header::ACCEPT_LANGUAGE, accept_language.as_str());
	}
	for extra in &args.header {
		let Some((name, value)) = extra.split_once('=') else {
			warn!("Ignoring --header {extra:?}, expected NAME=VALUE");
			continue;
		};
		match (HeaderName::from_bytes(name.trim().as_bytes()), HeaderValue::from_str(value.trim())) {
			(Ok(name), Ok(value)) => builder = builder.header(name, value),
			_ => warn!("Ignoring invalid header {extra:?}"),
		}
	}
	let request = builder.body(()).map_err(|e| ConfigError::Invalid {
		scope: "resolve".to_string(),
		reason: e.to_string(),
	})?;

	let routed = route_request(&config, environment, &RequestParts::from_request(&request));
	let output = serde_json::json!({
		"environment": environment,
		"routed": routed,
	});
	println!("{}", serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string()));
	Ok(())
}

fn check(args: CheckArgs) -> Result<(), SiteError> {
	let config = SiteConfig::load(Path::new(&args.config))?;
	// also proves the template overrides parse
	render::Renderer::new(config.server.templates_dir.as_deref())?;

	println!("{:<32} {:<8} {:<16} {:<9} {}", "TENANT", "DEFAULT", "LANGUAGES", "PREFIX", "SUBFOLDER");
	let rows = config
		.tenants
		.iter()
		.map(|(id, tenant)| (id.as_str(), tenant))
		.chain(std::iter::once(("(fallback)", &config.fallback_tenant)));
	for (id, tenant) in rows {
		println!(
			"{:<32} {:<8} {:<16} {:<9} {}",
			id,
			tenant.default_language,
			tenant.supported_languages.join(","),
			format!("{:?}", tenant.default_language_prefix).to_lowercase(),
			tenant.subfolder.as_deref().unwrap_or("-")
		);
	}
	if let Some(owner) = &config.sitemap.owner {
		println!("sitemap owner: {owner}");
	}
	Ok(())
}
