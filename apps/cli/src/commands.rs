use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tower_http::services::ServeDir;
use weft_ssg::{BuildObserver, BuildState, Index, Site, SiteBuilder, SiteConfig};

pub(crate) fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "weft=info,weft_ssg=info",
        1 => "weft=debug,weft_ssg=debug",
        _ => "weft=trace,weft_ssg=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt().with_env_filter(env_filter).with_target(false).init();
}

fn load_site(
    root: &Path,
    theme: Option<&str>,
    base_url: Option<&str>,
) -> Result<Site, Box<dyn std::error::Error>> {
    let mut config = SiteConfig::load(root)?;
    if let Some(theme) = theme {
        config = config.with_theme(theme);
    }
    if let Some(url) = base_url {
        config = config.with_base_url(url);
    }
    Ok(Site::new(root, config))
}

pub fn build_site(
    root: &Path,
    theme: Option<&str>,
    base_url: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let site = load_site(root, theme, base_url)?;
    let output = site.paths.output_dir.clone();

    println!("Building site...");
    let mut builder = SiteBuilder::new(site).with_default_plugins();
    let report = builder.build()?;

    println!(
        "Built {} pages, {} tags to {} in {:.2?}",
        report.pages,
        report.tags,
        output.display(),
        report.duration
    );

    Ok(())
}

/// Latest build state and, once ready, the page map, shared with the server.
#[derive(Default)]
pub struct BuildStatus {
    state: RwLock<Option<BuildState>>,
    pages: RwLock<Option<Value>>,
}

impl BuildStatus {
    pub fn state(&self) -> Option<BuildState> {
        self.state.read().map(|state| *state).unwrap_or(None)
    }

    pub fn pages(&self) -> Option<Value> {
        self.pages
            .read()
            .map(|pages| pages.clone())
            .unwrap_or(None)
    }
}

impl BuildObserver for BuildStatus {
    fn state_changed(&self, state: BuildState, index: &Index) {
        if let Ok(mut current) = self.state.write() {
            *current = Some(state);
        }

        let pages = match state {
            BuildState::Ready => serde_json::to_value(&index.pages).ok(),
            BuildState::Indexing | BuildState::Building => None,
        };
        if let Ok(mut current) = self.pages.write() {
            *current = pages;
        }

        tracing::info!(%state, "build state changed");
    }
}

async fn current_state(State(status): State<Arc<BuildStatus>>) -> Json<Value> {
    Json(json!({ "state": status.state() }))
}

async fn current_index(State(status): State<Arc<BuildStatus>>) -> Response {
    match status.pages() {
        Some(pages) => Json(pages).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "index is not ready").into_response(),
    }
}

pub fn router(status: Arc<BuildStatus>, output: &Path) -> Router {
    let serve_dir = ServeDir::new(output).append_index_html_on_directories(true);

    Router::new()
        .route("/_weft/state", get(current_state))
        .route("/_weft/index", get(current_index))
        .fallback_service(serve_dir)
        .with_state(status)
}

pub async fn serve_site(
    root: &Path,
    theme: Option<&str>,
    base_url: Option<&str>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut site = load_site(root, theme, base_url)?;
    if site.base_url().is_none() {
        site.config.base_url = Some(format!("http://localhost:{port}"));
    }
    let output = site.paths.output_dir.clone();

    let status = Arc::new(BuildStatus::default());
    let mut builder = SiteBuilder::new(site).with_default_plugins();
    builder.observe(status.clone());

    tokio::task::spawn_blocking(move || match builder.build() {
        Ok(report) => println!(
            "Built {} pages, {} tags in {:.2?}",
            report.pages, report.tags, report.duration
        ),
        Err(error) => eprintln!("Build error: {error}"),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Serving at http://{addr}");
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(status, &output)).await?;

    Ok(())
}
