//! qrmint-web library - QR code generation service
//!
//! Turns submitted email addresses into styled QR code PNGs, serves them
//! individually, and bundles them into a zip download.

use std::sync::Arc;

use axum::Router;
use qrmint_common::config::{ServiceConfig, DEFAULT_MAX_UPLOAD_BYTES};
use qrmint_common::{ArtifactStore, DirectoryStore};
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod archive;
pub mod batch;
pub mod error;
pub mod qr;

use qr::{QrGenerator, QrStyle};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Where generated PNGs are kept
    pub store: Arc<dyn ArtifactStore>,
    pub generator: Arc<QrGenerator>,
    /// Delete all artifacts once the archive has been built
    pub clear_on_download: bool,
    /// Body limit for `POST /generate`
    pub max_upload_bytes: usize,
    /// Held by generate, download and clear so they never interleave
    pub store_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create new application state with default policies
    pub fn new(store: Arc<dyn ArtifactStore>, generator: QrGenerator) -> Self {
        Self {
            store,
            generator: Arc::new(generator),
            clear_on_download: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            store_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Directory-backed state as configured for the running service
    pub fn from_config(config: &ServiceConfig) -> qrmint_common::Result<Self> {
        let store = DirectoryStore::open(&config.output_dir)?;
        let generator = QrGenerator::with_optional_logo(QrStyle::default(), &config.logo_path);

        Ok(Self::new(Arc::new(store), generator)
            .with_clear_on_download(config.clear_on_download)
            .with_max_upload_bytes(config.max_upload_bytes))
    }

    pub fn with_clear_on_download(mut self, enabled: bool) -> Self {
        self.clear_on_download = enabled;
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Run `job` against the store on the blocking pool, holding the store lock
    ///
    /// The guard moves into the job, so the lock is held until the job
    /// finishes even if the waiting request is dropped.
    pub async fn with_store_locked<F, T>(&self, job: F) -> Result<T, JoinError>
    where
        F: FnOnce(&dyn ArtifactStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.store_lock.clone().lock_owned().await;
        let store = self.store.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            job(store.as_ref())
        })
        .await
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::routing::{get, post};

    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    // HTML form workflow
    let pages = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/style.css", get(api::serve_style_css))
        .route("/generate", post(api::generate_qr_codes).layer(upload_limit))
        .route("/download_all", get(api::download_all))
        .route("/clear", get(api::clear_artifacts))
        .route("/volunteers/:filename", get(api::serve_artifact));

    // JSON endpoints
    let api_routes = Router::new()
        .route("/api/artifacts", get(api::list_artifacts))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(pages)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
