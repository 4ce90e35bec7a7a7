//! Web server for picking harvested records and merging them.
//!
//! - `GET /` picker page
//! - `GET /api/records` stored records as JSON
//! - `POST /merge` fetch-and-merge of the selected files
//! - `GET /download/*name` merged artifacts

mod assets;
mod handlers;
mod routes;
mod templates;

pub use handlers::MergeRequest;
pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::repository::RecordStore;
use crate::scrapers::FileLinkRule;
use crate::services::MergePipeline;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub pipeline: Arc<MergePipeline>,
    pub output_dir: PathBuf,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&settings.output_dir).await?;
        let profile = settings.site_profile(None)?;
        let client = settings.http_client(Some(&profile))?;
        let pipeline =
            MergePipeline::new(client, &settings.output_dir).with_rule(FileLinkRule::from(&profile));

        Ok(Self {
            store: Arc::new(RecordStore::new(&settings.data_path)),
            pipeline: Arc::new(pipeline),
            output_dir: settings.output_dir.clone(),
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings).await?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
