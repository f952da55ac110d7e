use crate::config::Config;
use crate::db::HomeStorage;
use crate::error::HubError;
use crate::handlers::{
    devices, functions, integrations, members, notifications, recognition, rooms,
};
use crate::llm::{ChatCompletionsModel, NotificationModel};
use crate::news::FeedCatalog;
use crate::service::recognition_actor::{self, RecognitionHandle};
use crate::smartthings::SmartThingsService;
use crate::tapo::TapoCloud;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, Method, header},
    routing::{get, patch, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct HubState {
    pub config: Arc<Config>,
    pub storage: HomeStorage,
    pub client: reqwest::Client,
    pub llm: Arc<dyn NotificationModel>,
    pub feeds: Arc<FeedCatalog>,
    pub recognition: RecognitionHandle,
    pub smartthings: SmartThingsService,
    pub tapo: TapoCloud,
}

impl HubState {
    /// Build the state with the configured upstreams and spawn the recognition actor.
    pub async fn new(config: Arc<Config>, storage: HomeStorage) -> Result<Self, HubError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("casa-hub/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;
        let llm: Arc<dyn NotificationModel> =
            Arc::new(ChatCompletionsModel::new(client.clone(), &config.llm));
        let recognition = recognition_actor::spawn(config.recognition.clone()).await?;
        let smartthings = SmartThingsService::new(config.clone(), storage.clone(), client.clone());
        let tapo = TapoCloud::new(client.clone(), config.tapo.cloud_url.clone());
        Ok(Self {
            config,
            storage,
            client,
            llm,
            feeds: Arc::new(FeedCatalog::default()),
            recognition,
            smartthings,
            tapo,
        })
    }

    /// Swap the notification model.
    pub fn with_model(mut self, model: Arc<dyn NotificationModel>) -> Self {
        self.llm = model;
        self
    }

    /// Swap the RSS feed catalog.
    pub fn with_feeds(mut self, feeds: FeedCatalog) -> Self {
        self.feeds = Arc::new(feeds);
        self
    }
}

impl FromRef<HubState> for Arc<Config> {
    fn from_ref(state: &HubState) -> Self {
        state.config.clone()
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-hub-key"),
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub fn hub_router(state: HubState) -> Router {
    let api = Router::new()
        .route("/rooms", get(rooms::list).post(rooms::create))
        .route("/rooms/{id}", patch(rooms::update).delete(rooms::delete))
        .route("/devices", get(devices::list).post(devices::create))
        .route(
            "/devices/{id}",
            get(devices::get_one)
                .patch(devices::update)
                .delete(devices::delete),
        )
        .route("/devices/{id}/toggle", post(devices::toggle))
        .route("/cameras", get(devices::list_cameras))
        .route("/cameras/{id}", patch(devices::update_camera))
        .route("/stats", get(devices::stats))
        .route("/members", get(members::list).post(members::create))
        .route(
            "/members/{id}",
            get(members::get_one)
                .patch(members::update)
                .delete(members::delete),
        )
        .route("/members/{id}/face", put(members::enroll_face))
        .route(
            "/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route(
            "/notifications/{id}",
            patch(notifications::mark_read).delete(notifications::delete),
        )
        .route(
            "/integrations",
            get(integrations::list).post(integrations::activate),
        )
        .route(
            "/integrations/{integration_type}",
            axum::routing::delete(integrations::disconnect),
        )
        .route("/recognition/frames", post(recognition::observe_frame))
        .route(
            "/recognition",
            get(recognition::current).delete(recognition::reset),
        );

    let function_routes = Router::new()
        .route(
            "/generate-notifications",
            post(functions::generate_notifications),
        )
        .route(
            "/smartthings-auth-start",
            post(functions::smartthings_auth_start),
        )
        .route(
            "/smartthings-auth-callback",
            get(functions::smartthings_auth_callback),
        )
        .route("/smartthings-control", post(functions::smartthings_control))
        .route("/smartthings-sync", post(functions::smartthings_sync))
        .route("/smartthings-webhook", post(functions::smartthings_webhook))
        .route("/tapo-login", post(functions::tapo_login));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api", api)
        .nest("/functions", function_routes)
        .layer(cors())
        .with_state(state)
}
