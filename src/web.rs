use crate::{
    ConfigError, DisplayModeAvailability, DisplayOption, ExtraVersions, InterlinearMode,
    InterlinearOption, MemoryPassageStore, PassageError, PassageResolver, PassageState,
    PassageStore, PassageUpdate, QueryFields, SearchUrlState, StepConfig, StepRouter,
    build_search_url, normalize_bookmark_key, parse_query_into_state,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;

type SharedState = Arc<AppState>;

pub struct AppState {
    pub router: StepRouter<MemoryPassageStore>,
    pub debug: bool,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub step: StepConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            step: StepConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Passage(#[from] PassageError),
}

/// Builds the shared state: catalog, passage store and router.
pub fn build_state(config: &StepConfig) -> Result<SharedState, WebError> {
    let catalog = Arc::new(config.load_catalog()?);
    let store = match &config.store_path {
        Some(path) => MemoryPassageStore::persistent(path, catalog.clone())?,
        None => MemoryPassageStore::ephemeral(catalog.clone()),
    };
    store.ensure_columns(config.passage_columns)?;
    Ok(Arc::new(AppState {
        router: StepRouter::new(catalog, store, config),
        debug: config.debug,
    }))
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = build_state(&config.step)?;
    let router = build_router(state);
    info!(
        addr = %config.addr,
        columns = config.step.passage_columns,
        debug = config.step.debug,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<PassageError> for ApiError {
    fn from(err: PassageError) -> Self {
        match err {
            PassageError::InvalidOption { .. } => ApiError::bad_request(err.user_message()),
            PassageError::UnknownPassage(_) => ApiError::not_found(err.to_string()),
            PassageError::Persistence(_) | PassageError::Serialization(_) => {
                ApiError::internal(err.user_message())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/passage/:id", get(api_passage).post(api_save_passage))
        .route("/api/resolve", get(api_resolve))
        .route("/api/search-url", get(api_search_url))
        .route("/api/query-fields", get(api_query_fields))
        .route("/api/bookmark-key", get(api_bookmark_key))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "step-passage" }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassagePayload {
    state: PassageState,
    interlinear_mode: InterlinearMode,
    interlinear_label: String,
    extra_versions: Vec<String>,
    interlinear_options: Vec<InterlinearOptionPayload>,
    display_modes: DisplayModesPayload,
    display_options: Vec<String>,
    navigation_path: String,
    share_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct InterlinearOptionPayload {
    mode: InterlinearMode,
    label: String,
}

impl From<&InterlinearOption> for InterlinearOptionPayload {
    fn from(option: &InterlinearOption) -> Self {
        Self {
            mode: option.mode,
            label: option.label.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DisplayModesPayload {
    visible: bool,
    interlinear: bool,
    compare: bool,
}

impl From<DisplayModeAvailability> for DisplayModesPayload {
    fn from(value: DisplayModeAvailability) -> Self {
        Self {
            visible: value.visible,
            interlinear: value.interlinear,
            compare: value.compare,
        }
    }
}

impl PassagePayload {
    fn build(state: PassageState, app: &AppState) -> Self {
        let resolver = app.router.resolver();
        Self {
            interlinear_mode: resolver.effective_interlinear_mode(&state),
            interlinear_label: resolver.localized_interlinear_mode(&state).to_string(),
            extra_versions: resolver.effective_extra_versions(&state).to_vec(),
            interlinear_options: resolver
                .available_interlinear_options(&state)
                .iter()
                .map(InterlinearOptionPayload::from)
                .collect(),
            display_modes: resolver.display_mode_availability(&state).into(),
            display_options: state
                .options
                .iter()
                .filter_map(|initial| DisplayOption::from_initial(*initial))
                .map(|option| option.label().to_string())
                .collect(),
            navigation_path: resolver.navigation_path(&state),
            share_url: app.router.shareable_url(Some(state.passage_id)),
            state,
        }
    }
}

async fn api_passage(
    State(state): State<SharedState>,
    Path(passage_id): Path<u32>,
) -> Result<Json<PassagePayload>, ApiError> {
    let passage = state
        .router
        .store()
        .fetch(passage_id)
        .ok_or(PassageError::UnknownPassage(passage_id))?;
    Ok(Json(PassagePayload::build(passage, &state)))
}

async fn api_save_passage(
    State(state): State<SharedState>,
    Path(passage_id): Path<u32>,
    Json(update): Json<PassageUpdate>,
) -> Result<Json<PassagePayload>, ApiError> {
    let passage = state.router.store().save(passage_id, update)?;
    Ok(Json(PassagePayload::build(passage, &state)))
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    version: Option<String>,
    extra: Option<String>,
    mode: Option<String>,
}

async fn api_resolve(
    State(state): State<SharedState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let primary = params
        .version
        .filter(|version| !version.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing `version` query parameter"))?;
    let extra = ExtraVersions::parse(params.extra.as_deref().unwrap_or_default());
    let resolver: PassageResolver<'_> = state.router.resolver();
    let (mode, extra) = resolver.normalize_for_save(&primary, params.mode.as_deref(), &extra);
    Ok(Json(json!({
        "version": primary,
        "interlinearMode": mode,
        "extraVersions": extra,
    })))
}

#[derive(Debug, Deserialize)]
struct SearchUrlParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    options: String,
    #[serde(default)]
    display: String,
    #[serde(default)]
    page: String,
    #[serde(default)]
    context: u32,
    #[serde(rename = "qFilter", default)]
    filter: String,
    #[serde(default)]
    sort: String,
    #[serde(default)]
    pos: u32,
}

async fn api_search_url(
    State(state): State<SharedState>,
    Query(params): Query<SearchUrlParams>,
) -> impl IntoResponse {
    let url_state = SearchUrlState {
        query: params.q,
        options: params.options,
        display: params.display,
        page: params.page,
        context: params.context,
        filter: params.filter,
        sort: params.sort,
        position: params.pos,
    };
    Json(json!({ "url": build_search_url(&url_state, state.debug) }))
}

#[derive(Debug, Deserialize)]
struct RawParams {
    raw: Option<String>,
}

async fn api_query_fields(Query(params): Query<RawParams>) -> Json<QueryFields> {
    Json(parse_query_into_state(params.raw.as_deref().unwrap_or_default()))
}

async fn api_bookmark_key(Query(params): Query<RawParams>) -> Result<impl IntoResponse, ApiError> {
    let raw = params
        .raw
        .ok_or_else(|| ApiError::bad_request("Missing `raw` query parameter"))?;
    let key = normalize_bookmark_key(&raw);
    Ok(Json(json!({ "raw": raw, "key": key })))
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(build_state(&StepConfig::default()).unwrap())
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, payload) = get_json(test_router(), "/healthz").await;
        assert!(status.is_success());
        assert_eq!(payload["status"], "ok");
    }

    #[tokio::test]
    async fn passage_payload_uses_effective_values() {
        let (status, payload) = get_json(test_router(), "/api/passage/1").await;
        assert!(status.is_success());
        let payload: PassagePayload = serde_json::from_value(payload).unwrap();
        assert_eq!(payload.state.passage_id, 1);
        assert_eq!(payload.interlinear_mode, InterlinearMode::None);
        assert!(payload.interlinear_options.is_empty());
        assert_eq!(payload.navigation_path, "passage/1/0/KJV/Mat 1");
        assert_eq!(payload.share_url, "http://www.stepbible.org/");
    }

    #[tokio::test]
    async fn unknown_passage_is_not_found() {
        let (status, payload) = get_json(test_router(), "/api/passage/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(payload["error"].as_str().unwrap().contains('9'));
    }

    #[tokio::test]
    async fn save_rejects_invalid_mode() {
        let router = test_router();
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/passage/0")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"interlinearMode": "SIDEWAYS"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(
                Request::post("/api/passage/0")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"extraVersions": "ESV,NIV", "interlinearMode": "INTERLINEAR", "detailLevel": 2}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: PassagePayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload.interlinear_mode, InterlinearMode::Interleaved);
        assert_eq!(payload.interlinear_options.len(), 4);
        assert_eq!(
            payload.navigation_path,
            "passage/0/2/KJV/Mat 1//ESV,NIV/INTERLEAVED"
        );
    }

    #[tokio::test]
    async fn resolve_downgrades_interlinear() {
        let (status, payload) =
            get_json(test_router(), "/api/resolve?version=KJV&extra=NIV&mode=INTERLINEAR").await;
        assert!(status.is_success());
        assert_eq!(payload["interlinearMode"], "INTERLEAVED");
        assert_eq!(payload["extraVersions"], json!(["NIV"]));
    }

    #[tokio::test]
    async fn search_url_and_bookmark_key() {
        let (_, payload) = get_json(
            test_router(),
            "/api/search-url?q=text%3Dlove&display=NONE&page=2&pos=1",
        )
        .await;
        assert_eq!(payload["url"], "?q=text=love&page=2&pos=1");

        let (_, payload) = get_json(
            test_router(),
            "/api/bookmark-key?raw=q%3Dhello%7Cversion%3DNIV%7Cversion%3DESV",
        )
        .await;
        assert_eq!(payload["key"], "version=ESV|version=NIV|q=hello");

        let (_, payload) = get_json(
            test_router(),
            "/api/query-fields?raw=q%3Dtext%3Dlove%26sort%3DVOCABULARY%26stray",
        )
        .await;
        assert_eq!(payload["query"], "text=love");
        assert_eq!(payload["sort"], "VOCABULARY");
    }
}
