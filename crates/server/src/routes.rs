//! Route definitions

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use initiative::cache::{AnalysisMode, CacheStore};
use initiative::report::{render_export, ExportFormat};
use initiative::{
    AnalysisResult, BackwardCheckAnalyzer, HierarchyBuilder, ResultCache, SourceConnector,
    StatisticsSnapshot, ViewerConfig, ViewerError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::form::{AnalysisRequest, AnalyzeForm};
use crate::views::{ResultPage, Views};

/// Everything the handlers share
pub struct AppContext<C: CacheStore> {
    pub config: ViewerConfig,
    pub connector: Arc<dyn SourceConnector>,
    pub cache: ResultCache<C>,
    pub views: Views,
    /// Try the cache first even when the form checkbox is off
    pub always_cached: bool,
}

impl<C: CacheStore> AppContext<C> {
    pub fn new(
        config: ViewerConfig,
        connector: Arc<dyn SourceConnector>,
        cache: ResultCache<C>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            connector,
            cache,
            views: Views::new()?,
            always_cached: false,
        })
    }

    pub fn with_always_cached(mut self, always_cached: bool) -> Self {
        self.always_cached = always_cached;
        self
    }
}

/// Shared application state
pub type AppState<C> = Arc<AppContext<C>>;

/// Create the application routes
pub fn create_routes<C: CacheStore + 'static>(context: Arc<AppContext<C>>) -> Router {
    Router::new()
        .route("/", get(index::<C>))
        .route("/analyze", post(analyze::<C>))
        .route("/export/:format", get(export::<C>))
        .route("/api/analysis", get(analysis_json::<C>))
        .route("/health", get(health_check))
        .with_state(context)
}

/// HTTP status for a failed analysis or export
pub fn status_for(error: &ViewerError) -> StatusCode {
    match error {
        ViewerError::Input { .. } | ViewerError::RemoteQuery { .. } => StatusCode::BAD_REQUEST,
        ViewerError::RemoteAuth { .. } => StatusCode::UNAUTHORIZED,
        ViewerError::RemotePermission { .. } => StatusCode::FORBIDDEN,
        ViewerError::RemoteTransport { .. } => StatusCode::BAD_GATEWAY,
        ViewerError::Render { .. } | ViewerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn page_failure(e: anyhow::Error) -> Response {
    error!("Failed to render page: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
}

fn form_response<C: CacheStore>(
    context: &AppContext<C>,
    form: &AnalyzeForm,
    failure: Option<&ViewerError>,
) -> Response {
    let status = failure.map(status_for).unwrap_or(StatusCode::OK);
    match context
        .views
        .form_page(form, failure, context.always_cached)
    {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => page_failure(e),
    }
}

fn result_response<C: CacheStore>(
    context: &AppContext<C>,
    id: Option<&str>,
    result: &AnalysisResult,
    cached_age: Option<i64>,
) -> Response {
    let completed = context.config.workflow.completed_statuses();
    let page = ResultPage {
        id,
        result,
        cached_age,
        completed_statuses: &completed,
    };
    match context.views.result_page(&page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => page_failure(e),
    }
}

/// Analysis form
async fn index<C: CacheStore>(State(context): State<AppState<C>>) -> Response {
    form_response(&context, &AnalyzeForm::default(), None)
}

/// Fetch and build a hierarchy or backward check for a validated request
fn run_analysis<C: CacheStore>(
    context: &AppContext<C>,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, ViewerError> {
    let source = context.connector.connect(&request.url, &request.token)?;
    match request.mode {
        AnalysisMode::Normal => {
            let mut builder = HierarchyBuilder::new(source.as_ref());
            if let Some(limit) = request.limit {
                builder = builder.with_limit(limit);
            }
            builder
                .fetch(&request.jql, &request.release)
                .map(AnalysisResult::Hierarchy)
        }
        AnalysisMode::BackwardCheck => {
            let mut analyzer = BackwardCheckAnalyzer::new(source.as_ref(), &context.config.workflow);
            if let Some(limit) = request.limit {
                analyzer = analyzer.with_limit(limit);
            }
            analyzer
                .fetch(&request.jql, &request.release)
                .map(AnalysisResult::BackwardCheck)
        }
    }
}

/// Validate the form, serve from cache when allowed, otherwise analyse
async fn analyze<C: CacheStore + 'static>(
    State(context): State<AppState<C>>,
    Form(form): Form<AnalyzeForm>,
) -> Response {
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected analysis request: {}", e);
            return form_response(&context, &form, Some(&e));
        }
    };

    if request.use_cache || context.always_cached {
        match context.cache.lookup(&request.jql) {
            Ok(Some(hit)) if hit.result.mode() == request.mode => {
                info!("Cache hit {} (age {}s)", hit.id, hit.age_seconds);
                return result_response(&context, Some(&hit.id), &hit.result, Some(hit.age_seconds));
            }
            Ok(Some(_)) => info!("Cached result was produced in another mode, fetching"),
            Ok(None) => info!("No matching cached result, fetching"),
            Err(e) => warn!("Cache lookup failed: {}", e),
        }
    }

    let worker = Arc::clone(&context);
    let job = request.clone();
    let outcome = tokio::task::spawn_blocking(move || run_analysis(&worker, &job)).await;
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!("Analysis failed: {}", e);
            return form_response(&context, &form, Some(&e));
        }
        Err(e) => {
            error!("Analysis task failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Analysis task failed").into_response();
        }
    };

    let id = match context.cache.put(&request.jql, result.clone()) {
        Ok(id) => Some(id),
        Err(e) => {
            error!("Failed to cache analysis: {}", e);
            None
        }
    };
    result_response(&context, id.as_deref(), &result, None)
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub id: Option<String>,
}

/// Download an export of a cached analysis (latest when no id)
async fn export<C: CacheStore + 'static>(
    State(context): State<AppState<C>>,
    Path(format): Path<String>,
    Query(query): Query<EntryQuery>,
) -> Response {
    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("{}", e)).into_response(),
    };

    let hit = match context.cache.get(query.id.as_deref()) {
        Ok(Some(hit)) => hit,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                "No analysis data found. Run an analysis first.",
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to load cached analysis: {}", e);
            return (status_for(&e), format!("{}", e)).into_response();
        }
    };

    let worker = Arc::clone(&context);
    let rendered = tokio::task::spawn_blocking(move || {
        render_export(&hit.result, format, &worker.config, Utc::now())
    })
    .await;

    match rendered {
        Ok(Ok(export)) => {
            let disposition = format!("attachment; filename=\"{}\"", export.filename);
            (
                [
                    (header::CONTENT_TYPE, export.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.bytes,
            )
                .into_response()
        }
        Ok(Err(e)) => {
            error!("Export {} failed: {}", format.as_str(), e);
            (status_for(&e), format!("{}", e)).into_response()
        }
        Err(e) => {
            error!("Export task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Export task failed").into_response()
        }
    }
}

/// Cached analysis as JSON
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub id: String,
    pub query: String,
    pub mode: AnalysisMode,
    pub age_seconds: i64,
    pub statistics: StatisticsSnapshot,
    pub result: AnalysisResult,
}

async fn analysis_json<C: CacheStore>(
    State(context): State<AppState<C>>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<AnalysisResponse>, StatusCode> {
    let hit = context
        .cache
        .get(query.id.as_deref())
        .map_err(|e| {
            error!("Failed to load cached analysis: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let statistics = StatisticsSnapshot::compute(
        hit.result.hierarchy(),
        &context.config.workflow.completed_statuses(),
    );
    Ok(Json(AnalysisResponse {
        id: hit.id,
        query: hit.query,
        mode: hit.result.mode(),
        age_seconds: hit.age_seconds,
        statistics,
        result: hit.result,
    }))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "initiative-viewer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
