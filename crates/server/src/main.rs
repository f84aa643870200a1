use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use shared::{
    domain::{NewUser, UserId, UserPatch, UserRecord},
    error::{ApiError, ErrorCode},
    protocol::{ListQuery, TOTAL_COUNT_HEADER},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;

use api::{user_route, users_route, ApiContext};
use config::{load_settings, normalize_database_url, static_dir_exists};

const MAX_BODY_BYTES: usize = 64 * 1024;

type HttpResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let static_dir = if static_dir_exists(&settings) {
        Some(settings.static_dir.clone())
    } else {
        warn!(static_dir = %settings.static_dir, "static directory missing; serving API only");
        None
    };

    let api = ApiContext {
        storage,
        collection_key: settings.collection_key.clone(),
    };
    let app = build_router(Arc::new(AppState { api }), static_dir.as_deref());

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// `RUST_LOG` directives when they parse, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn build_router(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route(users_route(), get(http_list_users).post(http_create_user))
        .route(
            user_route(),
            get(http_get_user)
                .put(http_update_user)
                .delete(http_delete_user),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

fn status_for(err: &ApiError) -> StatusCode {
    match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    }
    (status, Json(err))
}

async fn http_list_users(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> HttpResult<(HeaderMap, Json<Vec<UserRecord>>)> {
    let page = api::list_users(&state.api, &q).await.map_err(http_error)?;
    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(page.total_count));
    Ok((headers, Json(page.records)))
}

async fn http_get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult<Json<UserRecord>> {
    let user = api::get_user(&state.api, &UserId::new(id))
        .await
        .map_err(http_error)?;
    Ok(Json(user))
}

async fn http_create_user(
    State(state): State<Arc<AppState>>,
    Json(new_user): Json<NewUser>,
) -> HttpResult<(StatusCode, Json<UserRecord>)> {
    let user = api::create_user(&state.api, new_user)
        .await
        .map_err(http_error)?;
    info!(id = %user.id, "created user");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn http_update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> HttpResult<Json<UserRecord>> {
    let user = api::update_user(&state.api, &UserId::new(id), &patch)
        .await
        .map_err(http_error)?;
    Ok(Json(user))
}

async fn http_delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult<StatusCode> {
    let id = UserId::new(id);
    api::delete_user(&state.api, &id)
        .await
        .map_err(http_error)?;
    info!(%id, "deleted user");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
