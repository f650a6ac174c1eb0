//! SQL Server 浏览服务
//!
//! 提供 SQL Server 数据库浏览功能，包括：
//! - 数据库与表列表
//! - 表结构与表内容
//! - 删除表
//! - 整库导出为 zip（每张表一个 CSV）

mod catalog;
mod export;
mod handlers;
mod mssql;
mod projection;
mod routes;
mod service;
mod session;
mod shape;
mod state;
#[cfg(test)]
mod testing;

use std::path::Path;

use anyhow::Context;
use axum::{http::HeaderName, routing::get, Json, Router};
use common::config::{AppConfig, LogFormat};
use common::models::ServerCredentials;
use handlers::SERVICE_NAME;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL Server 浏览服务 API",
        version = "0.1.0",
        description = "SQL Server 数据库浏览、删除与导出"
    ),
    paths(
        handlers::health_check,
        handlers::get_credentials,
        handlers::update_credentials,
        handlers::list_databases,
        handlers::list_tables,
        handlers::get_table_schema,
        handlers::get_table_content,
        handlers::drop_table,
        handlers::export_database,
    ),
    components(schemas(
        common::models::CredentialsItem,
        common::models::UpdateCredentialsRequest,
        common::models::ColumnDescriptor,
        common::models::TableSchema,
        common::models::TableContent,
        common::models::DroppedTable,
        handlers::HealthResponse,
    )),
    tags(
        (name = "databases", description = "数据库端点"),
        (name = "tables", description = "表端点"),
        (name = "credentials", description = "连接凭据端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

fn main() -> anyhow::Result<()> {
    // .env is applied before the runtime spawns any worker thread
    load_env_file(Path::new(".env"))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("创建运行时失败")?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);
    let credentials = ServerCredentials::load();

    // 初始化日志追踪
    init_tracing(config.log_format);

    info!(
        server = %credentials.server,
        username = %credentials.username,
        timeout_secs = config.connect_timeout_secs,
        "凭据已加载"
    );

    // 创建应用状态与路由
    let state = AppState::new(config.clone(), credentials);
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_addr();
    info!(service = %config.service_name, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Loads `path` into the process environment if it exists. Variables that
/// are already set keep their value.
fn load_env_file(path: &Path) -> anyhow::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path(path).with_context(|| format!("读取 {} 失败", path.display()))?;
    Ok(true)
}
