//! Handler模块

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::{
    CredentialsItem, DroppedTable, TableContent, TableSchema, UpdateCredentialsRequest,
};
use common::response::ApiResponse;

use crate::export::ZIP_CONTENT_TYPE;
use crate::service::{ExplorerService, ExplorerServiceTrait};
use crate::state::AppState;

pub const SERVICE_NAME: &str = "explorer-service";

const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn respond<T: Serialize>(data: T, headers: &HeaderMap, start: Instant) -> Json<ApiResponse<T>> {
    Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME)
            .with_request_id(request_id(headers))
            .with_duration(start.elapsed().as_millis() as u64),
    )
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        server: state.credentials.read().await.server.clone(),
    })
}

/// 获取当前连接凭据（不含密码）
#[utoipa::path(
    get,
    path = "/api/credentials",
    tag = "credentials",
    responses(
        (status = 200, description = "当前凭据", body = ApiResponse<CredentialsItem>)
    )
)]
pub async fn get_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<ApiResponse<CredentialsItem>> {
    let start = Instant::now();
    let item = CredentialsItem::from(&*state.credentials.read().await);
    respond(item, &headers, start)
}

/// 更新连接凭据
#[utoipa::path(
    put,
    path = "/api/credentials",
    tag = "credentials",
    request_body = UpdateCredentialsRequest,
    responses(
        (status = 200, description = "凭据已更新", body = ApiResponse<CredentialsItem>)
    )
)]
pub async fn update_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateCredentialsRequest>,
) -> Json<ApiResponse<CredentialsItem>> {
    let start = Instant::now();
    let credentials = req.into_credentials();
    let item = CredentialsItem::from(&credentials);
    state.replace_credentials(credentials).await;
    tracing::info!(server = %item.server, username = %item.username, "凭据已更新");
    respond(item, &headers, start)
}

/// 列出服务器上的所有数据库
#[utoipa::path(
    get,
    path = "/api/databases",
    tag = "databases",
    responses(
        (status = 200, description = "数据库列表", body = ApiResponse<Vec<String>>),
        (status = 502, description = "无法连接数据库服务器")
    )
)]
pub async fn list_databases(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let start = Instant::now();
    let service = ExplorerService::new(state.catalog().await);
    let data = service.databases().await?;
    Ok(respond(data, &headers, start))
}

/// 列出数据库中的基础表
#[utoipa::path(
    get,
    path = "/api/databases/{database}/tables",
    tag = "databases",
    params(
        ("database" = String, Path, description = "数据库名称")
    ),
    responses(
        (status = 200, description = "表列表", body = ApiResponse<Vec<String>>),
        (status = 502, description = "无法连接数据库")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(database): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let start = Instant::now();
    let service = ExplorerService::new(state.catalog().await);
    let data = service.tables(&database).await?;
    Ok(respond(data, &headers, start))
}

/// 获取表结构
#[utoipa::path(
    get,
    path = "/api/databases/{database}/tables/{table}/schema",
    tag = "tables",
    params(
        ("database" = String, Path, description = "数据库名称"),
        ("table" = String, Path, description = "表名称")
    ),
    responses(
        (status = 200, description = "表结构", body = ApiResponse<TableSchema>)
    )
)]
pub async fn get_table_schema(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((database, table)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TableSchema>>, AppError> {
    let start = Instant::now();
    let service = ExplorerService::new(state.catalog().await);
    let data = service.schema(&database, &table).await?;
    Ok(respond(data, &headers, start))
}

/// 获取表内容
#[utoipa::path(
    get,
    path = "/api/databases/{database}/tables/{table}",
    tag = "tables",
    params(
        ("database" = String, Path, description = "数据库名称"),
        ("table" = String, Path, description = "表名称")
    ),
    responses(
        (status = 200, description = "表内容", body = ApiResponse<TableContent>),
        (status = 400, description = "查询失败")
    )
)]
pub async fn get_table_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((database, table)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TableContent>>, AppError> {
    let start = Instant::now();
    let service = ExplorerService::new(state.catalog().await);
    let data = service.content(&database, &table).await?;
    Ok(respond(data, &headers, start))
}

/// 删除表（不做二次确认）
#[utoipa::path(
    delete,
    path = "/api/databases/{database}/tables/{table}",
    tag = "tables",
    params(
        ("database" = String, Path, description = "数据库名称"),
        ("table" = String, Path, description = "表名称")
    ),
    responses(
        (status = 200, description = "表已删除", body = ApiResponse<DroppedTable>),
        (status = 400, description = "删除失败")
    )
)]
pub async fn drop_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((database, table)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DroppedTable>>, AppError> {
    let start = Instant::now();
    let service = ExplorerService::new(state.catalog().await);
    let data = service.drop(&database, &table).await?;
    Ok(respond(data, &headers, start))
}

/// 导出数据库为 zip（每张表一个 CSV）
#[utoipa::path(
    get,
    path = "/api/databases/{database}/export",
    tag = "databases",
    params(
        ("database" = String, Path, description = "数据库名称")
    ),
    responses(
        (status = 200, description = "zip 文件", content_type = "application/zip", body = Vec<u8>),
        (status = 400, description = "导出失败")
    )
)]
pub async fn export_database(
    State(state): State<AppState>,
    Path(database): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = ExplorerService::new(state.catalog().await);
    let archive = service.export(&database).await?;

    let disposition = HeaderValue::from_str(&archive.content_disposition())
        .map_err(|e| AppError::Internal(format!("invalid download name: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(ZIP_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.into_bytes(),
    ))
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 当前配置的数据库服务器
    pub server: String,
}
