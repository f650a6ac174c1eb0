//! 浏览服务路由模块

use axum::{routing::get, Router};

use crate::handlers::{
    drop_table, export_database, get_credentials, get_table_content, get_table_schema,
    health_check, list_databases, list_tables, update_credentials,
};
use crate::state::AppState;

/// 创建浏览服务路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/credentials", get(get_credentials).put(update_credentials))
        .route("/api/databases", get(list_databases))
        .route("/api/databases/{database}/tables", get(list_tables))
        .route(
            "/api/databases/{database}/tables/{table}",
            get(get_table_content).delete(drop_table),
        )
        .route(
            "/api/databases/{database}/tables/{table}/schema",
            get(get_table_schema),
        )
        .route("/api/databases/{database}/export", get(export_database))
}
