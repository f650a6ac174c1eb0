//! 浏览服务模块

use std::time::Instant;

use async_trait::async_trait;

use common::errors::AppResult;
use common::models::{DroppedTable, TableContent, TableSchema};

use crate::catalog::Catalog;
use crate::export::{export_database, ExportArchive};
use crate::shape::normalize_rows;

/// 浏览服务 Trait
#[async_trait]
pub trait ExplorerServiceTrait: Send + Sync {
    /// 列出所有数据库
    async fn databases(&self) -> AppResult<Vec<String>>;

    /// 列出数据库中的基础表
    async fn tables(&self, database: &str) -> AppResult<Vec<String>>;

    /// 获取表结构
    async fn schema(&self, database: &str, table: &str) -> AppResult<TableSchema>;

    /// 获取表内容
    async fn content(&self, database: &str, table: &str) -> AppResult<TableContent>;

    /// 删除表
    async fn drop(&self, database: &str, table: &str) -> AppResult<DroppedTable>;

    /// 导出数据库为 zip
    async fn export(&self, database: &str) -> AppResult<ExportArchive>;
}

/// SQL Server 浏览服务
pub struct ExplorerService {
    catalog: Catalog,
}

impl ExplorerService {
    /// 创建新的浏览服务实例
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ExplorerServiceTrait for ExplorerService {
    async fn databases(&self) -> AppResult<Vec<String>> {
        let names = self.catalog.list_databases().await?;
        tracing::info!(databases = names.len(), "数据库列表已加载");
        Ok(names)
    }

    async fn tables(&self, database: &str) -> AppResult<Vec<String>> {
        let tables = self.catalog.list_tables(database).await?;
        tracing::info!(database, tables = tables.len(), "表列表已加载");
        Ok(tables)
    }

    async fn schema(&self, database: &str, table: &str) -> AppResult<TableSchema> {
        self.catalog.describe_table(database, table).await
    }

    async fn content(&self, database: &str, table: &str) -> AppResult<TableContent> {
        let start = Instant::now();
        let snapshot = self.catalog.fetch_rows(database, table).await?;
        let rows = normalize_rows(snapshot.rows, snapshot.columns.len());

        tracing::info!(
            database,
            table,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "表内容已加载"
        );
        Ok(TableContent {
            database: database.to_string(),
            table: table.to_string(),
            columns: snapshot.columns,
            row_count: rows.len(),
            rows,
        })
    }

    async fn drop(&self, database: &str, table: &str) -> AppResult<DroppedTable> {
        self.catalog.drop_table(database, table).await?;
        Ok(DroppedTable::new(database, table))
    }

    async fn export(&self, database: &str) -> AppResult<ExportArchive> {
        let start = Instant::now();
        let archive = export_database(&self.catalog, database).await?;
        tracing::info!(
            database,
            tables = archive.table_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "数据库已导出"
        );
        Ok(archive)
    }
}
