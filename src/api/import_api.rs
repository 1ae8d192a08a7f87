// ==========================================
// 订单批量导入 - 导入API
// ==========================================
// 职责: 封装订单导入,产出统一响应信封 { success, data | error }
// 说明: HTTP 传输/鉴权由调用方负责
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::import::{ImportBatch, ImportOptions, ImportResult};
use crate::importer::{ImportError, OrderImporter, OrderImporterImpl, SheetGrid};
use crate::repository::{OrderImportRepository, OrderImportRepositoryImpl};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

type DefaultImporter = OrderImporterImpl<OrderImportRepositoryImpl, ConfigManager>;

/// 导入API响应信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 类 HTTP 状态码（不序列化）
    #[serde(skip)]
    pub status_code: u16,
}

impl ImportApiResponse {
    pub fn ok(data: ImportResult) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code: 200,
        }
    }

    pub fn failed(err: &ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            status_code: err.status_code(),
        }
    }
}

impl From<ApiResult<ImportResult>> for ImportApiResponse {
    fn from(result: ApiResult<ImportResult>) -> Self {
        match result {
            Ok(data) => ImportApiResponse::ok(data),
            Err(err) => ImportApiResponse::failed(&err),
        }
    }
}

/// 解析调用方选项（缺省/空白 → 默认值）
pub fn parse_options(options_json: Option<&str>) -> ApiResult<ImportOptions> {
    match options_json.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(ImportOptions::default()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ApiError::from(ImportError::InvalidOptions(e.to_string()))),
    }
}

/// 导入API
pub struct ImportApi {
    db_path: String,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// 上传入口: 文件 + 可选 JSON 选项 → 响应信封
    pub async fn handle_upload(&self, file_path: &str, options_json: Option<&str>) -> ImportApiResponse {
        let response: ImportApiResponse = self.import_orders(file_path, options_json).await.into();
        if !response.success {
            warn!(
                file_path,
                status = response.status_code,
                error = response.error.as_deref().unwrap_or(""),
                "订单导入请求失败"
            );
        }
        response
    }

    /// 导入订单文件
    ///
    /// # 参数
    /// - file_path: 文件路径（.xlsx/.xls/.ods/.csv）
    /// - options_json: 调用方选项 JSON（可选）
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入汇总
    /// - Err(ApiError): 请求在处理前中止
    pub async fn import_orders(
        &self,
        file_path: &str,
        options_json: Option<&str>,
    ) -> ApiResult<ImportResult> {
        let options = parse_options(options_json)?;
        let importer = self.create_importer()?;

        let report = importer.import_file(file_path, &options).await?;
        info!(
            batch_id = %report.batch.batch_id,
            total = report.result.total,
            "订单导入请求完成"
        );
        Ok(report.result)
    }

    /// 导入外部解码器产出的网格
    pub async fn import_grid(
        &self,
        grid: SheetGrid,
        file_name: Option<String>,
        options_json: Option<&str>,
    ) -> ApiResult<ImportResult> {
        let options = parse_options(options_json)?;
        let importer = self.create_importer()?;

        let report = importer.import_grid(grid, file_name, &options).await?;
        Ok(report.result)
    }

    /// 最近的导入批次台账
    pub async fn list_recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        let repo = OrderImportRepositoryImpl::new(&self.db_path)?;
        Ok(repo.get_recent_batches(limit).await?)
    }

    /// 创建导入器（仓储与配置共享同一连接）
    fn create_importer(&self) -> ApiResult<DefaultImporter> {
        let conn = open_sqlite_connection(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let import_repo = OrderImportRepositoryImpl::from_connection(conn.clone())?;
        let config = ConfigManager::from_connection(conn)?;

        Ok(OrderImporterImpl::with_default_components(import_repo, config))
    }
}
