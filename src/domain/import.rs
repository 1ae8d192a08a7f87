// ==========================================
// 订单批量导入 - 导入批次与结果模型
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportOptions - 调用方导入选项
// ==========================================
// 对齐: 上传接口 options 字段（camelCase JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default = "default_true")]
    pub update_existing: bool, // 已存在订单是否更新（默认 true）
    #[serde(default)]
    pub skip_duplicates: bool, // 已存在且不更新时是否跳过（默认 false）
    #[serde(default)]
    pub auto_generate_order_ids: bool, // 接受但不生效：订单号必须由调用方提供
}

fn default_true() -> bool {
    true
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            update_existing: true,
            skip_duplicates: false,
            auto_generate_order_ids: false,
        }
    }
}

// ==========================================
// ErrorDetail - 行级错误明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub row: usize,      // 表格行号（表头为第 1 行）
    pub message: String, // 错误描述
}

impl ErrorDetail {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

// ==========================================
// ImportResult - 导入汇总
// ==========================================
// 红线: 计数永远精确;只有 error_details 会被截断
// 对齐: 接口 data 字段（errors = 写入错误数）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub total: usize, // imported + updated
    #[serde(rename = "errors")]
    pub write_errors: usize,
    pub validation_errors: usize,
    pub error_details: Vec<ErrorDetail>,
}

// ==========================================
// ImportBatch - 导入批次台账
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                   // 批次 ID（UUID）
    pub file_name: Option<String>,          // 源文件名
    pub sheet_name: Option<String>,         // 实际读取的工作表
    pub total_rows: usize,                  // 数据行数（不含表头）
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub validation_errors: usize,
    pub write_errors: usize,
    pub options_json: Option<String>,       // 调用方选项快照
    pub config_snapshot_json: Option<String>, // 生效配置快照
    pub imported_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<i64>,
}

// ==========================================
// ImportReport - 导入器返回值
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch: ImportBatch,
    pub result: ImportResult,
    pub elapsed_time: std::time::Duration,
}
