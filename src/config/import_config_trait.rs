// ==========================================
// 订单批量导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::SlashDateConvention;
use crate::importer::error::IngestResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 单次导入生效的配置（导入开始时读取一次,整批共用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    pub error_detail_cap: usize,
    pub slash_date_convention: SlashDateConvention,
    pub date_window_min_year: i32,
    pub date_window_max_year: i32,
    pub write_concurrency: usize,
    pub default_status: String,
    pub default_payment_mode: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            error_detail_cap: 10,
            slash_date_convention: SlashDateConvention::MonthFirst,
            date_window_min_year: 2000,
            date_window_max_year: 2100,
            write_concurrency: 4,
            default_status: "DELIVERED".to_string(),
            default_payment_mode: "Online".to_string(),
        }
    }
}

// ==========================================
// IngestConfigReader Trait
// ==========================================
// 用途: 导入管道所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait IngestConfigReader: Send + Sync {
    // ===== 结果展示 =====

    /// 错误明细展示上限
    ///
    /// # 默认值
    /// - 10
    async fn get_error_detail_cap(&self) -> IngestResult<usize>;

    // ===== 日期归一化 =====

    /// 斜杠日期约定
    ///
    /// # 默认值
    /// - MONTH_FIRST
    async fn get_slash_date_convention(&self) -> IngestResult<SlashDateConvention>;

    /// 合理年份窗口（含两端）
    ///
    /// # 返回
    /// - (最小年份, 最大年份)
    ///
    /// # 默认值
    /// - (2000, 2100)
    async fn get_date_window(&self) -> IngestResult<(i32, i32)>;

    // ===== 写入 =====

    /// 更新并发度
    ///
    /// # 默认值
    /// - 4
    async fn get_write_concurrency(&self) -> IngestResult<usize>;

    // ===== 字段默认值 =====

    /// 订单状态缺省值（默认 DELIVERED）
    async fn get_default_status(&self) -> IngestResult<String>;

    /// 付款方式缺省值（默认 Online）
    async fn get_default_payment_mode(&self) -> IngestResult<String>;

    /// 生效配置快照（JSON,随批次台账保存）
    ///
    /// # 默认值
    /// - None: 实现方不提供快照
    async fn get_config_snapshot_json(&self) -> IngestResult<Option<String>> {
        Ok(None)
    }

    /// 一次性读取全部导入配置
    async fn load_settings(&self) -> IngestResult<IngestSettings> {
        let (min_year, max_year) = self.get_date_window().await?;
        Ok(IngestSettings {
            error_detail_cap: self.get_error_detail_cap().await?,
            slash_date_convention: self.get_slash_date_convention().await?,
            date_window_min_year: min_year,
            date_window_max_year: max_year,
            write_concurrency: self.get_write_concurrency().await?,
            default_status: self.get_default_status().await?,
            default_payment_mode: self.get_default_payment_mode().await?,
        })
    }
}
