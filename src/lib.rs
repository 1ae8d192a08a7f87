// ==========================================
// 订单批量导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + calamine/csv
// 系统定位: 表格订单批量导入管道
//   解析 → 映射 → 日期归一化 → 构建 → 校验 → 对账 → 写入 → 汇总
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 表格订单导入管道
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 导入接口与响应信封
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{PaymentStatus, SkipReason, SlashDateConvention};

// 领域实体
pub use domain::{
    ErrorDetail, ExistingOrderRef, ImportBatch, ImportOptions, ImportReport, ImportResult,
    OrderCandidate, StoredOrder,
};

// 导入器
pub use importer::{DateNormalizer, ImportError, OrderImporter, OrderImporterImpl, SheetGrid};

// API
pub use api::{ImportApi, ImportApiResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "订单批量导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
