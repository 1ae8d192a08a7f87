// ==========================================
// 订单批量导入 - 导入器 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// ==========================================

use crate::domain::import::{ErrorDetail, ImportOptions, ImportReport};
use crate::domain::order::{ExistingOrderRef, OrderCandidate};
use crate::importer::cell::{RawRow, SheetGrid};
use crate::importer::error::IngestResult;
use crate::importer::field_mapper::{FieldKey, RawOrderRecord};
use crate::importer::reconciler::ReconcilePlan;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// OrderImporter Trait
// ==========================================
// 用途: 订单导入主接口
// 实现者: OrderImporterImpl
#[async_trait]
pub trait OrderImporter: Send + Sync {
    /// 从文件导入订单（.xlsx/.xls/.ods/.csv）
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - options: 调用方导入选项
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入结果（含批次台账与行级错误明细）
    /// - Err: 文件不可读/工作表为空/已存在订单查询失败（整个请求中止）
    ///
    /// # 导入流程
    /// 1. 文件解析（选择 "all data" 工作表，否则第一个）
    /// 2. 字段映射 + 候选订单构建（含日期归一化）
    /// 3. 记录校验
    /// 4. 对账（按外部订单号批量查询已存在订单）
    /// 5. 批量写入（更新逐条、插入批量 + 逐条回退）
    /// 6. 结果汇总 + 批次台账
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        options: &ImportOptions,
    ) -> IngestResult<ImportReport>;

    /// 从已解码的网格导入订单
    ///
    /// # 参数
    /// - grid: 外部解码器产出的表头 + 数据行
    /// - file_name: 源文件名（仅用于台账）
    /// - options: 调用方导入选项
    async fn import_grid(
        &self,
        grid: SheetGrid,
        file_name: Option<String>,
        options: &ImportOptions,
    ) -> IngestResult<ImportReport>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为单元格网格
    ///
    /// # 返回
    /// - Ok(SheetGrid): 表头 + 数据行（行号从 2 开始）
    /// - Err: 文件读取错误、格式错误
    fn parse_to_grid(&self, file_path: &Path) -> IngestResult<SheetGrid>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1）
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 表头 → 标准字段（未识别时返回净化后的备用键）
    fn map_header(&self, label: &str) -> FieldKey;

    /// 将一行映射为 字段 → 原始值
    ///
    /// # 参数
    /// - headers: 表头
    /// - row: 原始数据行
    fn map_row(&self, headers: &[String], row: &RawRow) -> RawOrderRecord;
}

// ==========================================
// RecordValidator Trait
// ==========================================
// 用途: 记录校验接口（阶段 3）
// 实现者: RecordValidatorImpl
pub trait RecordValidator: Send + Sync {
    /// 校验候选订单
    ///
    /// # 返回
    /// - Ok(()): 通过
    /// - Err(ErrorDetail): 不通过（按原始行号记录，不中止批次）
    fn validate(&self, candidate: &OrderCandidate) -> Result<(), ErrorDetail>;
}

// ==========================================
// OrderReconciler Trait
// ==========================================
// 用途: 对账分类接口（阶段 4）
// 实现者: ReconcilerImpl
pub trait OrderReconciler: Send + Sync {
    /// 按已存在订单与选项对候选订单分类
    ///
    /// # 参数
    /// - candidates: 通过校验的候选订单
    /// - existing: 按外部订单号查询到的已存在订单
    /// - options: 调用方导入选项
    ///
    /// # 返回
    /// - ReconcilePlan: 每条候选订单的处置（Update / Insert / Skip{reason}）
    fn reconcile(
        &self,
        candidates: Vec<OrderCandidate>,
        existing: &[ExistingOrderRef],
        options: &ImportOptions,
    ) -> ReconcilePlan;
}
