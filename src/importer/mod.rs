// ==========================================
// 订单批量导入 - 导入层
// ==========================================
// 职责: 表格订单导入（解析 → 映射 → 日期归一化 → 构建 → 校验 → 对账 → 写入 → 汇总）
// 支持: Excel (.xlsx/.xls/.ods), CSV, 外部解码器产出的网格
// ==========================================

// 模块声明
pub mod batch_writer;
pub mod cell;
pub mod date_normalizer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod order_importer_impl;
pub mod order_importer_trait;
pub mod reconciler;
pub mod record_builder;
pub mod record_validator;
pub mod result_aggregator;

// 重导出核心类型
pub use batch_writer::{BatchWriter, WriteReport};
pub use cell::{CellValue, RawRow, SheetGrid};
pub use date_normalizer::{from_serial, DateNormalizer, DateRejection};
pub use error::{ImportError, IngestResult};
pub use field_mapper::{CanonicalField, FieldKey, FieldMapper as FieldMapperImpl, RawOrderRecord};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use order_importer_impl::OrderImporterImpl;
pub use reconciler::{Disposition, ReconcilePlan, Reconciler as ReconcilerImpl};
pub use record_builder::{RecordBuilder, RowOutcome};
pub use record_validator::RecordValidator as RecordValidatorImpl;
pub use result_aggregator::ResultAggregator;

// 重导出 Trait 接口
pub use order_importer_trait::{
    FieldMapper, FileParser, OrderImporter, OrderReconciler, RecordValidator,
};
