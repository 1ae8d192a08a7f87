// ==========================================
// 订单批量导入 - 领域模型层
// ==========================================
// 职责: 定义订单候选记录、对账引用、导入结果等领域类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import;
pub mod order;
pub mod types;

// 重导出核心类型
pub use import::{ErrorDetail, ImportBatch, ImportOptions, ImportReport, ImportResult};
pub use order::{ExistingOrderRef, OrderCandidate, StoredOrder, ORDER_SOURCE_EXCEL};
pub use types::{PaymentStatus, SkipReason, SlashDateConvention};
