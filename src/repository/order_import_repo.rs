// ==========================================
// 订单批量导入 - 订单导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::import::ImportBatch;
use crate::domain::order::{ExistingOrderRef, OrderCandidate, StoredOrder};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

/// 批量插入结果（部分成功语义）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    pub inserted_rows: Vec<usize>,          // 已落库的表格行号
    pub failures: Vec<(usize, String)>,     // (表格行号, 失败原因)
}

impl BulkInsertOutcome {
    pub fn inserted(&self) -> usize {
        self.inserted_rows.len()
    }
}

// ==========================================
// OrderImportRepository Trait
// ==========================================
// 用途: 订单导入相关数据访问
// 实现者: OrderImportRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait OrderImportRepository: Send + Sync {
    // ===== 对账查询 =====

    /// 按外部订单号批量查询已存在订单（一次往返）
    ///
    /// # 参数
    /// - order_ids: 去空白、去重后的外部订单号
    ///
    /// # 返回
    /// - Ok(Vec<ExistingOrderRef>): 已存在订单（未命中的订单号不返回）
    /// - Err: 查询失败（调用方中止整个请求）
    async fn find_existing_by_order_ids(
        &self,
        order_ids: &[String],
    ) -> RepositoryResult<Vec<ExistingOrderRef>>;

    // ===== 写入 =====

    /// 按外部订单号更新订单（总额在写入时重新计算）
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数（0 表示订单已不存在）
    async fn update_order_by_order_id(
        &self,
        order: &OrderCandidate,
        batch_id: &str,
    ) -> RepositoryResult<usize>;

    /// 批量插入订单（部分成功: 单行失败不影响其他行）
    ///
    /// # 返回
    /// - Ok(BulkInsertOutcome): 逐行结果
    /// - Err: 批量调用本身失败（未写入任何行,调用方改为逐条插入）
    async fn bulk_insert_orders(
        &self,
        orders: &[OrderCandidate],
        batch_id: &str,
    ) -> RepositoryResult<BulkInsertOutcome>;

    /// 插入单条订单
    ///
    /// # 返回
    /// - Ok(i64): 新订单内部主键
    async fn insert_order(&self, order: &OrderCandidate, batch_id: &str) -> RepositoryResult<i64>;

    // ===== 批次台账 =====

    /// 写入导入批次台账
    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;

    /// 查询最近的导入批次（按导入时间倒序）
    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>>;

    // ===== 查询 =====

    /// 订单总数
    async fn count_orders(&self) -> RepositoryResult<i64>;

    /// 按外部订单号读取订单
    async fn get_order_by_order_id(&self, order_id: &str) -> RepositoryResult<Option<StoredOrder>>;
}
