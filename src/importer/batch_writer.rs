// ==========================================
// 订单批量导入 - 批量写入器
// ==========================================
// 职责: 应用对账结果（更新逐条、插入批量 + 逐条回退）
// 红线: 只有真正落库的行计入 imported/updated;失败按行记录,批次继续
// ==========================================

use crate::domain::import::ErrorDetail;
use crate::domain::order::{ExistingOrderRef, OrderCandidate};
use crate::repository::OrderImportRepository;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// 默认更新并发度
pub const DEFAULT_WRITE_CONCURRENCY: usize = 4;

/// 写入结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub imported: usize,
    pub updated: usize,
    pub errors: Vec<ErrorDetail>,
}

pub struct BatchWriter<'a, R: OrderImportRepository> {
    repo: &'a R,
    batch_id: &'a str,
    concurrency: usize,
}

impl<'a, R: OrderImportRepository> BatchWriter<'a, R> {
    pub fn new(repo: &'a R, batch_id: &'a str, concurrency: usize) -> Self {
        Self {
            repo,
            batch_id,
            concurrency: concurrency.max(1),
        }
    }

    /// 依次应用更新与插入
    pub async fn write(
        &self,
        updates: Vec<(OrderCandidate, ExistingOrderRef)>,
        inserts: Vec<OrderCandidate>,
    ) -> WriteReport {
        let mut report = WriteReport::default();

        let (updated, mut update_errors) = self.apply_updates(updates).await;
        report.updated = updated;
        report.errors.append(&mut update_errors);

        let (imported, mut insert_errors) = self.apply_inserts(inserts).await;
        report.imported = imported;
        report.errors.append(&mut insert_errors);

        info!(
            batch_id = %self.batch_id,
            imported = report.imported,
            updated = report.updated,
            write_errors = report.errors.len(),
            "批量写入完成"
        );
        report
    }

    /// 逐条更新（有界并发）
    ///
    /// # 返回
    /// - (成功更新数, 行级错误)
    pub async fn apply_updates(
        &self,
        updates: Vec<(OrderCandidate, ExistingOrderRef)>,
    ) -> (usize, Vec<ErrorDetail>) {
        if updates.is_empty() {
            return (0, Vec::new());
        }
        debug!(count = updates.len(), concurrency = self.concurrency, "开始更新已存在订单");

        let results: Vec<Result<(), ErrorDetail>> = stream::iter(updates)
            .map(|(candidate, existing)| async move {
                match self
                    .repo
                    .update_order_by_order_id(&candidate, self.batch_id)
                    .await
                {
                    Ok(0) => Err(ErrorDetail::new(
                        candidate.row_number,
                        format!("更新失败: 订单 {} 已不存在", existing.order_id),
                    )),
                    Ok(_) => Ok(()),
                    Err(e) => {
                        warn!(row = candidate.row_number, error = %e, "订单更新失败");
                        Err(ErrorDetail::new(
                            candidate.row_number,
                            format!("更新失败: {}", e),
                        ))
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut updated = 0;
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(()) => updated += 1,
                Err(detail) => errors.push(detail),
            }
        }
        (updated, errors)
    }

    /// 批量插入;批量调用整体失败时改为逐条插入
    ///
    /// # 返回
    /// - (成功插入数, 行级错误)
    pub async fn apply_inserts(&self, inserts: Vec<OrderCandidate>) -> (usize, Vec<ErrorDetail>) {
        if inserts.is_empty() {
            return (0, Vec::new());
        }
        debug!(count = inserts.len(), "开始批量插入新订单");

        match self.repo.bulk_insert_orders(&inserts, self.batch_id).await {
            Ok(outcome) => {
                let errors = outcome
                    .failures
                    .into_iter()
                    .map(|(row, reason)| ErrorDetail::new(row, format!("插入失败: {}", reason)))
                    .collect();
                (outcome.inserted_rows.len(), errors)
            }
            Err(e) => {
                warn!(error = %e, "批量插入失败，改为逐条插入");
                self.insert_one_by_one(&inserts).await
            }
        }
    }

    async fn insert_one_by_one(&self, inserts: &[OrderCandidate]) -> (usize, Vec<ErrorDetail>) {
        let mut imported = 0;
        let mut errors = Vec::new();

        for candidate in inserts {
            match self.repo.insert_order(candidate, self.batch_id).await {
                Ok(_) => imported += 1,
                Err(e) => errors.push(ErrorDetail::new(
                    candidate.row_number,
                    format!("插入失败: {}", e),
                )),
            }
        }
        (imported, errors)
    }
}
