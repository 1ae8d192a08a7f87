// ==========================================
// 订单批量导入 - 对账分类器实现
// ==========================================
// 职责: 按外部订单号将候选订单分类为 Update / Insert / Skip
// 红线: 无订单号的候选订单永不写入;必须由调用方补充订单号
// ==========================================

use crate::domain::import::{ErrorDetail, ImportOptions};
use crate::domain::order::{ExistingOrderRef, OrderCandidate};
use crate::domain::types::SkipReason;
use crate::importer::order_importer_trait::OrderReconciler as OrderReconcilerTrait;
use std::collections::{HashMap, HashSet};

// ==========================================
// Disposition - 候选订单处置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Update(ExistingOrderRef),
    Insert,
    Skip(SkipReason),
}

/// 对账结果（按处置分组,组内保持原始行序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub updates: Vec<(OrderCandidate, ExistingOrderRef)>,
    pub inserts: Vec<OrderCandidate>,
    pub skips: Vec<(OrderCandidate, SkipReason)>,
    pub error_details: Vec<ErrorDetail>, // 缺失订单号的说明
}

impl ReconcilePlan {
    pub fn skipped(&self) -> usize {
        self.skips.len()
    }
}

/// 需要查询已存在订单的外部订单号（去重,保持首次出现顺序）
pub fn lookup_ids(candidates: &[OrderCandidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(OrderCandidate::trimmed_order_id)
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// 单条分类规则
///
/// # 规则
/// - 已存在 + update_existing → Update
/// - 已存在 + !update_existing + skip_duplicates → Skip(Duplicate)
/// - 已存在 + 两者皆否 → Insert（由存储唯一约束拒绝,计入写入错误）
/// - 不存在 → Insert
pub fn classify(existing: Option<&ExistingOrderRef>, options: &ImportOptions) -> Disposition {
    match existing {
        Some(found) if options.update_existing => Disposition::Update(found.clone()),
        Some(_) if options.skip_duplicates => Disposition::Skip(SkipReason::Duplicate),
        Some(_) | None => Disposition::Insert,
    }
}

pub struct Reconciler;

impl OrderReconcilerTrait for Reconciler {
    fn reconcile(
        &self,
        candidates: Vec<OrderCandidate>,
        existing: &[ExistingOrderRef],
        options: &ImportOptions,
    ) -> ReconcilePlan {
        let by_id: HashMap<&str, &ExistingOrderRef> = existing
            .iter()
            .map(|found| (found.order_id.as_str(), found))
            .collect();

        let mut plan = ReconcilePlan::default();

        for mut candidate in candidates {
            let order_id = match candidate.trimmed_order_id().map(str::to_string) {
                Some(id) => id,
                None => {
                    plan.error_details.push(ErrorDetail::new(
                        candidate.row_number,
                        "订单号缺失: 请在表格中补充 Order ID 后重新导入",
                    ));
                    plan.skips.push((candidate, SkipReason::MissingOrderId));
                    continue;
                }
            };

            // 写入一律使用去空白后的订单号
            candidate.order_id = Some(order_id.clone());

            match classify(by_id.get(order_id.as_str()).copied(), options) {
                Disposition::Update(found) => plan.updates.push((candidate, found)),
                Disposition::Insert => plan.inserts.push(candidate),
                Disposition::Skip(reason) => plan.skips.push((candidate, reason)),
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn candidate(order_id: Option<&str>, row_number: usize) -> OrderCandidate {
        OrderCandidate::new(
            row_number,
            order_id.map(str::to_string),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "A1".to_string(),
            1,
            10.0,
            "DELIVERED".to_string(),
            "Online".to_string(),
            None,
            None,
            BTreeMap::new(),
        )
    }

    fn existing(order_id: &str, row_key: i64) -> ExistingOrderRef {
        ExistingOrderRef {
            order_id: order_id.to_string(),
            row_key,
        }
    }

    fn options(update_existing: bool, skip_duplicates: bool) -> ImportOptions {
        ImportOptions {
            update_existing,
            skip_duplicates,
            auto_generate_order_ids: false,
        }
    }

    #[test]
    fn test_classification_table() {
        let found = existing("X1", 7);

        assert_eq!(
            classify(Some(&found), &options(true, false)),
            Disposition::Update(found.clone())
        );
        assert_eq!(
            classify(Some(&found), &options(true, true)),
            Disposition::Update(found.clone()),
            "update_existing 优先于 skip_duplicates"
        );
        assert_eq!(
            classify(Some(&found), &options(false, true)),
            Disposition::Skip(SkipReason::Duplicate)
        );
        assert_eq!(classify(Some(&found), &options(false, false)), Disposition::Insert);
        assert_eq!(classify(None, &options(false, true)), Disposition::Insert);
    }

    #[test]
    fn test_reconcile_partitions() {
        let candidates = vec![
            candidate(Some("X1"), 2),
            candidate(Some(" X2 "), 3),
            candidate(None, 4),
            candidate(Some("  "), 5),
        ];
        let plan = Reconciler.reconcile(candidates, &[existing("X1", 1)], &ImportOptions::default());

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].1.row_key, 1);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].order_id.as_deref(), Some("X2"), "订单号应去空白");
        assert_eq!(plan.skipped(), 2);
        assert!(plan
            .skips
            .iter()
            .all(|(_, reason)| *reason == SkipReason::MissingOrderId));
        assert_eq!(
            plan.error_details.iter().map(|d| d.row).collect::<Vec<_>>(),
            vec![4, 5]
        );
    }

    #[test]
    fn test_lookup_ids_deduplicated() {
        let candidates = vec![
            candidate(Some("X1"), 2),
            candidate(Some("X1 "), 3),
            candidate(None, 4),
            candidate(Some("X2"), 5),
        ];
        assert_eq!(lookup_ids(&candidates), vec!["X1".to_string(), "X2".to_string()]);
    }
}
