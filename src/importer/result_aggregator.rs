// ==========================================
// 订单批量导入 - 结果汇总
// ==========================================
// 红线: 计数永远精确;只截断 error_details 展示列表
// ==========================================

use crate::domain::import::{ErrorDetail, ImportResult};

/// 默认错误明细展示上限
pub const DEFAULT_ERROR_DETAIL_CAP: usize = 10;

/// 汇总各阶段产出
#[derive(Debug, Default)]
pub struct ResultAggregator {
    imported: usize,
    updated: usize,
    skipped: usize,
    validation_errors: Vec<ErrorDetail>,
    write_errors: Vec<ErrorDetail>,
    notices: Vec<ErrorDetail>, // 跳过说明（如缺失订单号）,不计入错误数
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validation_errors(&mut self, errors: impl IntoIterator<Item = ErrorDetail>) {
        self.validation_errors.extend(errors);
    }

    pub fn add_write_errors(&mut self, errors: impl IntoIterator<Item = ErrorDetail>) {
        self.write_errors.extend(errors);
    }

    pub fn add_skipped(&mut self, skipped: usize, notices: impl IntoIterator<Item = ErrorDetail>) {
        self.skipped += skipped;
        self.notices.extend(notices);
    }

    pub fn add_written(&mut self, imported: usize, updated: usize) {
        self.imported += imported;
        self.updated += updated;
    }

    /// 生成最终结果
    ///
    /// # 参数
    /// - detail_cap: 错误明细展示上限（按行号排序后截断）
    pub fn finish(self, detail_cap: usize) -> ImportResult {
        let mut error_details: Vec<ErrorDetail> = self
            .validation_errors
            .iter()
            .chain(self.write_errors.iter())
            .chain(self.notices.iter())
            .cloned()
            .collect();
        // 稳定排序: 同一行保持阶段顺序
        error_details.sort_by_key(|detail| detail.row);
        error_details.truncate(detail_cap);

        ImportResult {
            imported: self.imported,
            updated: self.updated,
            skipped: self.skipped,
            total: self.imported + self.updated,
            write_errors: self.write_errors.len(),
            validation_errors: self.validation_errors.len(),
            error_details,
        }
    }
}
