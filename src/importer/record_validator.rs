// ==========================================
// 订单批量导入 - 记录校验器实现
// ==========================================
// 职责: 候选订单必填字段复核（日期窗口 / 配送地址）
// 红线: 校验失败只记录行级错误,不中止批次
// ==========================================

use crate::domain::import::ErrorDetail;
use crate::domain::order::OrderCandidate;
use crate::importer::date_normalizer::DateNormalizer;
use crate::importer::order_importer_trait::RecordValidator as RecordValidatorTrait;

pub struct RecordValidator {
    normalizer: DateNormalizer,
}

impl RecordValidator {
    pub fn new(normalizer: DateNormalizer) -> Self {
        Self { normalizer }
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(DateNormalizer::default())
    }
}

impl RecordValidatorTrait for RecordValidator {
    fn validate(&self, candidate: &OrderCandidate) -> Result<(), ErrorDetail> {
        if candidate.delivery_address.trim().is_empty() {
            return Err(ErrorDetail::new(candidate.row_number, "配送地址缺失"));
        }

        if !self.normalizer.in_window(candidate.order_date) {
            return Err(ErrorDetail::new(
                candidate.row_number,
                format!(
                    "日期超出合理范围: {}",
                    candidate.order_date.format("%Y-%m-%d")
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn candidate(date: NaiveDate, address: &str) -> OrderCandidate {
        OrderCandidate::new(
            5,
            Some("X1".to_string()),
            date,
            address.to_string(),
            1,
            10.0,
            "DELIVERED".to_string(),
            "Online".to_string(),
            None,
            None,
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_valid_candidate_passes() {
        let ok = candidate(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "A1");
        assert!(RecordValidator::default().validate(&ok).is_ok());
    }

    #[test]
    fn test_blank_address_fails() {
        let bad = candidate(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "  ");
        let err = RecordValidator::default().validate(&bad).unwrap_err();
        assert_eq!(err.row, 5);
    }

    #[test]
    fn test_out_of_window_date_fails() {
        let bad = candidate(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(), "A1");
        let err = RecordValidator::default().validate(&bad).unwrap_err();
        assert!(err.message.contains("1999-12-31"));
    }
}
