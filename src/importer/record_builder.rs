// ==========================================
// 订单批量导入 - 候选订单构建
// ==========================================
// 职责: 字段映射产物 → OrderCandidate（数值清洗 + 日期归一化 + 派生字段）
// 红线: 总额 / 付款状态 / 账期只能派生;表格中的总额列与付款状态列不采信
// ==========================================

use crate::domain::import::ErrorDetail;
use crate::domain::order::OrderCandidate;
use crate::importer::cell::CellValue;
use crate::importer::date_normalizer::DateNormalizer;
use crate::importer::field_mapper::{CanonicalField, RawOrderRecord};

pub const DEFAULT_ORDER_STATUS: &str = "DELIVERED";
pub const DEFAULT_PAYMENT_MODE: &str = "Online";
const DEFAULT_QUANTITY: u32 = 1;
const DEFAULT_UNIT_PRICE: f64 = 0.0;

/// 单价中需剥离的货币符号与千分位
const PRICE_NOISE: &[char] = &[',', '$', '€', '£', '¥', '₹', '￥', ' '];

// ==========================================
// RowOutcome - 单行构建结果
// ==========================================
// 由调用方折叠,不共享可变错误状态
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Candidate(OrderCandidate),
    Blank,                 // 配送地址为空: 视为空行,静默丢弃
    Rejected(ErrorDetail), // 日期不可用: 丢弃并记录错误
}

pub struct RecordBuilder {
    normalizer: DateNormalizer,
    default_status: String,
    default_payment_mode: String,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(
            DateNormalizer::default(),
            DEFAULT_ORDER_STATUS.to_string(),
            DEFAULT_PAYMENT_MODE.to_string(),
        )
    }
}

impl RecordBuilder {
    pub fn new(
        normalizer: DateNormalizer,
        default_status: String,
        default_payment_mode: String,
    ) -> Self {
        Self {
            normalizer,
            default_status,
            default_payment_mode,
        }
    }

    pub fn normalizer(&self) -> &DateNormalizer {
        &self.normalizer
    }

    /// 构建候选订单
    ///
    /// # 返回
    /// - Candidate: 构建成功（派生字段已计算）
    /// - Blank: 配送地址为空
    /// - Rejected: 日期缺失/无法解析/超出合理范围
    pub fn build(&self, record: &RawOrderRecord) -> RowOutcome {
        let delivery_address = match record.text(CanonicalField::Address) {
            Some(address) => address,
            None => return RowOutcome::Blank,
        };

        let date_cell = record.get(CanonicalField::Date).unwrap_or(&CellValue::Empty);
        let order_date = match self.normalizer.normalize(date_cell) {
            Ok(date) => date,
            Err(rejection) => {
                return RowOutcome::Rejected(ErrorDetail::new(
                    record.row_number,
                    rejection.to_string(),
                ));
            }
        };

        let quantity = record
            .get(CanonicalField::Quantity)
            .and_then(parse_quantity)
            .unwrap_or(DEFAULT_QUANTITY);
        let unit_price = record
            .get(CanonicalField::UnitPrice)
            .and_then(parse_unit_price)
            .unwrap_or(DEFAULT_UNIT_PRICE);

        let status = record
            .text(CanonicalField::Status)
            .unwrap_or_else(|| self.default_status.clone());
        let payment_mode = record
            .text(CanonicalField::PaymentMode)
            .unwrap_or_else(|| self.default_payment_mode.clone());

        RowOutcome::Candidate(OrderCandidate::new(
            record.row_number,
            record.text(CanonicalField::OrderId),
            order_date,
            delivery_address,
            quantity,
            unit_price,
            status,
            payment_mode,
            record.text(CanonicalField::CustomerName),
            record.text(CanonicalField::CustomerPhone),
            record.extra_fields.clone(),
        ))
    }
}

/// 数量: 正整数;非正数或无法解析时返回 None（调用方取默认值）
fn parse_quantity(cell: &CellValue) -> Option<u32> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    if !value.is_finite() || value < 1.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u32)
}

/// 单价: 非负数;剥离货币符号与千分位
fn parse_unit_price(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| !PRICE_NOISE.contains(c)).collect();
            // "Rs 40" / "40 INR"
            let cleaned = cleaned
                .trim_start_matches(char::is_alphabetic)
                .trim_end_matches(char::is_alphabetic);
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PaymentStatus;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn record(pairs: Vec<(CanonicalField, CellValue)>) -> RawOrderRecord {
        RawOrderRecord {
            row_number: 2,
            fields: pairs.into_iter().collect(),
            extra_fields: BTreeMap::new(),
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_build_scenario_row() {
        let rec = record(vec![
            (CanonicalField::OrderId, text("X1")),
            (CanonicalField::Date, CellValue::Number(45292.0)),
            (CanonicalField::Address, text("A1")),
            (CanonicalField::Quantity, CellValue::Number(2.0)),
            (CanonicalField::UnitPrice, CellValue::Number(50.0)),
        ]);

        let candidate = match RecordBuilder::default().build(&rec) {
            RowOutcome::Candidate(c) => c,
            other => panic!("期望构建成功: {:?}", other),
        };

        assert_eq!(candidate.order_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(candidate.total_amount, 100.0);
        assert_eq!(candidate.billing_month, 1);
        assert_eq!(candidate.billing_year, 2024);
        assert_eq!(candidate.status, "DELIVERED");
        assert_eq!(candidate.payment_status, PaymentStatus::Paid);
        assert_eq!(candidate.payment_mode, "Online");
    }

    #[test]
    fn test_sheet_total_and_payment_status_ignored() {
        let rec = record(vec![
            (CanonicalField::Date, text("2024-02-01")),
            (CanonicalField::Address, text("A1")),
            (CanonicalField::Quantity, CellValue::Number(3.0)),
            (CanonicalField::UnitPrice, CellValue::Number(10.0)),
            (CanonicalField::TotalAmount, CellValue::Number(999.0)),
            (CanonicalField::Status, text("unpaid")),
            (CanonicalField::PaymentStatus, text("Paid")),
        ]);

        match RecordBuilder::default().build(&rec) {
            RowOutcome::Candidate(c) => {
                assert_eq!(c.total_amount, 30.0, "总额必须派生");
                assert_eq!(c.payment_status, PaymentStatus::Unpaid, "付款状态必须派生");
            }
            other => panic!("期望构建成功: {:?}", other),
        }
    }

    #[test]
    fn test_blank_address_is_blank_row() {
        let rec = record(vec![
            (CanonicalField::Date, text("2024-02-01")),
            (CanonicalField::Address, text("   ")),
        ]);
        assert_eq!(RecordBuilder::default().build(&rec), RowOutcome::Blank);
    }

    #[test]
    fn test_bad_date_rejected_with_row_number() {
        let rec = record(vec![
            (CanonicalField::Date, text("2024-13-01")),
            (CanonicalField::Address, text("A2")),
        ]);
        match RecordBuilder::default().build(&rec) {
            RowOutcome::Rejected(detail) => {
                assert_eq!(detail.row, 2);
                assert!(detail.message.contains("日期"), "错误信息应指明日期: {}", detail.message);
            }
            other => panic!("期望日期拒绝: {:?}", other),
        }

        let missing = record(vec![(CanonicalField::Address, text("A2"))]);
        assert!(matches!(
            RecordBuilder::default().build(&missing),
            RowOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_quantity_defaults() {
        assert_eq!(parse_quantity(&CellValue::Number(0.0)), None);
        assert_eq!(parse_quantity(&CellValue::Number(-2.0)), None);
        assert_eq!(parse_quantity(&text("abc")), None);
        assert_eq!(parse_quantity(&text(" 4 ")), Some(4));
        assert_eq!(parse_quantity(&CellValue::Number(2.9)), Some(2));
    }

    #[test]
    fn test_unit_price_cleaning() {
        assert_eq!(parse_unit_price(&text("$1,250.50")), Some(1250.5));
        assert_eq!(parse_unit_price(&text("₹ 99")), Some(99.0));
        assert_eq!(parse_unit_price(&text("Rs 40")), Some(40.0));
        assert_eq!(parse_unit_price(&CellValue::Number(-5.0)), None);
        assert_eq!(parse_unit_price(&text("free")), None);
    }
}
