// ==========================================
// 订单批量导入 - 字段映射器实现
// ==========================================
// 职责: 表头 → 标准字段映射（大小写不敏感、子串匹配、固定优先级）
// 红线: 一个表头只映射到一个字段;未识别表头保留在备用键下,不静默丢弃
// ==========================================

use crate::importer::cell::{CellValue, RawRow};
use crate::importer::order_importer_trait::FieldMapper as FieldMapperTrait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// CanonicalField - 标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    OrderId,
    Date,
    Address,
    Quantity,
    UnitPrice,
    TotalAmount,
    PaymentStatus,
    PaymentMode,
    Status,
    CustomerPhone,
    CustomerName,
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CanonicalField::OrderId => "orderId",
            CanonicalField::Date => "date",
            CanonicalField::Address => "deliveryAddress",
            CanonicalField::Quantity => "quantity",
            CanonicalField::UnitPrice => "unitPrice",
            CanonicalField::TotalAmount => "totalAmount",
            CanonicalField::PaymentStatus => "paymentStatus",
            CanonicalField::PaymentMode => "paymentMode",
            CanonicalField::Status => "status",
            CanonicalField::CustomerPhone => "customerPhone",
            CanonicalField::CustomerName => "customerName",
        };
        write!(f, "{}", name)
    }
}

/// 表头映射结果
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Canonical(CanonicalField),
    Extra(String), // 净化后的备用键
}

// ==========================================
// 映射规则（顺序即优先级）
// ==========================================
// 说明: 表头存在重叠（"Total Amount" / "Unit Price" / "Payment Status" / "Status"），
//       先匹配的规则胜出
type HeaderRule = (CanonicalField, fn(&NormalizedLabel) -> bool);

const HEADER_RULES: &[HeaderRule] = &[
    (CanonicalField::OrderId, is_order_id_label),
    (CanonicalField::Date, is_date_label),
    (CanonicalField::Address, is_address_label),
    (CanonicalField::Quantity, is_quantity_label),
    (CanonicalField::UnitPrice, is_unit_price_label),
    (CanonicalField::TotalAmount, is_amount_label),
    (CanonicalField::PaymentStatus, is_payment_status_label),
    (CanonicalField::PaymentMode, is_payment_mode_label),
    (CanonicalField::Status, is_status_label),
    (CanonicalField::CustomerPhone, is_phone_label),
    (CanonicalField::CustomerName, is_customer_name_label),
];

/// 归一化后的表头
struct NormalizedLabel {
    spaced: String,  // 小写,分隔符统一为单个空格
    compact: String, // 小写,去掉所有分隔符
}

impl NormalizedLabel {
    fn new(label: &str) -> Self {
        let lowered = label.trim().to_lowercase();
        let spaced = lowered
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-' || c == '.')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let compact = spaced.replace(' ', "");
        Self { spaced, compact }
    }

    fn has(&self, needle: &str) -> bool {
        self.spaced.contains(needle)
    }

    /// 整词匹配: words 作为连续单词出现
    fn has_words(&self, words: &[&str]) -> bool {
        let tokens: Vec<&str> = self.spaced.split(' ').collect();
        tokens.windows(words.len()).any(|w| w == words)
    }
}

fn is_order_id_label(l: &NormalizedLabel) -> bool {
    // "Order Notes" / "Order Nos" 不属于订单号
    l.compact.ends_with("orderid")
        || l.compact == "orderref"
        || l.has_words(&["order", "id"])
        || l.has_words(&["order", "no"])
        || l.has_words(&["order", "number"])
        || l.has_words(&["order", "ref"])
}

fn is_date_label(l: &NormalizedLabel) -> bool {
    l.has("date") && !l.has("billing") && !l.has("created") && !l.has("updated")
}

fn is_address_label(l: &NormalizedLabel) -> bool {
    l.has("address") || l.has("location")
}

fn is_quantity_label(l: &NormalizedLabel) -> bool {
    l.compact == "qty" || l.has("qty") || l.has("quantity")
}

fn is_unit_price_label(l: &NormalizedLabel) -> bool {
    (l.has("price") || l.has("rate")) && !l.has("total")
}

fn is_amount_label(l: &NormalizedLabel) -> bool {
    l.has("amount") || l.has("total")
}

fn is_payment_status_label(l: &NormalizedLabel) -> bool {
    l.compact.contains("paymentstatus")
}

fn is_payment_mode_label(l: &NormalizedLabel) -> bool {
    l.compact.contains("paymentmode")
        || l.compact.contains("paymentmethod")
        || l.compact.contains("paymenttype")
        || l.spaced == "mode"
}

fn is_status_label(l: &NormalizedLabel) -> bool {
    l.has("status")
}

fn is_phone_label(l: &NormalizedLabel) -> bool {
    l.has("phone") || l.has("mobile") || l.has("contact")
}

fn is_customer_name_label(l: &NormalizedLabel) -> bool {
    l.has("customer") || l.spaced == "name" || l.has("customer name")
}

/// 净化未识别表头作为备用键（小写、非字母数字 → '_'）
pub fn sanitize_header(label: &str, column_index: usize) -> String {
    let mut key = String::with_capacity(label.len());
    for c in label.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            key.push(c);
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    let key = key.trim_matches('_').to_string();
    if key.is_empty() {
        format!("column_{}", column_index + 1)
    } else {
        key
    }
}

// ==========================================
// RawOrderRecord - 字段映射产物
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawOrderRecord {
    pub row_number: usize,
    pub fields: HashMap<CanonicalField, CellValue>,
    pub extra_fields: BTreeMap<String, String>,
}

impl RawOrderRecord {
    pub fn get(&self, field: CanonicalField) -> Option<&CellValue> {
        self.fields.get(&field)
    }

    /// 文本字段（空白视为缺失）
    pub fn text(&self, field: CanonicalField) -> Option<String> {
        self.get(field).and_then(CellValue::as_text)
    }
}

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_header(&self, label: &str) -> FieldKey {
        let normalized = NormalizedLabel::new(label);
        if normalized.spaced.is_empty() {
            return FieldKey::Extra(String::new());
        }

        HEADER_RULES
            .iter()
            .find(|(_, matches)| matches(&normalized))
            .map(|(field, _)| FieldKey::Canonical(*field))
            .unwrap_or_else(|| FieldKey::Extra(sanitize_header(label, 0)))
    }

    fn map_row(&self, headers: &[String], row: &RawRow) -> RawOrderRecord {
        let mut record = RawOrderRecord {
            row_number: row.row_number,
            ..Default::default()
        };

        for (col_idx, cell) in row.cells.iter().enumerate() {
            let label = headers.get(col_idx).map(String::as_str).unwrap_or("");
            match self.map_header(label) {
                FieldKey::Canonical(field) => {
                    // 同一字段出现多列时,第一列非空值胜出
                    let occupied = record
                        .fields
                        .get(&field)
                        .map(|v| !v.is_blank())
                        .unwrap_or(false);
                    if !occupied {
                        record.fields.insert(field, cell.clone());
                    }
                }
                FieldKey::Extra(key) => {
                    if let Some(value) = cell.as_text() {
                        let key = if key.is_empty() {
                            sanitize_header(label, col_idx)
                        } else {
                            key
                        };
                        record.extra_fields.entry(key).or_insert(value);
                    }
                }
            }
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(label: &str) -> Option<CanonicalField> {
        match FieldMapper.map_header(label) {
            FieldKey::Canonical(field) => Some(field),
            FieldKey::Extra(_) => None,
        }
    }

    #[test]
    fn test_order_id_variants() {
        assert_eq!(canonical("Order ID"), Some(CanonicalField::OrderId));
        assert_eq!(canonical("orderid"), Some(CanonicalField::OrderId));
        assert_eq!(canonical("ORDER_ID"), Some(CanonicalField::OrderId));
        assert_eq!(canonical("Order No."), Some(CanonicalField::OrderId));
        assert_eq!(canonical("Order Number"), Some(CanonicalField::OrderId));
        assert_eq!(canonical("Customer Order ID"), Some(CanonicalField::OrderId));
    }

    #[test]
    fn test_order_notes_is_not_order_id() {
        assert_eq!(canonical("Order Notes"), None);
        assert_eq!(canonical("Order Nos"), None);
        assert_eq!(canonical("Order Notification"), None);

        let headers = vec!["Order Notes".to_string(), "Order ID".to_string()];
        let row = RawRow {
            row_number: 2,
            cells: vec![
                CellValue::Text("ring bell".to_string()),
                CellValue::Text("X1".to_string()),
            ],
        };

        let record = FieldMapper.map_row(&headers, &row);

        assert_eq!(record.text(CanonicalField::OrderId), Some("X1".to_string()));
        assert_eq!(
            record.extra_fields.get("order_notes"),
            Some(&"ring bell".to_string()),
            "备注列应作为扩展字段保留"
        );
    }

    #[test]
    fn test_date_excludes_qualified_variants() {
        assert_eq!(canonical("Date"), Some(CanonicalField::Date));
        assert_eq!(canonical("Order Date"), Some(CanonicalField::Date));
        assert_eq!(canonical("Billing Date"), None);
        assert_eq!(canonical("Created Date"), None);
        assert_eq!(canonical("updated_date"), None);
    }

    #[test]
    fn test_overlapping_amount_labels() {
        assert_eq!(canonical("Unit Price"), Some(CanonicalField::UnitPrice));
        assert_eq!(canonical("Total Amount"), Some(CanonicalField::TotalAmount));
        assert_eq!(canonical("Total Price"), Some(CanonicalField::TotalAmount));
        assert_eq!(canonical("Qty"), Some(CanonicalField::Quantity));
    }

    #[test]
    fn test_payment_before_status() {
        assert_eq!(canonical("Payment Status"), Some(CanonicalField::PaymentStatus));
        assert_eq!(canonical("Payment Mode"), Some(CanonicalField::PaymentMode));
        assert_eq!(canonical("Order Status"), Some(CanonicalField::Status));
        assert_eq!(canonical("Status"), Some(CanonicalField::Status));
    }

    #[test]
    fn test_customer_fields() {
        assert_eq!(canonical("Customer Phone"), Some(CanonicalField::CustomerPhone));
        assert_eq!(canonical("Customer Name"), Some(CanonicalField::CustomerName));
        assert_eq!(canonical("Delivery Address"), Some(CanonicalField::Address));
    }

    #[test]
    fn test_unrecognized_header_sanitized() {
        assert_eq!(
            FieldMapper.map_header("Table #"),
            FieldKey::Extra("table".to_string())
        );
        assert_eq!(
            FieldMapper.map_header("Special  Notes!"),
            FieldKey::Extra("special_notes".to_string())
        );
        assert_eq!(sanitize_header("###", 4), "column_5");
    }

    #[test]
    fn test_map_row_keeps_extra_fields() {
        let headers = vec![
            "Order ID".to_string(),
            "Table No".to_string(),
            "".to_string(),
        ];
        let row = RawRow {
            row_number: 2,
            cells: vec![
                CellValue::Text("X1".to_string()),
                CellValue::Number(7.0),
                CellValue::Text("note".to_string()),
            ],
        };

        let record = FieldMapper.map_row(&headers, &row);

        assert_eq!(record.row_number, 2);
        assert_eq!(record.text(CanonicalField::OrderId), Some("X1".to_string()));
        assert_eq!(record.extra_fields.get("table_no"), Some(&"7".to_string()));
        assert_eq!(record.extra_fields.get("column_3"), Some(&"note".to_string()));
    }

    #[test]
    fn test_map_row_first_non_empty_wins() {
        let headers = vec!["Date".to_string(), "Order Date".to_string()];
        let row = RawRow {
            row_number: 2,
            cells: vec![CellValue::Empty, CellValue::Text("2024-01-02".to_string())],
        };

        let record = FieldMapper.map_row(&headers, &row);

        assert_eq!(
            record.text(CanonicalField::Date),
            Some("2024-01-02".to_string())
        );
    }
}
