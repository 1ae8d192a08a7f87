// ==========================================
// 订单批量导入 - 订单领域模型
// ==========================================
// 用途: 导入管道中间产物（行 → 候选订单）与持久化订单视图
// 红线: total_amount / billing_month / billing_year 只能派生，不采信表格原值
// ==========================================

use crate::domain::types::PaymentStatus;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 本导入管道写入订单的来源标记
pub const ORDER_SOURCE_EXCEL: &str = "excel";

// ==========================================
// OrderCandidate - 候选订单
// ==========================================
// 生命周期: 每行构建一次,构建后不再修改;下游只做分类与写入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCandidate {
    // ===== 对账键 =====
    pub order_id: Option<String>, // 外部订单号（调用方提供）

    // ===== 必填字段 =====
    pub order_date: NaiveDate,    // 订单日期
    pub delivery_address: String, // 配送地址（非空）

    // ===== 金额 =====
    pub quantity: u32,     // 数量（正整数，默认 1）
    pub unit_price: f64,   // 单价（非负，默认 0）
    pub total_amount: f64, // 总额（派生: quantity × unit_price）

    // ===== 状态 =====
    pub status: String,                // 订单状态（自由文本，默认 DELIVERED）
    pub payment_status: PaymentStatus, // 付款状态（派生自 status）
    pub payment_mode: String,          // 付款方式（默认 Online）

    // ===== 账期（派生自 order_date）=====
    pub billing_month: u32,
    pub billing_year: i32,

    // ===== 顾客 =====
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    // ===== 元信息 =====
    pub source: String,                           // 固定为 "excel"
    pub extra_fields: BTreeMap<String, String>,   // 未识别列（净化后的列名 → 原值）
    pub row_number: usize,                        // 表格行号（表头为第 1 行）
}

impl OrderCandidate {
    /// 构建候选订单，统一计算所有派生字段
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        row_number: usize,
        order_id: Option<String>,
        order_date: NaiveDate,
        delivery_address: String,
        quantity: u32,
        unit_price: f64,
        status: String,
        payment_mode: String,
        customer_name: Option<String>,
        customer_phone: Option<String>,
        extra_fields: BTreeMap<String, String>,
    ) -> Self {
        let payment_status = PaymentStatus::from_order_status(&status);
        Self {
            order_id,
            order_date,
            delivery_address,
            quantity,
            unit_price,
            total_amount: compute_total(quantity, unit_price),
            status,
            payment_status,
            payment_mode,
            billing_month: order_date.month(),
            billing_year: order_date.year(),
            customer_name,
            customer_phone,
            source: ORDER_SOURCE_EXCEL.to_string(),
            extra_fields,
            row_number,
        }
    }

    /// 去除首尾空白后的订单号（空白视为缺失）
    pub fn trimmed_order_id(&self) -> Option<&str> {
        self.order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// 写入时重新计算的总额（防止任何中间环节漂移）
    pub fn recomputed_total(&self) -> f64 {
        compute_total(self.quantity, self.unit_price)
    }
}

/// 总额 = 数量 × 单价，保留两位小数
pub fn compute_total(quantity: u32, unit_price: f64) -> f64 {
    (quantity as f64 * unit_price * 100.0).round() / 100.0
}

// ==========================================
// ExistingOrderRef - 已存在订单引用
// ==========================================
// 用途: 对账所需的最小子集（外部订单号 + 写入句柄）
// 所有权: 订单存储;导入管道只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingOrderRef {
    pub order_id: String, // 外部订单号
    pub row_key: i64,     // 存储内部主键
}

// ==========================================
// StoredOrder - 已落库订单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOrder {
    pub row_key: i64,
    pub order_id: String,
    pub order_date: NaiveDate,
    pub delivery_address: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub status: String,
    pub payment_status: String,
    pub payment_mode: String,
    pub billing_month: u32,
    pub billing_year: i32,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub source: String,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(quantity: u32, unit_price: f64, status: &str) -> OrderCandidate {
        OrderCandidate::new(
            2,
            Some("  X1 ".to_string()),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            "A1".to_string(),
            quantity,
            unit_price,
            status.to_string(),
            "Online".to_string(),
            None,
            None,
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_derived_fields() {
        let order = candidate(2, 50.0, "Delivered");
        assert_eq!(order.total_amount, 100.0);
        assert_eq!(order.billing_month, 3);
        assert_eq!(order.billing_year, 2024);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.source, "excel");
    }

    #[test]
    fn test_total_rounding() {
        let order = candidate(3, 0.1, "Pending");
        assert_eq!(order.total_amount, 0.3);
        assert_eq!(order.recomputed_total(), 0.3);
    }

    #[test]
    fn test_trimmed_order_id() {
        let mut order = candidate(1, 0.0, "Paid");
        assert_eq!(order.trimmed_order_id(), Some("X1"));

        order.order_id = Some("   ".to_string());
        assert_eq!(order.trimmed_order_id(), None);
    }
}
