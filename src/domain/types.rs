// ==========================================
// 订单批量导入 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 付款状态 (Payment Status)
// ==========================================
// 红线: 只能由订单状态派生,不采信表格中的付款状态列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,    // 已付款
    Unpaid,  // 未付款
    Pending, // 待定
}

impl PaymentStatus {
    /// 由订单状态派生付款状态（大小写不敏感）
    ///
    /// # 规则
    /// - "paid" / "delivered" → Paid
    /// - "unpaid" → Unpaid
    /// - 其他 → Pending
    pub fn from_order_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "paid" | "delivered" => PaymentStatus::Paid,
            "unpaid" => PaymentStatus::Unpaid,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Paid" => Some(PaymentStatus::Paid),
            "Unpaid" => Some(PaymentStatus::Unpaid),
            "Pending" => Some(PaymentStatus::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
            PaymentStatus::Pending => write!(f, "Pending"),
        }
    }
}

// ==========================================
// 斜杠日期约定 (Slash Date Convention)
// ==========================================
// 用途: "03/04/2024" 这类两段都 <= 12 的日期存在歧义,按配置的约定解释
// 序列化格式: SCREAMING_SNAKE_CASE (与 config_kv 一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlashDateConvention {
    #[default]
    MonthFirst, // 美式 月/日/年
    DayFirst,   // 国际 日/月/年
}

impl SlashDateConvention {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "MONTH_FIRST" | "MDY" | "US" => Some(SlashDateConvention::MonthFirst),
            "DAY_FIRST" | "DMY" => Some(SlashDateConvention::DayFirst),
            _ => None,
        }
    }
}

impl fmt::Display for SlashDateConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlashDateConvention::MonthFirst => write!(f, "MONTH_FIRST"),
            SlashDateConvention::DayFirst => write!(f, "DAY_FIRST"),
        }
    }
}

// ==========================================
// 跳过原因 (Skip Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    Duplicate,      // 订单号已存在且不允许更新
    MissingOrderId, // 缺少订单号（订单号必须由调用方提供，不自动生成）
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Duplicate => write!(f, "DUPLICATE"),
            SkipReason::MissingOrderId => write!(f, "MISSING_ORDER_ID"),
        }
    }
}
