// ==========================================
// 订单批量导入 - 日期归一化
// ==========================================
// 职责: 任意形态的日期单元格 → 日历日期,或判定为不可解析
// 支持: 表格序列号 / 原生日期 / ISO / 斜杠 / 短横线数字 / D-Mon-YY / 通用格式
// 红线: 不可解析的日期绝不以"今天"代替;超出合理窗口的日期按不可解析处理
// ==========================================

use crate::domain::types::SlashDateConvention;
use crate::importer::cell::CellValue;
use chrono::{DateTime, Datelike, Duration, NaiveDate};
use std::fmt;

/// 默认合理年份窗口（含两端）
pub const DEFAULT_MIN_YEAR: i32 = 2000;
pub const DEFAULT_MAX_YEAR: i32 = 2100;

/// 序列号 >= 此值时需要扣除 1900-02-29 这个并不存在的日期
const PHANTOM_LEAP_DAY_SERIAL: i64 = 60;

/// 表格格式可表示的最大序列号（9999-12-31）,超出按不可解析处理
pub const MAX_SERIAL: f64 = 2_958_465.0;

/// 两位年份分界: < 50 → 20xx, >= 50 → 19xx
const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// 兜底格式（依次尝试）
const FALLBACK_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y年%m月%d日",
];

// ==========================================
// DateRejection - 日期拒绝原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRejection {
    Missing,                 // 单元格为空
    Unrecognized(String),    // 无法识别的格式或非法日期
    OutOfRange(NaiveDate),   // 解析成功但超出合理窗口
}

impl fmt::Display for DateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRejection::Missing => write!(f, "日期缺失"),
            DateRejection::Unrecognized(raw) => write!(f, "日期无法解析: {}", raw),
            DateRejection::OutOfRange(date) => {
                write!(f, "日期超出合理范围: {}", date.format("%Y-%m-%d"))
            }
        }
    }
}

// ==========================================
// DateNormalizer
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    convention: SlashDateConvention,
    min_year: i32,
    max_year: i32,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(SlashDateConvention::MonthFirst, DEFAULT_MIN_YEAR, DEFAULT_MAX_YEAR)
    }
}

impl DateNormalizer {
    pub fn new(convention: SlashDateConvention, min_year: i32, max_year: i32) -> Self {
        Self {
            convention,
            min_year,
            max_year,
        }
    }

    /// 归一化单元格日期（含合理窗口校验）
    pub fn normalize(&self, cell: &CellValue) -> Result<NaiveDate, DateRejection> {
        let date = self.parse_cell(cell)?;
        if self.in_window(date) {
            Ok(date)
        } else {
            Err(DateRejection::OutOfRange(date))
        }
    }

    /// 是否处于合理年份窗口内
    pub fn in_window(&self, date: NaiveDate) -> bool {
        (self.min_year..=self.max_year).contains(&date.year())
    }

    /// 解析单元格（不做窗口校验）
    pub fn parse_cell(&self, cell: &CellValue) -> Result<NaiveDate, DateRejection> {
        match cell {
            CellValue::Empty => Err(DateRejection::Missing),
            CellValue::Number(serial) => from_serial(*serial)
                .ok_or_else(|| DateRejection::Unrecognized(cell.to_string())),
            // 原生日期直接取其年月日,不经过任何时区换算
            CellValue::DateTime(dt) => Ok(dt.date()),
            CellValue::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DateRejection::Missing);
                }
                self.parse_text(trimmed)
                    .ok_or_else(|| DateRejection::Unrecognized(trimmed.to_string()))
            }
            CellValue::Bool(_) => Err(DateRejection::Unrecognized(cell.to_string())),
        }
    }

    /// 解析日期字符串
    ///
    /// # 顺序
    /// 1. ISO 形态 `YYYY-MM-DD...`（形态命中但日期非法时直接判定失败）
    /// 2. 斜杠 `M/D/YY(YY)`
    /// 3. 短横线数字 `D-M-YY(YY)`
    /// 4. `D-Mon-YY(YY)`
    /// 5. 通用格式兜底
    pub fn parse_text(&self, raw: &str) -> Option<NaiveDate> {
        // 去掉时间部分（"1/2/2024 10:30"）
        let head = raw.split_whitespace().next().unwrap_or(raw);

        if let Some(iso) = iso_prefix(raw) {
            return parse_iso(iso);
        }
        if let Some(date) = self.parse_slash(head) {
            return Some(date);
        }
        if let Some(date) = parse_dash_numeric(head) {
            return Some(date);
        }
        if let Some(date) = parse_dash_month_name(head) {
            return Some(date);
        }
        parse_fallback(raw)
    }

    /// 斜杠日期: 默认月/日/年;首段 > 12 时按日/月/年解释
    fn parse_slash(&self, raw: &str) -> Option<NaiveDate> {
        let parts = split_numeric(raw, '/', &[(1, 2), (1, 2), (2, 4)])?;
        let (first, second, year) = (parts[0], parts[1], expand_year(parts[2], raw)?);

        let (month, day) = match self.convention {
            SlashDateConvention::MonthFirst if first > 12 => (second, first),
            SlashDateConvention::MonthFirst => (first, second),
            SlashDateConvention::DayFirst if second > 12 => (first, second),
            SlashDateConvention::DayFirst => (second, first),
        };

        NaiveDate::from_ymd_opt(year, month, day)
    }
}

// ==========================================
// 表格序列号
// ==========================================

/// 表格序列号 → 日期
///
/// # 规则
/// - 朴素纪元为 1899-12-31（序列号 1 = 1900-01-01）
/// - 序列号 >= 60 时扣除 1 天,抵消表格格式虚构的 1900-02-29
///   （等价于现代区间以 1899-12-30 为第 0 天: 45292 = 2024-01-01）
/// - 小数部分（时刻）直接截断
/// - 超过 MAX_SERIAL 的序列号返回 None
///
/// 注意: "序列号 1 = 1899-12-31" 的说法与 "45292 = 2024-01-01" 及 >= 60 校正互相矛盾,
/// 三者只能同时满足其二;这里保留后两者,勿改回 1899-12-30 纪元
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if days >= PHANTOM_LEAP_DAY_SERIAL {
        days - 1
    } else {
        days
    };

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    epoch.checked_add_signed(Duration::try_days(offset)?)
}

/// 未校正的朴素换算（仅用于对比校正效果）
pub fn from_serial_uncorrected(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    epoch.checked_add_signed(Duration::try_days(serial.trunc() as i64)?)
}

// ==========================================
// 字符串形态解析
// ==========================================

/// 提取 `YYYY-MM-DD` 前缀（其后可跟 'T' / 空格 / 时区等）
fn iso_prefix(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() < 8 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
        return None;
    }
    let end = raw
        .find(|c: char| c == 'T' || c == 't' || c.is_whitespace())
        .unwrap_or(raw.len());
    let candidate = &raw[..end];
    let pieces: Vec<&str> = candidate.split('-').collect();
    if pieces.len() == 3 && pieces.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        Some(candidate)
    } else {
        None
    }
}

fn parse_iso(candidate: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok()
}

/// 短横线数字: 日-月-年（国际习惯,与斜杠默认约定不同）
fn parse_dash_numeric(raw: &str) -> Option<NaiveDate> {
    let parts = split_numeric(raw, '-', &[(1, 2), (1, 2), (2, 4)])?;
    if parts_len_ok(raw, '-', &[2, 4]) {
        let year = expand_year(parts[2], raw)?;
        NaiveDate::from_ymd_opt(year, parts[1], parts[0])
    } else {
        None
    }
}

/// `D-Mon-YY(YY)`: 月份按英文缩写前缀匹配（大小写不敏感）
fn parse_dash_month_name(raw: &str) -> Option<NaiveDate> {
    let pieces: Vec<&str> = raw.split('-').collect();
    if pieces.len() != 3 {
        return None;
    }
    let (day_raw, month_raw, year_raw) = (pieces[0], pieces[1], pieces[2]);

    if day_raw.is_empty() || day_raw.len() > 2 || !day_raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if month_raw.len() < 3 || !month_raw.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if !(year_raw.len() == 2 || year_raw.len() == 4)
        || !year_raw.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let prefix = month_raw[..3].to_lowercase();
    let month = MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| *abbr == prefix)
        .map(|idx| idx as u32 + 1)?;

    let day: u32 = day_raw.parse().ok()?;
    let year_num: u32 = year_raw.parse().ok()?;
    let year = expand_year(year_num, year_raw)?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// 通用格式兜底（含 RFC 3339 / RFC 2822 / YYYYMMDD / 文本序列号）
fn parse_fallback(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    for fmt in FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }

    // 纯数字文本: 8 位按 YYYYMMDD,否则按序列号（CSV 中的序列号以文本形式出现）
    if raw.chars().all(|c| c.is_ascii_digit()) && raw.len() == 8 {
        return NaiveDate::parse_from_str(raw, "%Y%m%d").ok();
    }
    if let Ok(serial) = raw.parse::<f64>() {
        return from_serial(serial);
    }
    None
}

/// 按分隔符切分为三段纯数字,并检查每段长度
fn split_numeric(raw: &str, sep: char, widths: &[(usize, usize); 3]) -> Option<[u32; 3]> {
    let pieces: Vec<&str> = raw.split(sep).collect();
    if pieces.len() != 3 {
        return None;
    }
    let mut out = [0u32; 3];
    for (idx, piece) in pieces.iter().enumerate() {
        let (min, max) = widths[idx];
        if piece.len() < min || piece.len() > max || !piece.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        out[idx] = piece.parse().ok()?;
    }
    Some(out)
}

/// 短横线数字的年份段只接受 2 位或 4 位
fn parts_len_ok(raw: &str, sep: char, year_widths: &[usize]) -> bool {
    raw.rsplit(sep)
        .next()
        .map(|year| year_widths.contains(&year.len()))
        .unwrap_or(false)
}

/// 年份展开: 两位年份按分界映射,其余原样
fn expand_year(year: u32, raw: &str) -> Option<i32> {
    let year_digits = raw
        .rsplit(|c: char| !c.is_ascii_digit())
        .next()
        .map(str::len)
        .unwrap_or(0);
    let year = i32::try_from(year).ok()?;
    if year_digits == 2 {
        if year < TWO_DIGIT_YEAR_PIVOT {
            Some(2000 + year)
        } else {
            Some(1900 + year)
        }
    } else {
        Some(year)
    }
}
