// ==========================================
// 订单批量导入 - 单元格网格模型
// ==========================================
// 职责: 文件解码器与导入管道之间的边界类型
// 说明: 解码器产出表头 + 数据行;部分单元格可能已被解码为原生日期
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 表头所在行（1-based）
pub const HEADER_ROW_NUMBER: usize = 1;

/// 数据行下标 → 表格行号（数据从第 2 行开始）
pub fn row_number_for_index(data_index: usize) -> usize {
    data_index + HEADER_ROW_NUMBER + 1
}

// ==========================================
// CellValue - 原始单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime), // 解码器已识别的原生日期
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 转为去空白文本;空值返回 None
    pub fn as_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string().trim().to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            // 整数值不输出 ".0"（订单号/电话常被解码为数字）
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// ==========================================
// RawRow - 原始数据行
// ==========================================
// 生命周期: 单次上传内,消费一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: usize,     // 表格行号（表头为第 1 行）
    pub cells: Vec<CellValue>, // 按列顺序
}

impl RawRow {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

// ==========================================
// SheetGrid - 解码后的工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    pub sheet_name: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetGrid {
    /// 由表头与按序数据行构建,自动编号行号
    pub fn from_rows(
        sheet_name: Option<String>,
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| RawRow {
                row_number: row_number_for_index(idx),
                cells,
            })
            .collect();

        Self {
            sheet_name,
            headers,
            rows,
        }
    }

    /// 没有任何非空数据行
    pub fn has_no_data(&self) -> bool {
        self.rows.iter().all(RawRow::is_blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_numbers_start_after_header() {
        let grid = SheetGrid::from_rows(
            None,
            vec!["Order ID".to_string()],
            vec![
                vec![CellValue::Text("X1".to_string())],
                vec![CellValue::Text("X2".to_string())],
            ],
        );
        assert_eq!(grid.rows[0].row_number, 2);
        assert_eq!(grid.rows[1].row_number, 3);
    }

    #[test]
    fn test_integer_number_display() {
        assert_eq!(CellValue::Number(1001.0).to_string(), "1001");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Text("  a ".to_string()).as_text(), Some("a".to_string()));
        assert_eq!(CellValue::Text("   ".to_string()).as_text(), None);
    }

    #[test]
    fn test_has_no_data() {
        let grid = SheetGrid::from_rows(
            None,
            vec!["a".to_string()],
            vec![vec![CellValue::Empty], vec![CellValue::Text(" ".to_string())]],
        );
        assert!(grid.has_no_data());
    }
}
