// ==========================================
// 订单批量导入 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解码 → SheetGrid
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls) / OpenDocument (.ods) / CSV (.csv)
// 说明: 保留原生日期单元格,交由日期归一化处理;空行保留以维持行号对齐
// ==========================================

use crate::importer::cell::{CellValue, SheetGrid};
use crate::importer::error::{ImportError, IngestResult};
use crate::importer::order_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// 优先读取的工作表名（忽略大小写与空白）
const PREFERRED_SHEET: &str = "alldata";

const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> IngestResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

/// 选择工作表: 名为 "all data"（忽略大小写与空白）优先,否则第一个
pub fn select_sheet(sheet_names: &[String]) -> Option<&String> {
    sheet_names
        .iter()
        .find(|name| {
            let compact: String = name.split_whitespace().collect();
            compact.to_lowercase() == PREFERRED_SHEET
        })
        .or_else(|| sheet_names.first())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_grid(&self, file_path: &Path) -> IngestResult<SheetGrid> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells = record
                .iter()
                .map(|value| {
                    if value.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(value.to_string())
                    }
                })
                .collect();
            rows.push(cells);
        }

        if headers.iter().all(String::is_empty) {
            return Err(ImportError::EmptySheet(file_path.display().to_string()));
        }

        debug!(rows = rows.len(), "CSV 解析完成");
        Ok(SheetGrid::from_rows(None, headers, rows))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// calamine 单元格 → CellValue
    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) if s.trim().is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(native) => CellValue::DateTime(native),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) => CellValue::Empty,
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_to_grid(&self, file_path: &Path) -> IngestResult<SheetGrid> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = select_sheet(&sheet_names)
            .cloned()
            .ok_or_else(|| ImportError::EmptySheet("文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::EmptySheet(sheet_name.clone()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let data_rows: Vec<Vec<CellValue>> = rows
            .map(|row| row.iter().map(Self::convert_cell).collect())
            .collect();

        debug!(sheet = %sheet_name, rows = data_rows.len(), "工作表解析完成");
        Ok(SheetGrid::from_rows(Some(sheet_name), headers, data_rows))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_grid(&self, file_path: &Path) -> IngestResult<SheetGrid> {
        let ext = extension_of(file_path);

        match ext.as_str() {
            "csv" => CsvParser.parse_to_grid(file_path),
            e if EXCEL_EXTENSIONS.contains(&e) => ExcelParser.parse_to_grid(file_path),
            _ => {
                ensure_exists(file_path)?;
                Err(ImportError::UnsupportedFormat(ext))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::date_normalizer::DateNormalizer;
    use chrono::NaiveDate;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "Order ID,Date,Delivery Address",
            "X1,2024-01-01,A1",
            "X2,45292,A2",
        ]);

        let grid = CsvParser.parse_to_grid(temp_file.path()).unwrap();

        assert_eq!(grid.headers, vec!["Order ID", "Date", "Delivery Address"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].row_number, 2);
        assert_eq!(grid.rows[1].cells[1], CellValue::Text("45292".to_string()));
    }

    #[test]
    fn test_csv_parser_keeps_blank_rows_for_numbering() {
        let temp_file = csv_file(&["Order ID,Address", "X1,A1", ",", "X3,A3"]);

        let grid = CsvParser.parse_to_grid(temp_file.path()).unwrap();

        assert_eq!(grid.rows.len(), 3);
        assert!(grid.rows[1].is_blank());
        assert_eq!(grid.rows[2].row_number, 4);
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_grid(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse_to_grid(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_select_sheet_prefers_all_data() {
        let names = vec!["Summary".to_string(), " ALL  Data ".to_string()];
        assert_eq!(select_sheet(&names), Some(&names[1]));

        let names = vec!["Sheet1".to_string(), "Sheet2".to_string()];
        assert_eq!(select_sheet(&names), Some(&names[0]));

        assert_eq!(select_sheet(&[]), None);
    }

    #[test]
    fn test_convert_native_cells() {
        assert_eq!(ExcelParser::convert_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(ExcelParser::convert_cell(&Data::String("  ".to_string())), CellValue::Empty);
        assert_eq!(
            ExcelParser::convert_cell(&Data::DateTimeIso("2024-01-01".to_string())),
            CellValue::Text("2024-01-01".to_string())
        );
    }

    fn xlsx_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("orders.xlsx")
    }

    /// "Sheet1" 在前,目标数据位于 " ALL data "（含原生日期单元格）
    fn write_two_sheet_workbook(path: &Path) {
        let mut workbook = Workbook::new();

        let decoy = workbook.add_worksheet();
        decoy.set_name("Sheet1").unwrap();
        decoy.write_string(0, 0, "Notes").unwrap();
        decoy.write_string(1, 0, "not order data").unwrap();

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let order_date = ExcelDateTime::from_ymd(2024, 3, 15).unwrap();

        let sheet = workbook.add_worksheet();
        sheet.set_name(" ALL data ").unwrap();
        for (col, header) in ["Order ID", "Date", "Delivery Address", "Qty", "Unit Price"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "X1").unwrap();
        sheet
            .write_datetime_with_format(1, 1, &order_date, &date_format)
            .unwrap();
        sheet.write_string(1, 2, "A1").unwrap();
        sheet.write_number(1, 3, 2).unwrap();
        sheet.write_number(1, 4, 50).unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn test_excel_parser_selects_all_data_sheet() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = xlsx_path(&dir);
        write_two_sheet_workbook(&path);

        let grid = ExcelParser.parse_to_grid(&path).unwrap();

        assert_eq!(grid.sheet_name.as_deref(), Some(" ALL data "));
        assert_eq!(
            grid.headers,
            vec!["Order ID", "Date", "Delivery Address", "Qty", "Unit Price"]
        );
        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.rows[0].row_number, 2);
        assert_eq!(grid.rows[0].cells[0], CellValue::Text("X1".to_string()));
        assert_eq!(grid.rows[0].cells[3], CellValue::Number(2.0));
    }

    #[test]
    fn test_excel_native_date_keeps_calendar_day() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = xlsx_path(&dir);
        write_two_sheet_workbook(&path);

        let grid = UniversalFileParser.parse_to_grid(&path).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        match &grid.rows[0].cells[1] {
            CellValue::DateTime(dt) => assert_eq!(dt.date(), expected),
            other => panic!("日期单元格应为原生日期, 实际: {:?}", other),
        }
        assert_eq!(
            DateNormalizer::default().normalize(&grid.rows[0].cells[1]),
            Ok(expected)
        );
    }

    #[test]
    fn test_excel_header_only_sheet_has_no_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = xlsx_path(&dir);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Order ID").unwrap();
        sheet.write_string(0, 1, "Date").unwrap();
        workbook.save(&path).unwrap();

        let grid = ExcelParser.parse_to_grid(&path).unwrap();
        assert_eq!(grid.headers, vec!["Order ID", "Date"]);
        assert!(grid.has_no_data());
    }

    #[test]
    fn test_excel_empty_workbook_is_empty_sheet() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = xlsx_path(&dir);

        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        workbook.save(&path).unwrap();

        let result = ExcelParser.parse_to_grid(&path);
        assert!(matches!(result, Err(ImportError::EmptySheet(_))));
    }
}
