//! Spreadsheet to CSV conversion.
//!
//! Only the first sheet is converted. Every cell is rendered as text:
//! integral floats lose their `.0`, date cells become ISO dates and
//! trailing rows with no content are dropped.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::NaiveTime;

use crate::error::ExtractionError;

/// Renders a single cell as CSV text.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => number_to_string(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty | Data::Error(_) => String::new(),
        Data::DateTime(value) => excel_datetime_to_string(value),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn number_to_string(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// `YYYY-MM-DD`, with ` HH:MM:SS` only when the cell carries a time of day.
/// Durations and out-of-range serials keep their numeric value.
fn excel_datetime_to_string(value: &ExcelDateTime) -> String {
    match value.as_datetime() {
        Some(datetime) if value.is_datetime() => {
            if datetime.time() == NaiveTime::MIN {
                datetime.format("%Y-%m-%d").to_string()
            } else {
                datetime.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
        _ => number_to_string(value.as_f64()),
    }
}

/// Decodes an xls/xlsx payload and renders its first sheet as CSV bytes.
pub fn first_sheet_to_csv(bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ExtractionError::MalformedWorkbook(format!("Unable to read workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractionError::MalformedWorkbook("Workbook has no sheets".to_string()))?
        .map_err(|e| {
            ExtractionError::MalformedWorkbook(format!("Unable to read first sheet: {}", e))
        })?;

    let mut rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    while rows
        .last()
        .is_some_and(|row| row.iter().all(|cell| cell.is_empty()))
    {
        rows.pop();
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|e| ExtractionError::MalformedWorkbook(format!("CSV write failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExtractionError::MalformedWorkbook(format!("CSV flush failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;
    use rust_xlsxwriter::{ExcelDateTime as XlsxDateTime, Format, Workbook};

    fn xlsx_fixture() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Codigo").unwrap();
        sheet.write_string(0, 1, "Descripcion").unwrap();
        sheet.write_string(0, 2, "Precio").unwrap();
        sheet.write_number(1, 0, 7791.0).unwrap();
        sheet.write_string(1, 1, " Shampoo, 400ml ").unwrap();
        sheet.write_number(1, 2, 12.5).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_renders_first_sheet_as_csv() {
        let csv = first_sheet_to_csv(&xlsx_fixture()).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert_eq!(
            text,
            "Codigo,Descripcion,Precio\n7791,\"Shampoo, 400ml\",12.5\n"
        );
    }

    #[test]
    fn test_date_cells_render_as_iso_dates() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        sheet.write_string(0, 0, "Desde").unwrap();
        sheet.write_string(0, 1, "Hasta").unwrap();
        sheet
            .write_datetime_with_format(1, 0, &XlsxDateTime::from_ymd(2024, 3, 1).unwrap(), &date)
            .unwrap();
        sheet
            .write_datetime_with_format(
                1,
                1,
                &XlsxDateTime::from_ymd(2024, 3, 31)
                    .unwrap()
                    .and_hms(18, 30, 0)
                    .unwrap(),
                &stamp,
            )
            .unwrap();

        let csv = first_sheet_to_csv(&workbook.save_to_buffer().unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "Desde,Hasta\n2024-03-01,2024-03-31 18:30:00\n"
        );
    }

    #[test]
    fn test_durations_keep_their_serial_value() {
        let duration = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(cell_to_string(&Data::DateTime(duration)), "1.5");

        let date = ExcelDateTime::new(45292.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_to_string(&Data::DateTime(date)), "2024-01-01");
    }

    #[test]
    fn test_garbage_bytes_are_a_malformed_workbook() {
        let err = first_sheet_to_csv(b"definitely not a spreadsheet").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedWorkbook(_)));
    }

    #[test]
    fn test_integral_floats_drop_fraction() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(3.25)), "3.25");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }
}
