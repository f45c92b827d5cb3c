use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet, XlsxError};
use serde_json::Value;

use super::columns::{column_order, header_row};
use super::{ExportError, ExportObject};

/// Render `objects` as a single-sheet workbook ("Sheet1").
///
/// Numbers and booleans keep their cell type; nested values are written as
/// JSON text. An empty slice is rejected.
pub fn write_xlsx(objects: &[ExportObject]) -> Result<Vec<u8>, ExportError> {
    if objects.is_empty() {
        return Err(ExportError::Empty);
    }

    let columns = column_order(objects);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, label) in header_row(&columns).into_iter().enumerate() {
        sheet.write_string(0, col_num(col)?, label)?;
    }

    for (index, object) in objects.iter().enumerate() {
        let row = RowNum::try_from(index + 1).map_err(|_| ExportError::TooLarge)?;
        for (col, key) in columns.iter().enumerate() {
            if let Some(value) = object.get(*key) {
                write_cell(sheet, row, col_num(col)?, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn col_num(index: usize) -> Result<ColNum, ExportError> {
    ColNum::try_from(index).map_err(|_| ExportError::TooLarge)
}

fn write_cell(sheet: &mut Worksheet, row: RowNum, col: ColNum, value: &Value) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            sheet.write_string(row, col, s)?;
        }
        other => {
            sheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}
