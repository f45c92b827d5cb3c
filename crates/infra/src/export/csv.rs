use std::io::Write;

use serde_json::Value;

use super::columns::{column_order, header_row};
use super::{ExportError, ExportObject};

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write `objects` as CSV. An empty slice produces no output at all.
pub fn write_csv<W: Write>(objects: &[ExportObject], writer: W) -> Result<(), ExportError> {
    if objects.is_empty() {
        return Ok(());
    }

    let columns = column_order(objects);
    let mut out = ::csv::Writer::from_writer(writer);

    out.write_record(header_row(&columns))?;
    for object in objects {
        out.write_record(columns.iter().map(|c| cell(object.get(*c))))?;
    }
    out.flush()?;
    Ok(())
}
