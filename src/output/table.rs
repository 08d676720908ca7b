//! Width-aligned text tables.
//!
//! Headers come from the first record's keys; every row renders those keys
//! in order. Non-record payloads fall back to one stringified value per
//! line.

use serde_json::Value;

pub fn stringify_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(_)) | Some(Value::Array(_)) => {
            value.map(|v| v.to_string()).unwrap_or_default()
        }
        Some(other) => other.to_string(),
    }
}

pub fn format_table(data: &Value) -> String {
    let rows: Vec<&Value> = match data {
        Value::Array(entries) => entries.iter().collect(),
        other => vec![other],
    };
    if rows.is_empty() {
        return String::new();
    }

    let Some(Value::Object(first)) = rows.first().copied() else {
        return rows
            .iter()
            .map(|row| stringify_cell(Some(row)))
            .collect::<Vec<_>>()
            .join("\n");
    };

    let headers: Vec<&String> = first.keys().collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in &rows {
        let obj = row.as_object();
        cells.push(
            headers
                .iter()
                .map(|header| stringify_cell(obj.and_then(|o| o.get(*header))))
                .collect(),
        );
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let render_row = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(
        &headers.iter().map(|h| (*h).clone()).collect::<Vec<_>>(),
    ));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &cells {
        lines.push(render_row(row));
    }
    lines.join("\n")
}
