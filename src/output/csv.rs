//! CSV rendering.

use serde_json::Value;

use super::table::stringify_cell;

/// Render records as CSV with a header row taken from the first record's
/// keys. Non-record payloads fall back to one value per line.
pub fn format_csv(data: &Value) -> String {
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
    let mut writer = csv::Writer::from_writer(Vec::new());
    if writer.write_record(headers.iter().map(|h| h.as_str())).is_err() {
        return String::new();
    }
    for row in &rows {
        let obj = row.as_object();
        let record: Vec<String> = headers
            .iter()
            .map(|header| stringify_cell(obj.and_then(|o| o.get(*header))))
            .collect();
        if writer.write_record(&record).is_err() {
            return String::new();
        }
    }

    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|out| out.trim_end_matches('\n').to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_csv_headers_and_rows() {
        let out = format_csv(&json!([
            { "id": "1", "name": "Acme, Inc" },
            { "id": "2", "name": "Bit" }
        ]));
        assert_eq!(out, "id,name\n1,\"Acme, Inc\"\n2,Bit");
    }

    #[test]
    fn test_format_csv_nested_values_serialize() {
        let out = format_csv(&json!([{ "id": "1", "tags": ["a"] }]));
        assert_eq!(out, "id,tags\n1,\"[\"\"a\"\"]\"");
    }

    #[test]
    fn test_format_csv_non_object_rows() {
        assert_eq!(format_csv(&json!(["x", "y"])), "x\ny");
    }
}
