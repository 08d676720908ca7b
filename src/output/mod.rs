//! Output rendering.
//!
//! Every command funnels its result through [`emit`]: compaction first
//! (unless verbose output was requested), then the selected format.

pub mod compact;
pub mod csv;
pub mod table;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub compact: bool,
    pub verbose: bool,
}

/// Render a payload to stdout.
pub fn emit(data: Value, options: &OutputOptions) {
    let payload = if options.verbose || !options.compact {
        data
    } else {
        compact::compact_data(data)
    };

    match options.format {
        OutputFormat::Csv => println!("{}", csv::format_csv(&payload)),
        OutputFormat::Table => println!("{}", table::format_table(&payload)),
        OutputFormat::Json => println!("{}", format_json(&payload)),
    }
}

pub fn format_json(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_json_pretty_prints() {
        assert_eq!(format_json(&json!({ "id": 1 })), "{\n  \"id\": 1\n}");
    }
}
