//! Note content previews.

use serde_json::Value;

use crate::record::RawRecord;

/// Collapse whitespace and cut to `max_chars`, appending an ellipsis when
/// something was dropped. Non-strings render empty.
pub fn truncate_text(value: Option<&Value>, max_chars: usize) -> String {
    let Some(Value::String(text)) = value else {
        return String::new();
    };
    let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= max_chars {
        return compact;
    }
    if max_chars <= 3 {
        return compact.chars().take(max_chars).collect();
    }
    let kept: String = compact.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

/// Replace each note's `content` with a truncated preview; notes without a
/// string `content` pass through unchanged.
pub fn with_truncated_note_content(notes: Vec<RawRecord>, max_chars: usize) -> Vec<RawRecord> {
    notes
        .into_iter()
        .map(|note| {
            if !matches!(note.get("content"), Some(Value::String(_))) {
                return note;
            }
            let preview = truncate_text(note.get("content"), max_chars);
            let mut out = note;
            out.insert("content".to_string(), Value::String(preview));
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_text_collapses_whitespace() {
        let value = json!("a  b\n\tc");
        assert_eq!(truncate_text(Some(&value), 10), "a b c");
    }

    #[test]
    fn test_truncate_text_appends_ellipsis() {
        let value = json!("abcdefghij");
        assert_eq!(truncate_text(Some(&value), 8), "abcde...");
        assert_eq!(truncate_text(Some(&value), 2), "ab");
        assert_eq!(truncate_text(Some(&value), 10), "abcdefghij");
    }

    #[test]
    fn test_truncate_text_non_string_is_empty() {
        assert_eq!(truncate_text(Some(&json!(42)), 10), "");
        assert_eq!(truncate_text(None, 10), "");
    }

    #[test]
    fn test_with_truncated_note_content() {
        let notes = vec![
            json!({ "id": "1", "content": "word ".repeat(100) })
                .as_object()
                .cloned()
                .unwrap(),
            json!({ "id": "2" }).as_object().cloned().unwrap(),
        ];
        let truncated = with_truncated_note_content(notes, 20);
        let preview = truncated[0].get("content").and_then(Value::as_str).unwrap();
        assert_eq!(preview.chars().count(), 20);
        assert!(preview.ends_with("..."));
        assert!(truncated[1].get("content").is_none());
    }
}
