use serde_json::Value;

use crate::detection::domain::segmentation::SegmentationRequest;
use crate::query::domain::query_collaborators::SearchClassification;

/// Key holding the object list in the combined structured response.
pub const SEARCH_OBJECTS_KEY: &str = "search_objects";

/// Reads a classifier's raw text as an object list.
///
/// Accepts a JSON array of strings, or a JSON object whose
/// `search_objects` key holds one, optionally wrapped in a Markdown code
/// fence. Names come back trimmed, lower-cased and de-duplicated in
/// order. Anything else is reported as malformed with an empty list.
pub fn parse_search_response(raw: &str) -> SearchClassification {
    let body = strip_code_fence(raw);
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return SearchClassification::malformed(raw);
    };

    let list = match &value {
        Value::Array(items) => Some(items),
        Value::Object(map) => match map.get(SEARCH_OBJECTS_KEY) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    };
    let Some(items) = list else {
        return SearchClassification::malformed(raw);
    };

    let names: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    match names {
        Some(names) => SearchClassification {
            is_list: true,
            object_names: SegmentationRequest::new(names).class_names().to_vec(),
            raw_text: raw.to_string(),
        },
        None => SearchClassification::malformed(raw),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bare_array(r#"["keys", "phone"]"#, &["keys", "phone"])]
    #[case::empty_array("[]", &[])]
    #[case::structured(r#"{"response": "Sure.", "search_objects": ["Cup"]}"#, &["cup"])]
    #[case::fenced("```json\n[\"bottle\"]\n```", &["bottle"])]
    #[case::fenced_no_lang("```\n{\"search_objects\": []}\n```", &[])]
    #[case::normalized(r#"[" Keys ", "keys", ""]"#, &["keys"])]
    fn test_parses_lists(#[case] raw: &str, #[case] expected: &[&str]) {
        let parsed = parse_search_response(raw);
        assert!(parsed.is_list);
        assert_eq!(parsed.object_names, expected);
        assert_eq!(parsed.raw_text, raw);
    }

    #[rstest]
    #[case::prose("I think you are looking for your keys.")]
    #[case::string(r#""keys""#)]
    #[case::object_without_key(r#"{"response": "hello"}"#)]
    #[case::non_string_items("[1, 2]")]
    #[case::key_not_list(r#"{"search_objects": "keys"}"#)]
    #[case::truncated(r#"["keys", "pho"#)]
    fn test_malformed_yields_empty_list(#[case] raw: &str) {
        let parsed = parse_search_response(raw);
        assert!(!parsed.is_list);
        assert!(parsed.object_names.is_empty());
        assert_eq!(parsed.raw_text, raw);
    }
}
