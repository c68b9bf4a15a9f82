//! Tolerant extraction of names from the list-valued source cells.
//!
//! Every function here returns an empty result instead of failing: the raw
//! data mixes encodings and one bad cell must not cost the rest of the build.

use super::literal::{parse_literal, Literal};

const TOP_CAST: usize = 5;
const DIRECTOR_JOB: &str = "Director";

/// Decodes a cell into a list literal, unwrapping one level of string quoting
fn decode_list(cell: &str) -> Option<Vec<Literal>> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "[]" {
        return None;
    }

    match parse_literal(cell)? {
        Literal::List(items) => Some(items),
        // Double-encoded: the cell is a quoted string whose content is the list
        Literal::Str(inner) => match parse_literal(&inner)? {
            Literal::List(items) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn name_of(entry: &Literal) -> Option<String> {
    entry.get("name").and_then(Literal::as_str).map(str::to_string)
}

/// Extracts the `name` of each `{id, name}` entry in a genres or keywords cell
pub fn parse_named_list(cell: &str) -> Vec<String> {
    decode_list(cell)
        .map(|items| items.iter().filter_map(name_of).collect())
        .unwrap_or_default()
}

/// First five cast members in billing order
pub fn extract_cast(cell: &str) -> Vec<String> {
    decode_list(cell)
        .map(|items| items.iter().take(TOP_CAST).filter_map(name_of).collect())
        .unwrap_or_default()
}

/// First crew member credited with the `Director` job
pub fn extract_director(cell: &str) -> Option<String> {
    decode_list(cell)?
        .iter()
        .find(|entry| entry.get("job").and_then(Literal::as_str) == Some(DIRECTOR_JOB))
        .and_then(name_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_list_single_encoded() {
        assert_eq!(
            parse_named_list("[{'id': 28, 'name': 'Action'}]"),
            vec!["Action".to_string()]
        );
    }

    #[test]
    fn test_parse_named_list_keeps_source_order() {
        assert_eq!(
            parse_named_list("[{'id': 35, 'name': 'Comedy'}, {'id': 18, 'name': 'Drama'}, {'id': 10749, 'name': 'Romance'}]"),
            vec!["Comedy", "Drama", "Romance"]
        );
    }

    #[test]
    fn test_parse_named_list_double_encoded() {
        assert_eq!(
            parse_named_list(r#""[{'id': 16, 'name': 'Animation'}, {'id': 35, 'name': 'Comedy'}]""#),
            vec!["Animation", "Comedy"]
        );
    }

    #[test]
    fn test_parse_named_list_skips_entries_without_name() {
        assert_eq!(
            parse_named_list("[{'id': 1}, {'id': 2, 'name': 'heist'}, 'loose']"),
            vec!["heist"]
        );
    }

    #[test]
    fn test_parse_named_list_degrades_to_empty() {
        for cell in ["", "[]", "   ", "not a list", "[{'id': 28, 'name': 'Action'", "{'name': 'Action'}", "\"plain text\""] {
            assert!(parse_named_list(cell).is_empty(), "cell: {cell}");
        }
    }

    #[test]
    fn test_extract_cast_takes_first_five() {
        let cell = "[{'name': 'A'}, {'name': 'B'}, {'name': 'C'}, {'name': 'D'}, {'name': 'E'}, {'name': 'F'}]";
        assert_eq!(extract_cast(cell), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_extract_cast_malformed() {
        assert!(extract_cast("[{'name': ").is_empty());
    }

    #[test]
    fn test_extract_director() {
        let cell = r#"[{"name": "A", "job": "Director"}, {"name": "B", "job": "Producer"}]"#;
        assert_eq!(extract_director(cell), Some("A".to_string()));
    }

    #[test]
    fn test_extract_director_first_of_many() {
        let cell = "[{'name': 'Writer', 'job': 'Screenplay'}, {'name': 'Lana', 'job': 'Director'}, {'name': 'Lilly', 'job': 'Director'}]";
        assert_eq!(extract_director(cell), Some("Lana".to_string()));
    }

    #[test]
    fn test_extract_director_none() {
        assert_eq!(extract_director("[{'name': 'B', 'job': 'Producer'}]"), None);
        assert_eq!(extract_director(""), None);
        assert_eq!(extract_director("garbage"), None);
    }
}
