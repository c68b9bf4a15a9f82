use crate::models::{PreferenceProfile, ProfileParse};

const LEAD_IN: &str = "Recommend movies that match ";
const SEPARATOR: &str = ", ";

/// Renders a preference profile as a natural-language search query
///
/// Clauses appear in a fixed order (genres, tone, decade, people, other
/// preferences) and only when their list is non-empty. The lead-in is
/// always present, even when no clause survives.
pub fn format_query(profile: &PreferenceProfile) -> String {
    let clauses: Vec<String> = [
        ("genres: ", &profile.genres),
        ("tone: ", &profile.tone),
        ("from the ", &profile.decade),
        ("involving ", &profile.people),
        ("themes: ", &profile.other_preferences),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .map(|(prefix, values)| format!("{}{}", prefix, values.join(SEPARATOR)))
    .collect();

    format!("{}{}", LEAD_IN, clauses.join(SEPARATOR))
}

/// Query for a parsed-or-fallback profile
pub fn query_for(parsed: &ProfileParse) -> String {
    match parsed {
        ProfileParse::Parsed(profile) => format_query(profile),
        ProfileParse::Fallback(query) => query.to_string(),
    }
}

/// Builds the search query straight from raw profiler output
pub fn build_search_prompt(raw: &str) -> String {
    query_for(&PreferenceProfile::parse(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FALLBACK_QUERY;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_full_profile_clause_order() {
        let raw = r#"{"genres":["romance","comedy"],"tone":["light-hearted"],"decade":["2000s"],"people":[],"other_preferences":["feel-good"]}"#;
        assert_eq!(
            build_search_prompt(raw),
            "Recommend movies that match genres: romance, comedy, tone: light-hearted, from the 2000s, themes: feel-good"
        );
    }

    #[test]
    fn test_key_order_in_input_does_not_matter() {
        let a = r#"{"people":["Tom Hanks"],"genres":["drama"]}"#;
        let b = r#"{"genres":["drama"],"people":["Tom Hanks"]}"#;
        assert_eq!(build_search_prompt(a), build_search_prompt(b));
        assert_eq!(
            build_search_prompt(a),
            "Recommend movies that match genres: drama, involving Tom Hanks"
        );
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let profile = PreferenceProfile {
            genres: strings(&["thriller"]),
            decade: strings(&["1990s", "2000s"]),
            ..Default::default()
        };
        let first = format_query(&profile);
        for _ in 0..10 {
            assert_eq!(format_query(&profile), first);
        }
        assert_eq!(first, "Recommend movies that match genres: thriller, from the 1990s, 2000s");
    }

    #[test]
    fn test_malformed_input_falls_back() {
        for raw in ["not json", "", "[1, 2, 3]", "\"text\"", r#"{"genres": {"a": 1}}"#] {
            assert_eq!(build_search_prompt(raw), FALLBACK_QUERY, "input: {raw}");
        }
    }

    #[test]
    fn test_empty_profile_keeps_lead_in() {
        let empty = r#"{"genres":[],"tone":[],"decade":[],"people":[],"other_preferences":[]}"#;
        assert_eq!(build_search_prompt(empty), "Recommend movies that match ");
        assert_eq!(build_search_prompt("{}"), "Recommend movies that match ");
        assert_eq!(format_query(&PreferenceProfile::default()), LEAD_IN);
    }

    #[test]
    fn test_fenced_profile() {
        let raw = "```json\n{\"genres\": [\"horror\"]}\n```";
        assert_eq!(build_search_prompt(raw), "Recommend movies that match genres: horror");
    }
}
