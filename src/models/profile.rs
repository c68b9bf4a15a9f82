use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Query used whenever a profile cannot be interpreted
pub const FALLBACK_QUERY: &str = "movies similar to the user's tastes";

/// Structured movie preferences produced by the upstream profiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    #[serde(default, deserialize_with = "string_list")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub tone: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub decade: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub people: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub other_preferences: Vec<String>,
}

/// Outcome of interpreting raw profile text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileParse {
    Parsed(PreferenceProfile),
    /// The input was not a usable profile; carries the query to search with instead
    Fallback(&'static str),
}

impl PreferenceProfile {
    /// Interprets profiler output, tolerating Markdown code fences around the JSON
    pub fn parse(raw: &str) -> ProfileParse {
        let cleaned = strip_code_fences(raw);

        let value: Value = match serde_json::from_str(cleaned) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Profile is not valid JSON");
                return ProfileParse::Fallback(FALLBACK_QUERY);
            }
        };

        Self::from_value(value)
    }

    /// Interprets an already-decoded JSON value; anything but an object falls back
    pub fn from_value(value: Value) -> ProfileParse {
        if !value.is_object() {
            tracing::debug!("Profile JSON is not an object");
            return ProfileParse::Fallback(FALLBACK_QUERY);
        }

        match serde_json::from_value::<PreferenceProfile>(value) {
            Ok(profile) => ProfileParse::Parsed(profile),
            Err(e) => {
                tracing::debug!(error = %e, "Profile has malformed fields");
                ProfileParse::Fallback(FALLBACK_QUERY)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.tone.is_empty()
            && self.decade.is_empty()
            && self.people.is_empty()
            && self.other_preferences.is_empty()
    }
}

/// Removes a surrounding ```json ... ``` fence if present
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Accepts a list of strings, a single string, or null
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s]),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(Ok(s)),
                Value::Number(n) => Some(Ok(n.to_string())),
                other => Some(Err(D::Error::custom(format!(
                    "expected a string, found {}",
                    other
                )))),
            })
            .collect(),
        Some(other) => Err(D::Error::custom(format!(
            "expected a list of strings, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> PreferenceProfile {
        match PreferenceProfile::parse(raw) {
            ProfileParse::Parsed(profile) => profile,
            ProfileParse::Fallback(_) => panic!("expected {raw} to parse"),
        }
    }

    #[test]
    fn test_parse_full_profile() {
        let profile = parsed(
            r#"{"genres":["romance","comedy"],"tone":["light-hearted"],"decade":["2000s"],"people":[],"other_preferences":["feel-good"]}"#,
        );
        assert_eq!(profile.genres, vec!["romance", "comedy"]);
        assert_eq!(profile.tone, vec!["light-hearted"]);
        assert!(profile.people.is_empty());
    }

    #[test]
    fn test_parse_missing_and_null_keys_default_to_empty() {
        let profile = parsed(r#"{"genres": ["horror"], "tone": null}"#);
        assert_eq!(profile.genres, vec!["horror"]);
        assert!(profile.tone.is_empty());
        assert!(profile.decade.is_empty());
    }

    #[test]
    fn test_parse_single_string_value() {
        let profile = parsed(r#"{"people": "Robin Williams"}"#);
        assert_eq!(profile.people, vec!["Robin Williams"]);
    }

    #[test]
    fn test_parse_strips_markdown_fences() {
        let profile = parsed("```json\n{\"decade\": [\"1990s\"]}\n```");
        assert_eq!(profile.decade, vec!["1990s"]);
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let profile = parsed(r#"{"genres": ["drama"], "mood_score": 3}"#);
        assert_eq!(profile.genres, vec!["drama"]);
    }

    #[test]
    fn test_malformed_inputs_fall_back() {
        for raw in [
            "",
            "not json at all",
            "{\"genres\": [",
            "[\"comedy\"]",
            "42",
            r#"{"genres": {"name": "comedy"}}"#,
            r#"{"tone": [["nested"]]}"#,
        ] {
            assert_eq!(
                PreferenceProfile::parse(raw),
                ProfileParse::Fallback(FALLBACK_QUERY),
                "input: {raw}"
            );
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(PreferenceProfile::default().is_empty());
        assert!(!parsed(r#"{"tone": ["dark"]}"#).is_empty());
    }
}
