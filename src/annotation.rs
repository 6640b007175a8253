//! Annotations produced by the model, and recovery of them from loosely
//! formatted replies.

use serde::{Deserialize, Deserializer, Serialize};

use crate::llm::client::GenerationError;

/// Highest rating the analyst prompt asks for.
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(deserialize_with = "lenient_rating")]
    pub rating: f64,
    pub description: String,
    pub tags: Vec<String>,
}

/// Shape accepted from the model before validation; every field optional.
#[derive(Debug, Default, Deserialize)]
struct RawAnnotation {
    rating: Option<RawRating>,
    description: Option<String>,
    tags: Option<Vec<serde_json::Value>>,
}

/// Models sometimes quote the number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRating {
    Number(f64),
    Text(String),
}

impl RawRating {
    fn value(&self) -> Option<f64> {
        match self {
            RawRating::Number(n) => Some(*n),
            RawRating::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Published caches store the model object as-is, quoted ratings included.
fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    RawRating::deserialize(deserializer)?
        .value()
        .ok_or_else(|| serde::de::Error::custom("rating is not a number"))
}

type Extractor = fn(&str) -> Option<&str>;

/// Candidate extractors, tried in order.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("whole reply", whole_text),
    ("json fence", json_fence),
    ("brace span", brace_span),
];

fn whole_text(text: &str) -> Option<&str> {
    Some(text.trim())
}

fn json_fence(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let end = text[start..].find("```")?;
    Some(text[start..start + end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Recover an [`Annotation`] from a model reply that may be bare JSON, JSON in
/// a fenced block surrounded by prose, or JSON embedded in a longer string.
///
/// A candidate that parses but fails validation falls through to the next
/// extractor; the last validation failure is reported if none succeeds.
pub fn parse_annotation(reply: &str) -> Result<Annotation, GenerationError> {
    let mut reason = "no JSON object found".to_string();

    for (label, extract) in EXTRACTORS {
        let Some(candidate) = extract(reply) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) else {
            continue;
        };
        if !value.is_object() {
            continue;
        }
        let Ok(raw) = serde_json::from_value::<RawAnnotation>(value) else {
            continue;
        };
        match validate(raw) {
            Ok(annotation) => {
                tracing::debug!("Annotation recovered from {}", label);
                return Ok(annotation);
            }
            Err(e) => {
                tracing::debug!("Candidate from {} rejected: {}", label, e);
                reason = e;
            }
        }
    }

    Err(GenerationError::InvalidAnnotation {
        reason,
        reply: reply.to_string(),
    })
}

fn validate(raw: RawAnnotation) -> Result<Annotation, String> {
    let rating = raw
        .rating
        .as_ref()
        .and_then(RawRating::value)
        .ok_or("missing rating")?;
    if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
        return Err(format!("rating {} out of range", rating));
    }

    let description = raw.description.unwrap_or_default().trim().to_string();
    if description.is_empty() {
        return Err("missing description".to_string());
    }

    let tags: Vec<String> = raw
        .tags
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tag| match tag {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|tag| !tag.is_empty())
        .collect();
    if tags.is_empty() {
        return Err("missing tags".to_string());
    }

    Ok(Annotation {
        rating,
        description,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str =
        r#"{"rating": 4.2, "description": "来自泰拉的感染者术师。", "tags": ["明日方舟", "术师"]}"#;

    fn expected() -> Annotation {
        Annotation {
            rating: 4.2,
            description: "来自泰拉的感染者术师。".to_string(),
            tags: vec!["明日方舟".to_string(), "术师".to_string()],
        }
    }

    #[test]
    fn test_parse_clean_object() {
        assert_eq!(parse_annotation(CLEAN).unwrap(), expected());
    }

    #[test]
    fn test_parse_fenced_block_with_prose() {
        let reply = format!(
            "好的，以下是分析报告：\n```json\n{}\n```\n希望对你有帮助。",
            CLEAN
        );
        assert_eq!(parse_annotation(&reply).unwrap(), expected());
    }

    #[test]
    fn test_parse_brace_span() {
        let reply = format!("Report: {} -- end of report", CLEAN);
        assert_eq!(parse_annotation(&reply).unwrap(), expected());
    }

    #[test]
    fn test_zero_rating_is_valid() {
        let reply = r#"{"rating": 0, "description": "d", "tags": ["t"]}"#;
        assert_eq!(parse_annotation(reply).unwrap().rating, 0.0);
    }

    #[test]
    fn test_string_rating_is_accepted() {
        let reply = r#"{"rating": "3.5", "description": "d", "tags": ["t"]}"#;
        assert_eq!(parse_annotation(reply).unwrap().rating, 3.5);
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let reply = r#"{"rating": 7, "description": "d", "tags": ["t"]}"#;
        let err = parse_annotation(reply).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_empty_fields_rejected() {
        for reply in [
            r#"{"description": "d", "tags": ["t"]}"#,
            r#"{"rating": 3, "description": "  ", "tags": ["t"]}"#,
            r#"{"rating": 3, "description": "d", "tags": []}"#,
            r#"{"rating": 3, "description": "d", "tags": ["", " "]}"#,
            r#"{}"#,
        ] {
            assert!(parse_annotation(reply).is_err(), "accepted: {}", reply);
        }
    }

    #[test]
    fn test_tags_are_trimmed_and_non_strings_dropped() {
        let reply = r#"{"rating": 2, "description": "d", "tags": [" 猫娘 ", 3, "萌"]}"#;
        assert_eq!(parse_annotation(reply).unwrap().tags, vec!["猫娘", "萌"]);
    }

    #[test]
    fn test_rejected_candidate_falls_through_to_next_extractor() {
        // the fenced block is an empty object; the surrounding object is complete
        let reply = format!(
            "报告：{}",
            CLEAN.replace('}', r#", "draft": "```json{}```"}"#)
        );
        assert_eq!(json_fence(&reply), Some("{}"));
        assert_eq!(parse_annotation(&reply).unwrap(), expected());
    }

    #[test]
    fn test_reports_last_rejection_reason() {
        let err = parse_annotation(r#"{"rating": 9, "description": "d", "tags": ["t"]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_no_json_at_all() {
        let err = parse_annotation("I cannot help with that.").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidAnnotation { .. }));
    }

    #[test]
    fn test_array_reply_is_not_an_object() {
        assert!(parse_annotation(r#"[1, 2, 3]"#).is_err());
    }
}
