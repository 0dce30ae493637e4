//! Grouping and scoring primitives over raw survey records.
//!
//! Every function here tolerates malformed input by exclusion or by the
//! `unspecified` bucket, never by failing. An empty corpus degrades to
//! zeros and empty maps.

use indexmap::IndexMap;
use serde_json::Value;

use crate::model::{Response, UNSPECIFIED};

use super::schema::RatingField;

/// Ordinal satisfaction scale, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatisfactionLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl SatisfactionLevel {
    pub const ALL: [SatisfactionLevel; 5] = [
        SatisfactionLevel::VeryHigh,
        SatisfactionLevel::High,
        SatisfactionLevel::Medium,
        SatisfactionLevel::Low,
        SatisfactionLevel::VeryLow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SatisfactionLevel::VeryHigh => "very high",
            SatisfactionLevel::High => "high",
            SatisfactionLevel::Medium => "medium",
            SatisfactionLevel::Low => "low",
            SatisfactionLevel::VeryLow => "very low",
        }
    }

    /// Ordinal score, 1 (very low) through 5 (very high).
    pub fn score(self) -> u8 {
        match self {
            SatisfactionLevel::VeryHigh => 5,
            SatisfactionLevel::High => 4,
            SatisfactionLevel::Medium => 3,
            SatisfactionLevel::Low => 2,
            SatisfactionLevel::VeryLow => 1,
        }
    }

    /// Recognizes the ordinal vocabulary plus the grade-style labels some
    /// questionnaire revisions used, folded onto the same five buckets.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "very high" | "excellent" => Some(SatisfactionLevel::VeryHigh),
            "high" | "very good" => Some(SatisfactionLevel::High),
            "medium" | "good" | "average" => Some(SatisfactionLevel::Medium),
            "low" | "acceptable" | "fair" => Some(SatisfactionLevel::Low),
            "very low" | "poor" | "weak" => Some(SatisfactionLevel::VeryLow),
            _ => None,
        }
    }

    /// Maps a raw numeric answer onto the nearest ordinal bucket.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            SatisfactionLevel::VeryHigh
        } else if score >= 3.5 {
            SatisfactionLevel::High
        } else if score >= 2.5 {
            SatisfactionLevel::Medium
        } else if score >= 1.5 {
            SatisfactionLevel::Low
        } else {
            SatisfactionLevel::VeryLow
        }
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Counts responses per distinct display value of `field`. Missing, null,
/// and blank values share the single `unspecified` bucket. Key order is
/// first occurrence.
pub fn group_by_field(responses: &[Response], field: &str) -> IndexMap<String, u64> {
    let mut counts = IndexMap::new();
    for response in responses {
        let bucket = response
            .field(field)
            .and_then(display_value)
            .unwrap_or_else(|| UNSPECIFIED.to_string());
        *counts.entry(bucket).or_insert(0) += 1;
    }
    counts
}

/// Percentage of completed responses, one decimal. An empty corpus is 0 by
/// policy, not an error.
pub fn completion_rate(responses: &[Response]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let completed = responses.iter().filter(|r| r.is_completed()).count();
    round1(completed as f64 / responses.len() as f64 * 100.0)
}

/// Mean completion time in minutes, one decimal. Entries that fail to parse
/// or are not positive are unknown and excluded from both sides of the
/// division. No valid entries yields 0.
pub fn average_completion_time(responses: &[Response]) -> f64 {
    let minutes: Vec<f64> = responses
        .iter()
        .filter_map(|r| parse_minutes(&r.completion_time))
        .filter(|&m| m > 0.0)
        .collect();
    if minutes.is_empty() {
        return 0.0;
    }
    round1(minutes.iter().sum::<f64>() / minutes.len() as f64)
}

/// Mean 1-5 rating per configured field, two decimals, sorted descending.
/// Ties keep schema order. Fields with no positive rating anywhere are
/// omitted entirely rather than reported as zero.
pub fn rank_features(responses: &[Response], fields: &[RatingField]) -> IndexMap<String, f64> {
    let mut means: Vec<(&str, f64)> = Vec::new();
    for rating_field in fields {
        let mut sum = 0i64;
        let mut count = 0u64;
        for response in responses {
            if let Some(rating) = response.field(&rating_field.field).and_then(parse_rating) {
                if rating > 0 {
                    sum += rating;
                    count += 1;
                }
            }
        }
        if count > 0 {
            means.push((rating_field.label.as_str(), round2(sum as f64 / count as f64)));
        }
    }
    // stable sort keeps schema order for equal means
    means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    means
        .into_iter()
        .map(|(label, mean)| (label.to_string(), mean))
        .collect()
}

/// Tally of responses per ordinal satisfaction bucket. The output is dense:
/// all five buckets are present even when zero.
pub fn satisfaction_levels(responses: &[Response], fields: &[String]) -> IndexMap<String, u64> {
    let mut counts: IndexMap<String, u64> = SatisfactionLevel::ALL
        .iter()
        .map(|level| (level.label().to_string(), 0))
        .collect();
    for response in responses {
        if let Some(level) = classify_satisfaction(response, fields) {
            *counts.entry(level.label().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// The first configured field holding a recognized label or a number decides
/// the response's bucket. Unrecognized values fall through to later fields.
pub fn classify_satisfaction(response: &Response, fields: &[String]) -> Option<SatisfactionLevel> {
    for field in fields {
        match response.field(field) {
            Some(Value::String(label)) => {
                if let Some(level) = SatisfactionLevel::from_label(label) {
                    return Some(level);
                }
            }
            Some(Value::Number(number)) => {
                if let Some(score) = number.as_f64() {
                    return Some(SatisfactionLevel::from_score(score));
                }
            }
            _ => {}
        }
    }
    None
}

/// Numeric satisfaction for averaging: raw value for numeric answers, the
/// ordinal score for label answers.
pub fn satisfaction_score(response: &Response, fields: &[String]) -> Option<f64> {
    for field in fields {
        match response.field(field) {
            Some(Value::String(label)) => {
                if let Some(level) = SatisfactionLevel::from_label(label) {
                    return Some(level.score() as f64);
                }
            }
            Some(Value::Number(number)) => {
                if let Some(score) = number.as_f64() {
                    return Some(score);
                }
            }
            _ => {}
        }
    }
    None
}

fn display_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

fn parse_minutes(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(minutes) = s.parse::<f64>() {
                return Some(minutes);
            }
            // tolerate unit suffixes like "15 minutes"
            let prefix: String = s
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            prefix.parse::<f64>().ok()
        }
        _ => None,
    }
}

fn parse_rating(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(rating) = s.parse::<i64>() {
                return Some(rating);
            }
            let prefix: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            prefix.parse::<i64>().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn response(answers: Value) -> Response {
        let Value::Object(mut answers) = answers else {
            panic!("expected an object");
        };
        let completion_time = answers.remove("completionTime").unwrap_or(Value::Null);
        Response {
            id: 1,
            submitted_at: Utc::now(),
            origin: "test".to_string(),
            completion_time,
            submitted: false,
            answers,
        }
    }

    fn submitted(answers: Value) -> Response {
        let mut r = response(answers);
        r.submitted = true;
        r
    }

    #[test]
    fn group_counts_sum_to_input_length() {
        let responses = vec![
            response(json!({"major": "CS"})),
            response(json!({"major": "Math"})),
            response(json!({"major": "CS"})),
            response(json!({})),
        ];
        let counts = group_by_field(&responses, "major");
        assert_eq!(counts.values().sum::<u64>(), responses.len() as u64);
        assert_eq!(counts["CS"], 2);
        assert_eq!(counts["Math"], 1);
        assert_eq!(counts[UNSPECIFIED], 1);
    }

    #[test]
    fn absent_field_yields_single_unspecified_bucket() {
        let responses = vec![
            response(json!({"major": "CS"})),
            response(json!({"major": "Math"})),
        ];
        let counts = group_by_field(&responses, "no-such-field");
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[UNSPECIFIED], 2);
    }

    #[test]
    fn blank_and_null_values_are_unspecified() {
        let responses = vec![
            response(json!({"major": ""})),
            response(json!({"major": null})),
            response(json!({"major": "  "})),
        ];
        let counts = group_by_field(&responses, "major");
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[UNSPECIFIED], 3);
    }

    #[test]
    fn list_answers_group_as_joined_text() {
        let responses = vec![response(json!({"devices": ["laptop", "phone"]}))];
        let counts = group_by_field(&responses, "devices");
        assert_eq!(counts["laptop, phone"], 1);
    }

    #[test]
    fn grouping_empty_input_is_empty() {
        assert!(group_by_field(&[], "major").is_empty());
    }

    #[test]
    fn completion_rate_of_empty_corpus_is_zero() {
        assert_eq!(completion_rate(&[]), 0.0);
    }

    #[test]
    fn completion_rate_all_completed() {
        let responses = vec![submitted(json!({})), submitted(json!({}))];
        assert_eq!(completion_rate(&responses), 100.0);
    }

    #[test]
    fn completion_rate_half_completed() {
        let responses = vec![submitted(json!({})), response(json!({}))];
        assert_eq!(completion_rate(&responses), 50.0);
    }

    #[test]
    fn completed_answer_counts_without_server_flag() {
        let responses = vec![response(json!({"completed": true}))];
        assert_eq!(completion_rate(&responses), 100.0);
    }

    #[test]
    fn average_time_excludes_zero_and_unparseable() {
        let responses = vec![
            response(json!({"completionTime": 10})),
            response(json!({"completionTime": 0})),
            response(json!({"completionTime": "bad"})),
            response(json!({"completionTime": 30})),
        ];
        assert_eq!(average_completion_time(&responses), 20.0);
    }

    #[test]
    fn average_time_parses_unit_suffix() {
        let responses = vec![response(json!({"completionTime": "15 minutes"}))];
        assert_eq!(average_completion_time(&responses), 15.0);
    }

    #[test]
    fn average_time_without_valid_entries_is_zero() {
        let responses = vec![response(json!({"completionTime": "soon"}))];
        assert_eq!(average_completion_time(&responses), 0.0);
        assert_eq!(average_completion_time(&[]), 0.0);
    }

    fn rating_fields() -> Vec<RatingField> {
        vec![
            RatingField::new("featureExams", "Online exams"),
            RatingField::new("featureGrades", "Grade tracking"),
        ]
    }

    #[test]
    fn feature_mean_is_rounded_to_two_decimals() {
        let responses = vec![
            response(json!({"featureExams": 4})),
            response(json!({"featureExams": 5})),
        ];
        let rankings = rank_features(&responses, &rating_fields());
        assert_eq!(rankings["Online exams"], 4.5);
        assert_eq!(rankings.len(), 1);
    }

    #[test]
    fn field_with_only_invalid_ratings_is_omitted() {
        let responses = vec![
            response(json!({"featureExams": 4, "featureGrades": 0})),
            response(json!({"featureGrades": "n/a"})),
        ];
        let rankings = rank_features(&responses, &rating_fields());
        assert!(rankings.contains_key("Online exams"));
        assert!(!rankings.contains_key("Grade tracking"));
    }

    #[test]
    fn rankings_sort_descending_with_schema_order_ties() {
        let fields = vec![
            RatingField::new("a", "A"),
            RatingField::new("b", "B"),
            RatingField::new("c", "C"),
        ];
        let responses = vec![response(json!({"a": 3, "b": 5, "c": 3}))];
        let rankings = rank_features(&responses, &fields);
        let labels: Vec<&str> = rankings.keys().map(String::as_str).collect();
        assert_eq!(labels, ["B", "A", "C"]);
    }

    #[test]
    fn string_ratings_parse() {
        let responses = vec![response(json!({"featureExams": "4"}))];
        let rankings = rank_features(&responses, &rating_fields());
        assert_eq!(rankings["Online exams"], 4.0);
    }

    #[test]
    fn numeric_satisfaction_maps_to_thresholds() {
        assert_eq!(SatisfactionLevel::from_score(4.7), SatisfactionLevel::VeryHigh);
        assert_eq!(SatisfactionLevel::from_score(4.5), SatisfactionLevel::VeryHigh);
        assert_eq!(SatisfactionLevel::from_score(3.0), SatisfactionLevel::Medium);
        assert_eq!(SatisfactionLevel::from_score(2.5), SatisfactionLevel::Medium);
        assert_eq!(SatisfactionLevel::from_score(2.49), SatisfactionLevel::Low);
        assert_eq!(SatisfactionLevel::from_score(1.5), SatisfactionLevel::Low);
        assert_eq!(SatisfactionLevel::from_score(1.0), SatisfactionLevel::VeryLow);
    }

    #[test]
    fn grade_labels_fold_onto_ordinal_buckets() {
        assert_eq!(
            SatisfactionLevel::from_label("Excellent"),
            Some(SatisfactionLevel::VeryHigh)
        );
        assert_eq!(
            SatisfactionLevel::from_label(" very low "),
            Some(SatisfactionLevel::VeryLow)
        );
        assert_eq!(SatisfactionLevel::from_label("meh"), None);
    }

    fn satisfaction_fields() -> Vec<String> {
        vec!["satisfactionLevel".to_string()]
    }

    #[test]
    fn satisfaction_output_is_dense() {
        let counts = satisfaction_levels(&[], &satisfaction_fields());
        assert_eq!(counts.len(), 5);
        assert!(counts.values().all(|&count| count == 0));
    }

    #[test]
    fn satisfaction_counts_labels_and_numbers() {
        let responses = vec![
            response(json!({"satisfactionLevel": "high"})),
            response(json!({"satisfactionLevel": 4.7})),
            response(json!({"satisfactionLevel": "not a label"})),
        ];
        let counts = satisfaction_levels(&responses, &satisfaction_fields());
        assert_eq!(counts["high"], 1);
        assert_eq!(counts["very high"], 1);
        assert_eq!(counts.values().sum::<u64>(), 2);
    }

    #[test]
    fn satisfaction_score_prefers_first_recognized_field() {
        let fields = vec![
            "satisfactionLevel".to_string(),
            "overallSatisfaction".to_string(),
        ];
        let r = response(json!({"overallSatisfaction": 2.0}));
        assert_eq!(satisfaction_score(&r, &fields), Some(2.0));
        let r = response(json!({"satisfactionLevel": "high", "overallSatisfaction": 1.0}));
        assert_eq!(satisfaction_score(&r, &fields), Some(4.0));
    }
}
