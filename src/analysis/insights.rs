//! Natural-language observations derived from the corpus. Output is fully
//! determined by the two collections; identical input produces identical
//! text.

use crate::model::Response;

use super::schema::AnalysisSchema;
use super::stats::{group_by_field, round2, satisfaction_score};

pub const NO_DATA: &str = "Awaiting the first survey submissions";

pub fn generate(
    students: &[Response],
    professors: &[Response],
    schema: &AnalysisSchema,
) -> Vec<String> {
    if students.is_empty() && professors.is_empty() {
        return vec![NO_DATA.to_string()];
    }

    let mut insights = Vec::new();

    if !students.is_empty() {
        insights.push(format!("Participating students: {}", students.len()));
        if let Some((major, count)) = most_frequent(students, &schema.major_field) {
            insights.push(format!("Most represented major: {major} ({count} students)"));
        }
    }

    if !professors.is_empty() {
        insights.push(format!("Participating professors: {}", professors.len()));
        if let Some((department, count)) = most_frequent(professors, &schema.department_field) {
            insights.push(format!(
                "Most represented department: {department} ({count} professors)"
            ));
        }
    }

    if let (Some(student_mean), Some(professor_mean)) = (
        mean_satisfaction(students, schema),
        mean_satisfaction(professors, schema),
    ) {
        if student_mean > professor_mean {
            insights.push(format!(
                "Students report higher average satisfaction than professors ({student_mean:.2} vs {professor_mean:.2})"
            ));
        } else if professor_mean > student_mean {
            insights.push(format!(
                "Professors report higher average satisfaction than students ({professor_mean:.2} vs {student_mean:.2})"
            ));
        }
    }

    insights
}

/// The first value to reach the maximum count wins, in first-seen order.
fn most_frequent(responses: &[Response], field: &str) -> Option<(String, u64)> {
    group_by_field(responses, field)
        .into_iter()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
}

/// Mean satisfaction score for one population, two decimals. None when no
/// response carries a scorable answer.
fn mean_satisfaction(responses: &[Response], schema: &AnalysisSchema) -> Option<f64> {
    let scores: Vec<f64> = responses
        .iter()
        .filter_map(|r| satisfaction_score(r, &schema.satisfaction_fields))
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(round2(scores.iter().sum::<f64>() / scores.len() as f64))
}
