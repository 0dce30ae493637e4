//! Enumerated field schema for the aggregator.
//!
//! Which answer fields carry ratings, satisfaction labels, and grouping
//! categories is fixed configuration handed to the aggregator, never
//! inferred by scanning field names at runtime. The default schema matches
//! the questionnaire the dashboard was built against.

/// A 1-5 rating question and the label it is reported under.
#[derive(Debug, Clone)]
pub struct RatingField {
    pub field: String,
    pub label: String,
}

impl RatingField {
    pub fn new(field: &str, label: &str) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisSchema {
    /// Rating questions, in report order. Ties in mean score keep this order.
    pub rating_fields: Vec<RatingField>,
    /// Fields checked, in order, for a satisfaction label or score.
    pub satisfaction_fields: Vec<String>,
    /// Categorical field grouped for the byMajor chart and the student insight.
    pub major_field: String,
    /// Categorical field grouped for the professor insight.
    pub department_field: String,
    /// Categorical field grouped for the byExperience chart.
    pub experience_field: String,
}

impl Default for AnalysisSchema {
    fn default() -> Self {
        Self {
            rating_fields: vec![
                RatingField::new("featureExams", "Online exams"),
                RatingField::new("featureAssignments", "Assignment submission"),
                RatingField::new("featureGrades", "Grade tracking"),
                RatingField::new("featureContent", "Course materials"),
                RatingField::new("featureDiscussions", "Discussion forums"),
                RatingField::new("featureNotifications", "Notifications"),
            ],
            satisfaction_fields: vec![
                "satisfactionLevel".to_string(),
                "overallSatisfaction".to_string(),
            ],
            major_field: "major".to_string(),
            department_field: "department".to_string(),
            experience_field: "teachingExperience".to_string(),
        }
    }
}
