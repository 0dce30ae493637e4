//! Aggregation of raw survey records into the dashboard snapshot.
//!
//! The aggregator is the single entry point of the analysis pipeline: hand
//! it the two collections and it returns a freshly computed [`Snapshot`].
//! It never reads or writes storage itself and holds no state between runs,
//! so recomputing over an unchanged corpus returns an identical snapshot.

use crate::model::{Charts, Response, Snapshot, Summary};

pub mod insights;
pub mod schema;
pub mod stats;

pub use schema::{AnalysisSchema, RatingField};

pub struct Aggregator {
    schema: AnalysisSchema,
}

impl Aggregator {
    pub fn new(schema: AnalysisSchema) -> Self {
        Self { schema }
    }

    /// Recomputes the snapshot from scratch over both collections.
    pub fn compute(&self, students: &[Response], professors: &[Response]) -> Snapshot {
        let combined: Vec<Response> = students.iter().chain(professors).cloned().collect();

        let summary = Summary {
            total_participants: combined.len() as u64,
            student_count: students.len() as u64,
            professor_count: professors.len() as u64,
            completion_rate: stats::completion_rate(&combined),
            average_time: stats::average_completion_time(&combined),
        };

        let charts = Charts {
            satisfaction_levels: stats::satisfaction_levels(
                &combined,
                &self.schema.satisfaction_fields,
            ),
            feature_rankings: stats::rank_features(&combined, &self.schema.rating_fields),
            by_major: stats::group_by_field(&combined, &self.schema.major_field),
            by_experience: stats::group_by_field(&combined, &self.schema.experience_field),
        };

        let insights = insights::generate(students, professors, &self.schema);

        Snapshot {
            summary,
            charts,
            insights,
        }
    }
}
