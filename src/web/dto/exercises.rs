use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    entity::{ExerciseCreate, Submission},
    grading::{Grade, TestResult},
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ExerciseBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub starter_code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_points")]
    pub points: i32,
    pub order_index: Option<i32>,
}

fn default_language() -> String {
    String::from("python")
}

fn default_difficulty() -> String {
    String::from("beginner")
}

fn default_points() -> i32 {
    10
}

impl ExerciseBody {
    pub fn into_create(self, lesson_id: Uuid) -> ExerciseCreate {
        ExerciseCreate {
            lesson_id,
            title: self.title.trim().to_string(),
            description: self.description,
            starter_code: self.starter_code,
            language: self.language.to_lowercase(),
            difficulty: self.difficulty,
            points: self.points,
            order_index: self.order_index,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitBody {
    pub code: String,
    /// Defaults to the exercise language
    pub language: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub submission_id: Uuid,
    pub score: f64,
    pub points_earned: i32,
    pub test_results: Vec<TestResult>,
    pub feedback: String,
}

impl SubmissionResponse {
    pub fn new(submission: &Submission, grade: Grade) -> Self {
        Self {
            submission_id: submission.id(),
            score: submission.score(),
            points_earned: submission.points_earned(),
            test_results: grade.test_results,
            feedback: grade.feedback,
        }
    }
}
