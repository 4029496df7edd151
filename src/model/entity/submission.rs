use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

use super::{Achievement, Profile, achievement_codes};
use crate::model::grading::{Grade, TestResult};
use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Submission {
    id: Uuid,
    user_id: Uuid,
    exercise_id: Uuid,
    code: String,
    language: String,
    score: f64,
    points_earned: i32,
    #[schema(value_type = Vec<TestResult>)]
    test_results: Json<Vec<TestResult>>,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SubmissionCreate {
    pub exercise_id: Uuid,
    pub code: String,
    pub language: String,
    pub grade: Grade,
}

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct ExerciseScoreRow {
    pub exercise_id: Uuid,
    pub best_score: f64,
    pub attempts_count: i64,
    pub last_submitted_at: DateTime<Utc>,
}

impl ResourceTyped for Submission {
    fn get_resource_type() -> ResourceType {
        ResourceType::Submission
    }
}

impl Submission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn points_earned(&self) -> i32 {
        self.points_earned
    }

    /// Stores a graded submission, credits its points and grants
    /// `first_exercise` in one transaction.
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: SubmissionCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.executor().begin().await?;

        let created: Self = sqlx::query_as(
            r#"
            INSERT INTO exercise_submissions (id, user_id, exercise_id, code, language, score, points_earned, test_results)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.exercise_id)
        .bind(&data.code)
        .bind(&data.language)
        .bind(data.grade.score)
        .bind(data.grade.points_earned)
        .bind(Json(&data.grade.test_results))
        .fetch_one(&mut *tx)
        .await?;

        Profile::add_points_in(&mut *tx, created.user_id, i64::from(created.points_earned)).await?;
        Achievement::grant_if_absent_in(&mut *tx, created.user_id, achievement_codes::FIRST_EXERCISE)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn list_for_exercise(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        exercise_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM exercise_submissions
            WHERE user_id = $1 AND exercise_id = $2
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(actor.user_id())
        .bind(exercise_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    pub async fn scores_for_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<ExerciseScoreRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            s.exercise_id,
            MAX(s.score) AS best_score,
            COUNT(*) AS attempts_count,
            MAX(s.submitted_at) AS last_submitted_at
            FROM exercise_submissions s
            JOIN exercises x ON x.id = s.exercise_id
            JOIN lessons l ON l.id = x.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE s.user_id = $1 AND m.course_id = $2
            GROUP BY s.exercise_id
            "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

