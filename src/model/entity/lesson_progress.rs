use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct LessonProgress {
    id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    progress_percentage: f64,
    time_spent_seconds: i64,
    notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonProgressUpdate {
    pub lesson_id: Uuid,
    pub progress_percentage: f64,
    pub time_spent_seconds: i64,
    pub notes: Option<String>,
}

impl ResourceTyped for LessonProgress {
    fn get_resource_type() -> ResourceType {
        ResourceType::LessonProgress
    }
}

impl LessonProgress {
    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Upserts the actor's progress on a lesson. Time spent accumulates,
    /// notes are only replaced when given. Returns the row and whether the
    /// lesson was completed by this call.
    pub async fn record(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: LessonProgressUpdate,
    ) -> DatabaseResult<(Self, bool)> {
        let mut tx = mm.executor().begin().await?;

        let progress: Self = sqlx::query_as(
            r#"
            INSERT INTO lesson_progress (id, user_id, lesson_id, progress_percentage, time_spent_seconds, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT lesson_progress_user_lesson_key DO UPDATE
            SET progress_percentage = EXCLUDED.progress_percentage,
                time_spent_seconds = lesson_progress.time_spent_seconds + EXCLUDED.time_spent_seconds,
                notes = COALESCE(EXCLUDED.notes, lesson_progress.notes)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.lesson_id)
        .bind(data.progress_percentage)
        .bind(data.time_spent_seconds)
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await?;

        if progress.progress_percentage < 100.0 {
            tx.commit().await?;
            return Ok((progress, false));
        }

        let completed: Option<Self> = sqlx::query_as(
            r#"
            UPDATE lesson_progress SET completed_at = now()
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(progress.id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(match completed {
            Some(row) => (row, true),
            None => (progress, false),
        })
    }

    pub async fn list_for_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT lp.* FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE lp.user_id = $1 AND m.course_id = $2
            ORDER BY m.order_index, l.order_index
            "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}


// Utils

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct LearningStatsRow {
    pub total_courses_enrolled: i64,
    pub completed_courses: i64,
    pub total_lessons_completed: i64,
    pub total_exercises_submitted: i64,
    pub total_study_time_seconds: i64,
    pub total_points: i64,
    pub average_progress: f64,
}

impl LearningStatsRow {
    pub async fn fetch(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            SELECT
            (SELECT COUNT(*) FROM enrollments WHERE user_id = $1) AS total_courses_enrolled,
            (SELECT COUNT(*) FROM enrollments WHERE user_id = $1 AND completed_at IS NOT NULL) AS completed_courses,
            (SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1 AND completed_at IS NOT NULL) AS total_lessons_completed,
            (SELECT COUNT(*) FROM exercise_submissions WHERE user_id = $1) AS total_exercises_submitted,
            (SELECT COALESCE(SUM(time_spent_seconds), 0)::BIGINT FROM lesson_progress WHERE user_id = $1) AS total_study_time_seconds,
            (SELECT total_points FROM profiles WHERE id = $1) AS total_points,
            (SELECT COALESCE(ROUND(AVG(progress)::numeric, 2), 0)::float8 FROM enrollments WHERE user_id = $1) AS average_progress
            "#,
        )
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}
