use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    progress: f64,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct EnrollmentWithCourseRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub difficulty: String,
    pub progress: f64,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Inserts an enrollment of the actor. A duplicate surfaces as
    /// `DatabaseError::Conflict` through the unique constraint.
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            "INSERT INTO enrollments (id, user_id, course_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(created)
    }

    pub async fn find_for(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2")
                .bind(user_id)
                .bind(course_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn list_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<EnrollmentWithCourseRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            e.id,
            e.course_id,
            c.title AS course_title,
            c.difficulty,
            e.progress,
            e.enrolled_at,
            e.completed_at
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = $1
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    /// Recomputes progress from completed lessons. Returns the updated row
    /// and whether the course has just been completed.
    pub async fn recompute_progress(self, mm: &ModelManager) -> DatabaseResult<(Self, bool)> {
        let was_completed = self.completed_at.is_some();
        let updated: Self = sqlx::query_as(
            r#"
            WITH totals AS (
                SELECT
                COUNT(l.id) AS total,
                COUNT(lp.completed_at) AS completed
                FROM lessons l
                JOIN modules m ON m.id = l.module_id
                LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id
                AND lp.user_id = $2
                WHERE m.course_id = $3
            ), pct AS (
                SELECT CASE WHEN total = 0 THEN 0::float8
                            ELSE LEAST(100.0, completed::float8 / total::float8 * 100.0)
                       END AS value
                FROM totals
            )
            UPDATE enrollments e
            SET progress = pct.value,
                completed_at = CASE
                    WHEN pct.value >= 100 THEN COALESCE(e.completed_at, now())
                    ELSE e.completed_at
                END
            FROM pct
            WHERE e.id = $1
            RETURNING e.*
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.course_id)
        .fetch_one(mm.executor())
        .await?;

        let just_completed = !was_completed && updated.completed_at.is_some();
        Ok((updated, just_completed))
    }
}

