use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

pub const MAX_TREND_DAYS: i32 = 365;

/// One enrolled course on the dashboard.
#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct CoursePerformanceRow {
    pub course_id: Uuid,
    pub title: String,
    pub category: String,
    pub difficulty: String,
    pub progress: f64,
    pub lessons_completed: i64,
    pub exercises_completed: i64,
    pub points_earned: i64,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CoursePerformanceRow {
    pub async fn list_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            c.id AS course_id,
            c.title,
            c.category,
            c.difficulty,
            e.progress,
            (SELECT COUNT(*) FROM lesson_progress lp
               JOIN lessons l ON l.id = lp.lesson_id
               JOIN modules m ON m.id = l.module_id
              WHERE lp.user_id = $1 AND m.course_id = c.id AND lp.completed_at IS NOT NULL) AS lessons_completed,
            (SELECT COUNT(DISTINCT s.exercise_id) FROM exercise_submissions s
               JOIN exercises x ON x.id = s.exercise_id
               JOIN lessons l ON l.id = x.lesson_id
               JOIN modules m ON m.id = l.module_id
              WHERE s.user_id = $1 AND m.course_id = c.id) AS exercises_completed,
            (SELECT COALESCE(SUM(s.points_earned), 0)::BIGINT FROM exercise_submissions s
               JOIN exercises x ON x.id = s.exercise_id
               JOIN lessons l ON l.id = x.lesson_id
               JOIN modules m ON m.id = l.module_id
              WHERE s.user_id = $1 AND m.course_id = c.id) AS points_earned,
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
}

/// Activity of one calendar day (UTC). Days without activity are included
/// with zero counts.
#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct DailyActivityRow {
    pub date: NaiveDate,
    pub lessons_completed: i64,
    pub exercises_submitted: i64,
    pub points_earned: i64,
}

impl DailyActivityRow {
    /// The last `days` days up to and including today, oldest first.
    pub async fn trend(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        days: i32,
    ) -> DatabaseResult<Vec<Self>> {
        let days = days.clamp(1, MAX_TREND_DAYS);
        let rows = sqlx::query_as(
            r#"
            WITH today AS (SELECT (now() AT TIME ZONE 'UTC')::date AS day),
            days AS (
                SELECT generate_series(t.day - ($2::int - 1), t.day, INTERVAL '1 day')::date AS day
                FROM today t
            )
            SELECT
            d.day AS date,
            (SELECT COUNT(*) FROM lesson_progress lp
              WHERE lp.user_id = $1 AND (lp.completed_at AT TIME ZONE 'UTC')::date = d.day) AS lessons_completed,
            (SELECT COUNT(*) FROM exercise_submissions s
              WHERE s.user_id = $1 AND (s.submitted_at AT TIME ZONE 'UTC')::date = d.day) AS exercises_submitted,
            (SELECT COALESCE(SUM(s.points_earned), 0)::BIGINT FROM exercise_submissions s
              WHERE s.user_id = $1 AND (s.submitted_at AT TIME ZONE 'UTC')::date = d.day) AS points_earned
            FROM days d
            ORDER BY d.day
            "#,
        )
        .bind(actor.user_id())
        .bind(days)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

/// Every lesson of a course with the caller's progress on it, if any.
#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct LessonAnalyticsRow {
    pub lesson_id: Uuid,
    pub title: String,
    pub progress_percentage: f64,
    pub time_spent_seconds: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonAnalyticsRow {
    pub async fn list_for_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            l.id AS lesson_id,
            l.title,
            COALESCE(lp.progress_percentage, 0) AS progress_percentage,
            COALESCE(lp.time_spent_seconds, 0) AS time_spent_seconds,
            lp.completed_at
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            LEFT JOIN lesson_progress lp ON lp.lesson_id = l.id AND lp.user_id = $1
            WHERE m.course_id = $2
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

/// Every exercise of a course with the caller's results on it.
#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct ExerciseAnalyticsRow {
    pub exercise_id: Uuid,
    pub title: String,
    pub difficulty: String,
    pub best_score: Option<f64>,
    pub average_score: Option<f64>,
    pub points_earned: i64,
    pub attempts_count: i64,
    pub last_submitted_at: Option<DateTime<Utc>>,
}

impl ExerciseAnalyticsRow {
    pub async fn list_for_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            x.id AS exercise_id,
            x.title,
            x.difficulty,
            MAX(s.score) AS best_score,
            ROUND(AVG(s.score)::numeric, 2)::float8 AS average_score,
            COALESCE(SUM(s.points_earned), 0)::BIGINT AS points_earned,
            COUNT(s.id) AS attempts_count,
            MAX(s.submitted_at) AS last_submitted_at
            FROM exercises x
            JOIN lessons l ON l.id = x.lesson_id
            JOIN modules m ON m.id = l.module_id
            LEFT JOIN exercise_submissions s ON s.exercise_id = x.id AND s.user_id = $1
            WHERE m.course_id = $2
            GROUP BY x.id, x.title, x.difficulty, m.order_index, l.order_index, x.order_index
            ORDER BY m.order_index, l.order_index, x.order_index
            "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
