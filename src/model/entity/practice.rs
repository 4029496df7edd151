use chrono::NaiveDate;
use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

pub const DAILY_CHALLENGE_DIFFICULTY: &str = "intermediate";

const HIGH_SCORE: f64 = 80.0;
const HIGH_SCORE_SHARE: f64 = 0.6;
const STRONG_AVERAGE: f64 = 75.0;
const ADVANCED_TARGET: f64 = 70.0;

/// Exercises of published courses, plus the caller's own drafts (all for admins).
const PRACTICE_POOL: &str = r#"
    FROM exercises x
    JOIN lessons l ON l.id = x.lesson_id
    JOIN modules m ON m.id = l.module_id
    JOIN courses c ON c.id = m.course_id
    WHERE (c.is_published OR c.instructor_id = $1 OR $2)
      AND ($3::text IS NULL OR x.difficulty = $3)
      AND ($4::text IS NULL OR c.category = $4)
"#;

const PRACTICE_COLUMNS: &str = r#"
    SELECT
    x.id AS exercise_id,
    c.id AS course_id,
    c.title AS course_title,
    c.category,
    x.title,
    x.description,
    x.difficulty,
    x.language,
    x.points,
    x.starter_code,
    (SELECT MAX(s.score) FROM exercise_submissions s
      WHERE s.exercise_id = x.id AND s.user_id = $1) AS best_score,
    (SELECT COUNT(*) FROM exercise_submissions s
      WHERE s.exercise_id = x.id AND s.user_id = $1) AS attempts_count
"#;

#[derive(Debug, Clone, Default)]
pub struct PracticeFilter {
    pub difficulty: Option<String>,
    pub category: Option<String>,
}

/// An exercise offered for practice with the caller's record on it.
#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct PracticeExerciseRow {
    pub exercise_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub language: String,
    pub points: i32,
    pub starter_code: String,
    pub best_score: Option<f64>,
    pub attempts_count: i64,
}

impl PracticeExerciseRow {
    pub async fn browse(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        filter: &PracticeFilter,
        limit: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let query = format!(
            "{PRACTICE_COLUMNS} {PRACTICE_POOL} ORDER BY c.title, m.order_index, l.order_index, x.order_index LIMIT $5"
        );
        let rows = sqlx::query_as(&query)
            .bind(actor.user_id())
            .bind(actor.is_admin())
            .bind(filter.difficulty.as_deref())
            .bind(filter.category.as_deref())
            .bind(limit)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }

    pub async fn random(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        filter: &PracticeFilter,
    ) -> DatabaseResult<Option<Self>> {
        let query = format!("{PRACTICE_COLUMNS} {PRACTICE_POOL} ORDER BY random() LIMIT 1");
        let row = sqlx::query_as(&query)
            .bind(actor.user_id())
            .bind(actor.is_admin())
            .bind(filter.difficulty.as_deref())
            .bind(filter.category.as_deref())
            .fetch_optional(mm.executor())
            .await?;
        Ok(row)
    }
}

/// The challenge of one day: the same intermediate exercise from a published
/// course for every learner, rotating through the pool day by day.
#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct DailyChallengeRow {
    pub exercise_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub language: String,
    pub points: i32,
    pub starter_code: String,
    pub completed: bool,
}

impl DailyChallengeRow {
    pub async fn for_day(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        day: NaiveDate,
        day_number: i64,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
            ranked.exercise_id,
            ranked.course_id,
            ranked.title,
            ranked.description,
            ranked.difficulty,
            ranked.language,
            ranked.points,
            ranked.starter_code,
            EXISTS (
                SELECT 1 FROM exercise_submissions s
                WHERE s.exercise_id = ranked.exercise_id AND s.user_id = $1
                  AND (s.submitted_at AT TIME ZONE 'UTC')::date = $2
            ) AS completed
            FROM (
                SELECT
                x.id AS exercise_id,
                c.id AS course_id,
                x.title,
                x.description,
                x.difficulty,
                x.language,
                x.points,
                x.starter_code,
                ROW_NUMBER() OVER (ORDER BY x.created_at, x.id) - 1 AS position,
                COUNT(*) OVER () AS pool_size
                FROM exercises x
                JOIN lessons l ON l.id = x.lesson_id
                JOIN modules m ON m.id = l.module_id
                JOIN courses c ON c.id = m.course_id
                WHERE c.is_published AND x.difficulty = $3
            ) ranked
            WHERE ranked.position = $4 % ranked.pool_size
            "#,
        )
        .bind(actor.user_id())
        .bind(day)
        .bind(DAILY_CHALLENGE_DIFFICULTY)
        .bind(day_number)
        .fetch_optional(mm.executor())
        .await?;
        Ok(row)
    }
}

/// Aggregates over every submission of the caller.
#[derive(Debug, Clone, Default, Serialize, FromRow, utoipa::ToSchema)]
pub struct PracticeStatsRow {
    pub total_submissions: i64,
    pub exercises_attempted: i64,
    pub total_points_earned: i64,
    pub average_score: f64,
    pub high_scores: i64,
    pub low_scores: i64,
    pub advanced_average: Option<f64>,
    pub preferred_language: Option<String>,
}

impl PracticeStatsRow {
    pub async fn fetch(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            SELECT
            COUNT(*) AS total_submissions,
            COUNT(DISTINCT s.exercise_id) AS exercises_attempted,
            COALESCE(SUM(s.points_earned), 0)::BIGINT AS total_points_earned,
            COALESCE(ROUND(AVG(s.score)::numeric, 2), 0)::float8 AS average_score,
            COUNT(*) FILTER (WHERE s.score >= $2) AS high_scores,
            COUNT(*) FILTER (WHERE s.score < 60) AS low_scores,
            (AVG(s.score) FILTER (WHERE x.difficulty = 'advanced'))::float8 AS advanced_average,
            (SELECT language FROM exercise_submissions
              WHERE user_id = $1
              GROUP BY language
              ORDER BY COUNT(*) DESC, language
              LIMIT 1) AS preferred_language
            FROM exercise_submissions s
            JOIN exercises x ON x.id = s.exercise_id
            WHERE s.user_id = $1
            "#,
        )
        .bind(actor.user_id())
        .bind(HIGH_SCORE)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub fn strength_areas(&self) -> Vec<&'static str> {
        let mut areas = Vec::new();
        if self.total_submissions == 0 {
            return areas;
        }
        if self.high_scores as f64 > self.total_submissions as f64 * HIGH_SCORE_SHARE {
            areas.push("High accuracy in problem solving");
        }
        if self.average_score >= STRONG_AVERAGE {
            areas.push("Strong coding skills");
        }
        areas
    }

    pub fn improvement_areas(&self) -> Vec<&'static str> {
        let mut areas = Vec::new();
        if self.low_scores > 0 {
            areas.push("Focus on code quality and structure");
        }
        if self.advanced_average.is_some_and(|avg| avg < ADVANCED_TARGET) {
            areas.push("Practice more advanced concepts");
        }
        areas
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stats(total: i64, high: i64, low: i64, average: f64) -> PracticeStatsRow {
        PracticeStatsRow {
            total_submissions: total,
            high_scores: high,
            low_scores: low,
            average_score: average,
            ..Default::default()
        }
    }

    #[test]
    fn no_submissions_have_no_areas() {
        let row = PracticeStatsRow::default();
        assert!(row.strength_areas().is_empty());
        assert!(row.improvement_areas().is_empty());
    }

    #[test]
    fn accuracy_needs_more_than_sixty_percent_high_scores() {
        assert_eq!(stats(5, 3, 0, 70.0).strength_areas(), Vec::<&str>::new());
        assert_eq!(
            stats(5, 4, 0, 70.0).strength_areas(),
            vec!["High accuracy in problem solving"]
        );
    }

    #[test]
    fn strong_average_is_a_strength() {
        let areas = stats(4, 4, 0, 90.0).strength_areas();
        assert_eq!(
            areas,
            vec!["High accuracy in problem solving", "Strong coding skills"]
        );
    }

    #[test]
    fn weak_results_suggest_improvements() {
        let mut row = stats(3, 0, 1, 55.0);
        assert_eq!(row.improvement_areas(), vec!["Focus on code quality and structure"]);

        row.advanced_average = Some(65.0);
        assert_eq!(row.improvement_areas().len(), 2);

        row.advanced_average = Some(85.0);
        row.low_scores = 0;
        assert!(row.improvement_areas().is_empty());
    }
}
