use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{
    Course, CoursePerformanceRow, DailyActivityRow, DailyChallengeRow, Enrollment,
    ExerciseAnalyticsRow, LearningStatsRow, LessonAnalyticsRow, PracticeFilter,
    PracticeStatsRow, Profile,
};

const DEFAULT_TREND_DAYS: i32 = 30;
const DEFAULT_PRACTICE_LIMIT: i64 = 10;
const DAILY_POINTS_MULTIPLIER: i32 = 2;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardUser {
    pub username: String,
    pub full_name: String,
    pub total_points: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardOverview {
    pub total_courses_enrolled: i64,
    pub completed_courses: i64,
    pub average_progress: f64,
    pub total_lessons_completed: i64,
    pub total_exercises_submitted: i64,
    pub total_study_time_minutes: i64,
    pub completion_rate: f64,
}

impl From<LearningStatsRow> for DashboardOverview {
    fn from(row: LearningStatsRow) -> Self {
        let completion_rate = if row.total_courses_enrolled > 0 {
            round2(row.completed_courses as f64 / row.total_courses_enrolled as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            total_courses_enrolled: row.total_courses_enrolled,
            completed_courses: row.completed_courses,
            average_progress: row.average_progress,
            total_lessons_completed: row.total_lessons_completed,
            total_exercises_submitted: row.total_exercises_submitted,
            total_study_time_minutes: row.total_study_time_seconds / 60,
            completion_rate,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub user_info: DashboardUser,
    pub overview: DashboardOverview,
    pub course_performance: Vec<CoursePerformanceRow>,
}

impl DashboardResponse {
    pub fn new(
        profile: &Profile,
        stats: LearningStatsRow,
        course_performance: Vec<CoursePerformanceRow>,
    ) -> Self {
        Self {
            user_info: DashboardUser {
                username: profile.username().to_string(),
                full_name: profile.full_name().to_string(),
                total_points: profile.total_points(),
            },
            overview: DashboardOverview::from(stats),
            course_performance,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TrendQuery {
    /// Number of days ending today, 1 to 365
    pub days: Option<i32>,
}

impl TrendQuery {
    pub fn days(&self) -> i32 {
        self.days.unwrap_or(DEFAULT_TREND_DAYS)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TrendResponse {
    pub days: usize,
    pub trend: Vec<DailyActivityRow>,
}

impl From<Vec<DailyActivityRow>> for TrendResponse {
    fn from(trend: Vec<DailyActivityRow>) -> Self {
        Self {
            days: trend.len(),
            trend,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseInfo {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub difficulty: String,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressSummary {
    pub overall_progress: f64,
    pub lessons_completed: usize,
    pub total_lessons: usize,
    pub exercises_attempted: usize,
    pub total_exercises: usize,
    pub total_points_earned: i64,
    pub total_time_spent_minutes: i64,
    pub average_score: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseAnalyticsResponse {
    pub course_info: CourseInfo,
    pub progress_summary: ProgressSummary,
    pub lesson_progress: Vec<LessonAnalyticsRow>,
    pub exercise_performance: Vec<ExerciseAnalyticsRow>,
}

impl CourseAnalyticsResponse {
    pub fn new(
        course: &Course,
        enrollment: &Enrollment,
        lesson_progress: Vec<LessonAnalyticsRow>,
        exercise_performance: Vec<ExerciseAnalyticsRow>,
    ) -> Self {
        let attempted: Vec<&ExerciseAnalyticsRow> = exercise_performance
            .iter()
            .filter(|x| x.attempts_count > 0)
            .collect();
        // mean of each attempted exercise's best score
        let average_score = if attempted.is_empty() {
            0.0
        } else {
            let total: f64 = attempted.iter().filter_map(|x| x.best_score).sum();
            round2(total / attempted.len() as f64)
        };

        let progress_summary = ProgressSummary {
            overall_progress: enrollment.progress(),
            lessons_completed: lesson_progress
                .iter()
                .filter(|l| l.completed_at.is_some())
                .count(),
            total_lessons: lesson_progress.len(),
            exercises_attempted: attempted.len(),
            total_exercises: exercise_performance.len(),
            total_points_earned: exercise_performance.iter().map(|x| x.points_earned).sum(),
            total_time_spent_minutes: lesson_progress
                .iter()
                .map(|l| l.time_spent_seconds)
                .sum::<i64>()
                / 60,
            average_score,
        };

        Self {
            course_info: CourseInfo {
                id: course.id(),
                title: course.title().to_string(),
                category: course.category().to_string(),
                difficulty: course.difficulty().to_string(),
                enrolled_at: enrollment.enrolled_at(),
                completed_at: enrollment.completed_at(),
            },
            progress_summary,
            lesson_progress,
            exercise_performance,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PracticeQuery {
    pub difficulty: Option<String>,
    pub category: Option<String>,
    /// Page size for browsing, 1 to 50
    pub limit: Option<i64>,
}

impl PracticeQuery {
    pub fn filter(&self) -> PracticeFilter {
        let normalize = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        };
        PracticeFilter {
            difficulty: normalize(&self.difficulty),
            category: normalize(&self.category),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PRACTICE_LIMIT).clamp(1, 50)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DailyChallengeResponse {
    pub challenge_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub language: String,
    pub points: i32,
    pub starter_code: String,
    pub date: NaiveDate,
    pub completed: bool,
}

impl DailyChallengeResponse {
    pub fn new(row: DailyChallengeRow, date: NaiveDate) -> Self {
        Self {
            challenge_id: row.exercise_id,
            course_id: row.course_id,
            title: format!("Daily Challenge: {}", row.title),
            description: row.description,
            difficulty: row.difficulty,
            language: row.language,
            points: row.points.saturating_mul(DAILY_POINTS_MULTIPLIER),
            starter_code: row.starter_code,
            date,
            completed: row.completed,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PracticeStatsResponse {
    pub total_submissions: i64,
    pub exercises_attempted: i64,
    pub total_points_earned: i64,
    pub average_score: f64,
    pub preferred_language: Option<String>,
    pub strength_areas: Vec<String>,
    pub improvement_areas: Vec<String>,
}

impl From<PracticeStatsRow> for PracticeStatsResponse {
    fn from(row: PracticeStatsRow) -> Self {
        let strength_areas = row.strength_areas().into_iter().map(String::from).collect();
        let improvement_areas = row
            .improvement_areas()
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            total_submissions: row.total_submissions,
            exercises_attempted: row.exercises_attempted,
            total_points_earned: row.total_points_earned,
            average_score: row.average_score,
            preferred_language: row.preferred_language,
            strength_areas,
            improvement_areas,
        }
    }
}
