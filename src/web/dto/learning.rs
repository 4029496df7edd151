use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{
    Enrollment, ExerciseScoreRow, LearningStatsRow, LessonProgress, LessonWithProgressRow,
    ModuleCreate, LessonCreate,
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ModuleBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order_index: Option<i32>,
}

impl ModuleBody {
    pub fn into_create(self, course_id: Uuid) -> ModuleCreate {
        ModuleCreate {
            course_id,
            title: self.title.trim().to_string(),
            description: self.description,
            order_index: self.order_index,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonBody {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_lesson_type")]
    pub lesson_type: String,
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: i32,
    pub order_index: Option<i32>,
}

fn default_lesson_type() -> String {
    String::from("text")
}

impl LessonBody {
    pub fn into_create(self, module_id: Uuid) -> LessonCreate {
        LessonCreate {
            module_id,
            title: self.title.trim().to_string(),
            content: self.content,
            lesson_type: self.lesson_type,
            video_url: self.video_url.filter(|url| !url.trim().is_empty()),
            duration_minutes: self.duration_minutes,
            order_index: self.order_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LessonResponse {
    id: Uuid,
    module_id: Uuid,
    course_id: Uuid,
    title: String,
    content: String,
    lesson_type: String,
    video_url: Option<String>,
    duration_minutes: i32,
    order_index: i32,
    progress_percentage: f64,
    time_spent_seconds: i64,
    notes: Option<String>,
    completed: bool,
}

impl From<LessonWithProgressRow> for LessonResponse {
    fn from(row: LessonWithProgressRow) -> Self {
        Self {
            id: row.id,
            module_id: row.module_id,
            course_id: row.course_id,
            title: row.title,
            content: row.content,
            lesson_type: row.lesson_type,
            video_url: row.video_url,
            duration_minutes: row.duration_minutes,
            order_index: row.order_index,
            progress_percentage: row.progress_percentage.unwrap_or(0.0),
            time_spent_seconds: row.time_spent_seconds.unwrap_or(0),
            notes: row.notes,
            completed: row.completed_at.is_some(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EnrollBody {
    pub course_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProgressBody {
    pub progress_percentage: f64,
    #[serde(default)]
    pub time_spent_seconds: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    pub progress: LessonProgress,
    pub lesson_completed: bool,
    pub course_progress: f64,
    pub course_completed: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseProgressResponse {
    pub course_id: Uuid,
    pub course_title: String,
    pub overall_progress: f64,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub lessons_completed: usize,
    pub total_lessons: i64,
    pub lesson_progress: Vec<LessonProgress>,
    pub exercise_progress: Vec<ExerciseScoreRow>,
}

impl CourseProgressResponse {
    pub fn new(
        enrollment: &Enrollment,
        course_title: String,
        total_lessons: i64,
        lesson_progress: Vec<LessonProgress>,
        exercise_progress: Vec<ExerciseScoreRow>,
    ) -> Self {
        Self {
            course_id: enrollment.course_id(),
            course_title,
            overall_progress: enrollment.progress(),
            enrolled_at: enrollment.enrolled_at(),
            completed_at: enrollment.completed_at(),
            lessons_completed: lesson_progress
                .iter()
                .filter(|p| p.completed_at().is_some())
                .count(),
            total_lessons,
            lesson_progress,
            exercise_progress,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LearningStats {
    pub total_courses_enrolled: i64,
    pub completed_courses: i64,
    pub total_lessons_completed: i64,
    pub total_exercises_submitted: i64,
    pub total_study_time_minutes: i64,
    pub total_points_earned: i64,
    pub average_progress: f64,
}

impl From<LearningStatsRow> for LearningStats {
    fn from(row: LearningStatsRow) -> Self {
        Self {
            total_courses_enrolled: row.total_courses_enrolled,
            completed_courses: row.completed_courses,
            total_lessons_completed: row.total_lessons_completed,
            total_exercises_submitted: row.total_exercises_submitted,
            total_study_time_minutes: row.total_study_time_seconds / 60,
            total_points_earned: row.total_points,
            average_progress: row.average_progress,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }
}
