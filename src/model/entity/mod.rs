mod profile;
pub use profile::{LeaderboardEntry, Profile, ProfileCreateUpdate};

mod course;
pub use course::{Course, CourseCreateUpdate, ModuleOutlineRow};

mod module;
pub use module::{Module, ModuleCreate};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonWithProgressRow};

mod exercise;
pub use exercise::{Exercise, ExerciseCreate};

mod enrollment;
pub use enrollment::{Enrollment, EnrollmentWithCourseRow};

mod lesson_progress;
pub use lesson_progress::{LearningStatsRow, LessonProgress, LessonProgressUpdate};

mod submission;
pub use submission::{ExerciseScoreRow, Submission, SubmissionCreate};

mod achievement;
pub use achievement::{Achievement, AchievementCreate, EarnedAchievementRow, codes as achievement_codes};

mod payment;
pub use payment::{Payment, PaymentCreate, PaymentStatus};

mod analytics;
pub use analytics::{
    CoursePerformanceRow, DailyActivityRow, ExerciseAnalyticsRow, LessonAnalyticsRow,
    MAX_TREND_DAYS,
};

mod practice;
pub use practice::{
    DAILY_CHALLENGE_DIFFICULTY, DailyChallengeRow, PracticeExerciseRow, PracticeFilter,
    PracticeStatsRow,
};
