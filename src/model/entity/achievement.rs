use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, prelude::FromRow};
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;

/// Codes of the achievements seeded by the migrations.
pub mod codes {
    pub const FIRST_ENROLLMENT: &str = "first_enrollment";
    pub const FIRST_LESSON: &str = "first_lesson";
    pub const FIRST_EXERCISE: &str = "first_exercise";
    pub const COURSE_COMPLETED: &str = "course_completed";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Achievement {
    id: Uuid,
    code: String,
    name: String,
    description: String,
    points: i32,
    icon: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AchievementCreate {
    pub code: String,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct EarnedAchievementRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub icon: Option<String>,
    pub earned_at: DateTime<Utc>,
}

impl ResourceTyped for Achievement {
    fn get_resource_type() -> ResourceType {
        ResourceType::Achievement
    }
}

impl Achievement {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn points(&self) -> i32 {
        self.points
    }
}

#[async_trait]
impl CrudRepository<Achievement, AchievementCreate, Uuid> for Achievement {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: AchievementCreate,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO achievements (id, code, name, description, points, icon)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.code)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.points)
        .bind(&data.icon)
        .fetch_one(mm.executor())
        .await?;
        Ok(created)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: AchievementCreate,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as(
            r#"
            UPDATE achievements
            SET code = $1, name = $2, description = $3, points = $4, icon = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&data.code)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.points)
        .bind(&data.icon)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;
        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM achievements WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM achievements WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM achievements ORDER BY created_at, code LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM achievements")
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Achievement, AchievementCreate, Uuid);

impl Achievement {
    /// Grants the achievement with `code` to `user_id` unless already held,
    /// crediting its points in the same statement. Returns `true` when newly
    /// granted; unknown codes grant nothing.
    pub async fn grant_if_absent(
        mm: &ModelManager,
        user_id: Uuid,
        code: &str,
    ) -> DatabaseResult<bool> {
        Self::grant_if_absent_in(mm.executor(), user_id, code).await
    }

    /// Same as [`Achievement::grant_if_absent`] inside a caller's transaction.
    pub async fn grant_if_absent_in<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        code: &str,
    ) -> DatabaseResult<bool> {
        let granted: bool = sqlx::query_scalar(
            r#"
            WITH granted AS (
                INSERT INTO user_achievements (id, user_id, achievement_id)
                SELECT $1, $2, a.id FROM achievements a WHERE a.code = $3
                ON CONFLICT ON CONSTRAINT user_achievements_user_achievement_key DO NOTHING
                RETURNING achievement_id
            ), credited AS (
                UPDATE profiles p
                SET total_points = p.total_points + a.points
                FROM granted g
                JOIN achievements a ON a.id = g.achievement_id
                WHERE p.id = $2
                RETURNING p.id
            )
            SELECT EXISTS (SELECT 1 FROM granted)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .fetch_one(executor)
        .await?;

        if granted {
            tracing::info!(%user_id, code, "achievement granted");
        }
        Ok(granted)
    }

    pub async fn list_earned(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<EarnedAchievementRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT a.id, a.code, a.name, a.description, a.points, a.icon, ua.earned_at
            FROM user_achievements ua
            JOIN achievements a ON a.id = ua.achievement_id
            WHERE ua.user_id = $1
            ORDER BY ua.earned_at
            "#,
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
