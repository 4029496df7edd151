use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Exercise {
    id: Uuid,
    lesson_id: Uuid,
    title: String,
    description: String,
    starter_code: String,
    language: String,
    difficulty: String,
    points: i32,
    order_index: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ExerciseCreate {
    pub lesson_id: Uuid,
    pub title: String,
    pub description: String,
    pub starter_code: String,
    pub language: String,
    pub difficulty: String,
    pub points: i32,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Exercise {
    fn get_resource_type() -> ResourceType {
        ResourceType::Exercise
    }
}

impl Exercise {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

const VISIBLE_JOIN: &str = r#"
    FROM exercises x
    JOIN lessons l ON l.id = x.lesson_id
    JOIN modules m ON m.id = l.module_id
    JOIN courses c ON c.id = m.course_id
"#;

#[async_trait]
impl CrudRepository<Exercise, ExerciseCreate, Uuid> for Exercise {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ExerciseCreate,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO exercises (id, lesson_id, title, description, starter_code, language, difficulty, points, order_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.lesson_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.starter_code)
        .bind(&data.language)
        .bind(&data.difficulty)
        .bind(data.points)
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;

        Ok(created)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ExerciseCreate,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as(
            r#"
            UPDATE exercises
            SET title = $1, description = $2, starter_code = $3, language = $4,
                difficulty = $5, points = $6, order_index = $7
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.starter_code)
        .bind(&data.language)
        .bind(&data.difficulty)
        .bind(data.points)
        .bind(data.order_index.unwrap_or(self.order_index))
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(&format!(
            "SELECT x.* {VISIBLE_JOIN} WHERE x.id = $1 AND (c.is_published OR c.instructor_id = $2 OR $3)"
        ))
        .bind(id)
        .bind(actor.user_id())
        .bind(actor.is_admin())
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(&format!(
            r#"
            SELECT x.* {VISIBLE_JOIN}
            WHERE c.is_published OR c.instructor_id = $1 OR $2
            ORDER BY x.lesson_id, x.order_index
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(actor.user_id())
        .bind(actor.is_admin())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) {VISIBLE_JOIN} WHERE c.is_published OR c.instructor_id = $1 OR $2"
        ))
        .bind(actor.user_id())
        .bind(actor.is_admin())
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Exercise {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner = sqlx::query_scalar(&format!("SELECT c.instructor_id {VISIBLE_JOIN} WHERE x.id = $1"))
            .bind(self.id)
            .fetch_one(mm.executor())
            .await?;
        Ok(owner)
    }
}

impl Exercise {
    pub async fn list_for_lesson(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM exercises WHERE lesson_id = $1 ORDER BY order_index")
            .bind(lesson_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let course_id = sqlx::query_scalar(&format!("SELECT c.id {VISIBLE_JOIN} WHERE x.id = $1"))
            .bind(self.id)
            .fetch_one(mm.executor())
            .await?;
        Ok(course_id)
    }
}
