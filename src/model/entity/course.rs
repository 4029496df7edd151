use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;

/// Courses are visible to everybody once published. Drafts are only visible
/// to their instructor and to admins; for anybody else they do not exist.
const VISIBLE: &str = "(c.is_published OR c.instructor_id = $1 OR $2)";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    instructor_id: Uuid,
    title: String,
    description: String,
    category: String,
    difficulty: String,
    price: i64,
    currency: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreateUpdate {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub price: i64,
    pub currency: String,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> ResourceType {
        ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instructor_id(&self) -> Uuid {
        self.instructor_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }

    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreateUpdate, Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreateUpdate,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO courses (id, instructor_id, title, description, category, difficulty, price, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.difficulty)
        .bind(data.price)
        .bind(&data.currency)
        .fetch_one(mm.executor())
        .await?;

        Ok(created)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreateUpdate,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as(
            r#"
            UPDATE courses
            SET title = $1, description = $2, category = $3, difficulty = $4, price = $5, currency = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.difficulty)
        .bind(data.price)
        .bind(&data.currency)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
            "SELECT c.* FROM courses c WHERE {VISIBLE} AND c.id = $3"
        ))
        .bind(actor.user_id())
        .bind(actor.is_admin())
        .bind(id)
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
            "SELECT c.* FROM courses c WHERE {VISIBLE} ORDER BY c.created_at DESC LIMIT $3 OFFSET $4"
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
        let result: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM courses c WHERE {VISIBLE}"))
                .bind(actor.user_id())
                .bind(actor.is_admin())
                .fetch_one(mm.executor())
                .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Course, CourseCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for Course {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.instructor_id)
    }
}

impl Course {
    pub async fn set_published(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        published: bool,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as("UPDATE courses SET is_published = $1 WHERE id = $2 RETURNING *")
            .bind(published)
            .bind(self.id)
            .fetch_one(mm.executor())
            .await?;
        Ok(updated)
    }

    pub async fn find_by_title(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        title: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE title = $1 LIMIT 1")
            .bind(title)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn lesson_count(&self, mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            "#,
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }
}

// Utils

/// Course outline entry: a module with its lessons and the caller's
/// completion status for each of them. Lesson content is not included.
#[derive(Debug, sqlx::FromRow)]
pub struct ModuleOutlineRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub lessons: serde_json::Value,
}

impl ModuleOutlineRow {
    pub async fn fetch_for_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            m.id,
            m.title,
            m.description,
            m.order_index,
            COALESCE(
                json_agg(
                    json_build_object(
                        'id', l.id,
                        'title', l.title,
                        'lesson_type', l.lesson_type,
                        'duration_minutes', l.duration_minutes,
                        'order_index', l.order_index,
                        'completed', lp.completed_at IS NOT NULL
                    )
                    ORDER BY l.order_index
                ) FILTER (WHERE l.id IS NOT NULL),
                '[]'
            ) AS lessons
            FROM modules m
            LEFT JOIN lessons l ON l.module_id = m.id
            LEFT JOIN lesson_progress lp
            ON lp.lesson_id = l.id
            AND lp.user_id = $1
            WHERE m.course_id = $2
            GROUP BY m.id
            ORDER BY m.order_index;
            "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}
