use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, prelude::FromRow};
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::{AuthenticatedUser, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Profile {
    id: Uuid,
    username: String,
    email: String,
    #[serde(skip)]
    password_hash: String,
    full_name: String,
    role: String,
    total_points: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// On update an empty `password_hash` keeps the stored hash; the role is
/// only set on creation, see [`Profile::set_role`].
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ProfileCreateUpdate {
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub total_points: i64,
}

impl ResourceTyped for Profile {
    fn get_resource_type() -> ResourceType {
        ResourceType::Profile
    }
}

impl Profile {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn total_points(&self) -> i64 {
        self.total_points
    }

    pub fn actor(&self) -> AuthenticatedUser {
        AuthenticatedUser::new(self.id, self.role())
    }
}

#[async_trait]
impl CrudRepository<Profile, ProfileCreateUpdate, Uuid> for Profile {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ProfileCreateUpdate,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO profiles (id, username, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.full_name)
        .bind(data.role.as_str())
        .fetch_one(mm.executor())
        .await?;

        Ok(created)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ProfileCreateUpdate,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as(
            r#"
            UPDATE profiles
            SET username = $1,
                email = $2,
                full_name = $3,
                password_hash = CASE WHEN $4 = '' THEN password_hash ELSE $4 END
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.full_name)
        .bind(&data.password_hash)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM profiles WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM profiles ORDER BY created_at LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Profile, ProfileCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for Profile {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of profiles are themselves
    }
}

impl Profile {
    pub async fn find_by_username(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        username: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM profiles WHERE username = $1")
            .bind(username)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Sign in accepts either the username or the e-mail address.
    pub async fn find_by_login(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        login: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM profiles WHERE username = $1 OR lower(email) = lower($1) LIMIT 1",
        )
        .bind(login)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn set_role(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        role: UserRole,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as("UPDATE profiles SET role = $1 WHERE id = $2 RETURNING *")
            .bind(role.as_str())
            .bind(self.id)
            .fetch_one(mm.executor())
            .await?;
        Ok(updated)
    }

    pub async fn add_points(mm: &ModelManager, user_id: Uuid, points: i64) -> DatabaseResult<()> {
        Self::add_points_in(mm.executor(), user_id, points).await
    }

    pub async fn add_points_in<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        points: i64,
    ) -> DatabaseResult<()> {
        if points <= 0 {
            return Ok(());
        }

        sqlx::query("UPDATE profiles SET total_points = total_points + $1 WHERE id = $2")
            .bind(points)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn leaderboard(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
    ) -> DatabaseResult<Vec<LeaderboardEntry>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                ROW_NUMBER() OVER (ORDER BY total_points DESC, created_at) AS rank,
                id AS user_id,
                username,
                full_name,
                total_points
            FROM profiles
            ORDER BY total_points DESC, created_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
