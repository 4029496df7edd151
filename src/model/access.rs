use uuid::Uuid;

use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::AuthenticatedUser,
};

#[async_trait::async_trait]
pub trait HasOwner {
    type OwnerId: PartialEq + Send + Sync;
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        ctx: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId>;
}

pub async fn check_access<T: HasOwner<OwnerId = O> + Sync, O: PartialEq + Send + Sync>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
    expected: O,
) -> DatabaseResult<()> {
    // admin can get all resources
    if ctx.is_admin() {
        return Ok(());
    }

    let actual_owner = resource.get_owner_id(mm, ctx).await?;
    if actual_owner == expected {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}

/// Lesson content and submissions are open to enrolled learners, the course
/// instructor and admins.
pub async fn ensure_enrolled(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    course_id: Uuid,
) -> DatabaseResult<()> {
    if ctx.is_admin() {
        return Ok(());
    }

    let allowed: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM courses c
            WHERE c.id = $1
              AND (c.instructor_id = $2
                   OR EXISTS (SELECT 1 FROM enrollments e
                              WHERE e.course_id = c.id AND e.user_id = $2))
        )
        "#,
    )
    .bind(course_id)
    .bind(ctx.user_id())
    .fetch_one(mm.executor())
    .await?;

    if allowed {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}
