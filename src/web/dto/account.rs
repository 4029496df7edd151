use serde::{Deserialize, Serialize};

use crate::{model::entity::Profile, web::UserRole};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    /// `student` (default) or `instructor`
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginBody {
    /// Username or e-mail address
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProfileUpdateBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleUpdateBody {
    pub role: UserRole,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub profile: Profile,
}

impl AuthResponse {
    pub fn bearer(token: String, profile: Profile) -> Self {
        Self {
            token,
            token_type: "Bearer",
            profile,
        }
    }
}
