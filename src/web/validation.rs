//! Input rules applied by the handlers before anything reaches the model.
//!
//! Every check appends a human readable message; a non-empty list is turned
//! into a `400` by [`Validator::finish`].

use std::sync::LazyLock;

use regex::Regex;

use crate::web::{WebError, WebResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 4000;
pub const DIFFICULTIES: [&str; 3] = ["beginner", "intermediate", "advanced"];
pub const LESSON_TYPES: [&str; 3] = ["text", "video", "quiz"];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("valid username regex"));

static PASSWORD_SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@$!%*?&]").expect("valid special char regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email) && !email.contains("..")
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

pub fn password_errors(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be no more than {MAX_PASSWORD_LENGTH} characters long"
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(String::from("Password must contain at least one lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(String::from("Password must contain at least one uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(String::from("Password must contain at least one digit"));
    }
    if !PASSWORD_SPECIAL.is_match(password) {
        errors.push(String::from(
            "Password must contain at least one special character (@$!%*?&)",
        ));
    }
    errors
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    pub fn username(&mut self, username: &str) -> &mut Self {
        self.check(
            is_valid_username(username),
            "Username must be 3-30 characters of letters, digits or underscore",
        )
    }

    pub fn email(&mut self, email: &str) -> &mut Self {
        self.check(is_valid_email(email), "Email address is invalid")
    }

    pub fn password(&mut self, password: &str) -> &mut Self {
        self.errors.extend(password_errors(password));
        self
    }

    pub fn course(&mut self, title: &str, description: &str, difficulty: &str) -> &mut Self {
        let title_len = title.trim().chars().count();
        self.check(title_len >= 3, "Course title must be at least 3 characters long")
            .check(title_len <= 200, "Course title must be no more than 200 characters")
            .check(
                description.chars().count() <= 2000,
                "Course description must be no more than 2000 characters",
            )
            .difficulty(difficulty)
    }

    pub fn difficulty(&mut self, difficulty: &str) -> &mut Self {
        self.check(
            DIFFICULTIES.contains(&difficulty),
            format!("Difficulty must be one of: {}", DIFFICULTIES.join(", ")),
        )
    }

    pub fn lesson_type(&mut self, lesson_type: &str) -> &mut Self {
        self.check(
            LESSON_TYPES.contains(&lesson_type),
            format!("Lesson type must be one of: {}", LESSON_TYPES.join(", ")),
        )
    }

    pub fn title(&mut self, field: &str, title: &str) -> &mut Self {
        let len = title.trim().chars().count();
        self.check(
            (1..=200).contains(&len),
            format!("{field} title must be 1-200 characters long"),
        )
    }

    pub fn percentage(&mut self, value: f64) -> &mut Self {
        self.check(
            value.is_finite() && (0.0..=100.0).contains(&value),
            "Progress percentage must be between 0 and 100",
        )
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value >= 0, format!("{field} must not be negative"))
    }

    pub fn chat_message(&mut self, message: &str) -> &mut Self {
        self.check(!message.trim().is_empty(), "Message must not be empty")
            .check(
                message.chars().count() <= MAX_CHAT_MESSAGE_LENGTH,
                format!("Message must be no more than {MAX_CHAT_MESSAGE_LENGTH} characters"),
            )
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn finish(&mut self) -> WebResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(WebError::validation(std::mem::take(&mut self.errors)))
        }
    }
}
