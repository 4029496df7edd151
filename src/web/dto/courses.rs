use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    DatabaseResult,
    entity::{Course, CourseCreateUpdate, ModuleOutlineRow},
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CourseBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_category() -> String {
    String::from("general")
}

fn default_difficulty() -> String {
    String::from("beginner")
}

fn default_currency() -> String {
    String::from("KES")
}

impl From<CourseBody> for CourseCreateUpdate {
    fn from(body: CourseBody) -> Self {
        Self {
            title: body.title.trim().to_string(),
            description: body.description,
            category: body.category,
            difficulty: body.difficulty,
            price: body.price,
            currency: body.currency.to_uppercase(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PublishBody {
    pub published: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonShort {
    pub id: Uuid,
    pub title: String,
    pub lesson_type: String,
    pub duration_minutes: i32,
    pub order_index: i32,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleWithLessons {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub lessons: Vec<LessonShort>,
}

impl TryFrom<ModuleOutlineRow> for ModuleWithLessons {
    type Error = serde_json::Error;

    fn try_from(value: ModuleOutlineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            title: value.title,
            description: value.description,
            order_index: value.order_index,
            lessons: serde_json::from_value(value.lessons)?,
        })
    }
}

impl ModuleWithLessons {
    pub fn from_rows(rows: Vec<ModuleOutlineRow>) -> DatabaseResult<Vec<Self>> {
        Ok(rows
            .into_iter()
            .map(ModuleWithLessons::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseOutline {
    pub course: Course,
    pub enrolled: bool,
    pub modules: Vec<ModuleWithLessons>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn outline_row_lessons_are_decoded() {
        let row = ModuleOutlineRow {
            id: Uuid::new_v4(),
            title: String::from("Basics"),
            description: String::new(),
            order_index: 1,
            lessons: serde_json::json!([{
                "id": Uuid::nil(),
                "title": "Variables",
                "lesson_type": "text",
                "duration_minutes": 15,
                "order_index": 1,
                "completed": true
            }]),
        };

        let module = ModuleWithLessons::try_from(row).unwrap();
        assert_eq!(module.lessons.len(), 1);
        assert!(module.lessons[0].completed);
    }

    #[test]
    fn course_body_defaults() {
        let body: CourseBody = serde_json::from_str(r#"{"title":"  Rust  ","currency":"usd"}"#).unwrap();
        let data = CourseCreateUpdate::from(body);
        assert_eq!(data.title, "Rust");
        assert_eq!(data.difficulty, "beginner");
        assert_eq!(data.currency, "USD");
        assert_eq!(data.price, 0);
    }
}
