use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::FormError;

/// Difficulty category of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Beginner,
    Advanced,
}

/// A course as served by `/api/courses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_list_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lessons_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u32>,
}

impl Course {
    /// Overwrites the editable fields with the values of `form`.
    ///
    /// A form without category leaves the category unchanged.
    pub fn apply(&mut self, form: &CourseForm) {
        self.description.clone_from(&form.description);
        self.long_description.clone_from(&form.long_description);
        if let Some(category) = form.category {
            self.category = category;
        }
        self.released_at = Some(form.released_at);
    }
}

/// The editable fields of a course, as edited in the course dialog and sent as
/// the body of `PUT /api/courses/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CourseForm {
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(required(message = "category is required"))]
    pub category: Option<Category>,
    pub released_at: DateTime<Utc>,
    #[validate(length(min = 1, message = "long description is required"))]
    pub long_description: String,
}

impl CourseForm {
    /// Form pre-filled from `course`. A course without release date gets the
    /// current time.
    pub fn from_course(course: &Course) -> Self {
        CourseForm {
            description: course.description.clone(),
            category: Some(course.category),
            released_at: course.released_at.unwrap_or_else(Utc::now),
            long_description: course.long_description.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns every failed field rule.
    pub fn check(&self) -> Result<(), FormError> {
        self.validate().map_err(FormError)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<&Course> for CourseForm {
    fn from(course: &Course) -> Self {
        CourseForm::from_course(course)
    }
}
