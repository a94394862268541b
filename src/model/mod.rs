//! Wire types of the course server.

mod course;
mod lesson;

pub use course::{Category, Course, CourseForm};
pub use lesson::Lesson;

use std::collections::HashMap;

use serde::Deserialize;

/// Body of `GET /api/courses`: courses keyed by id.
#[derive(Debug, Clone, Deserialize)]
pub struct CoursesPayload {
    pub payload: HashMap<String, Course>,
}

impl CoursesPayload {
    /// The courses ordered by id.
    pub fn into_courses(self) -> Vec<Course> {
        let mut courses: Vec<Course> = self.payload.into_values().collect();
        courses.sort_by_key(|course| course.id);
        courses
    }
}

/// Body of `GET /api/lessons`.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonsPayload {
    pub payload: Vec<Lesson>,
}
