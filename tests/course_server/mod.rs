#![allow(dead_code)]

use std::time::Duration;

use rxcourses::{ClientConfig, CoursesApi};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub fn course_json(id: u64, description: &str, category: &str) -> Value {
    json!({
        "id": id,
        "description": description,
        "longDescription": format!("{description}, the long version"),
        "iconUrl": format!("https://example.com/{id}.png"),
        "category": category,
        "lessonsCount": 10,
        "seqNo": id
    })
}

pub fn courses_body() -> Value {
    json!({
        "payload": {
            "1": course_json(1, "RxJs In Practice", "BEGINNER"),
            "2": course_json(2, "RxJs Advanced Patterns", "ADVANCED"),
            "3": course_json(3, "Angular Core Deep Dive", "BEGINNER")
        }
    })
}

pub fn lessons_body(course_id: u64, titles: &[&str]) -> Value {
    let lessons: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            json!({
                "id": course_id * 100 + i as u64,
                "courseId": course_id,
                "description": title,
                "seqNo": i + 1,
                "duration": "4:17"
            })
        })
        .collect();
    json!({ "payload": lessons })
}

/// Mounts `GET /api/courses` answering with [`courses_body`].
pub async fn mount_courses(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(courses_body()))
        .mount(server)
        .await;
}

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(&server.uri())
        .unwrap()
        .with_request_timeout(Duration::from_secs(5))
}

pub fn api(server: &MockServer) -> CoursesApi {
    CoursesApi::new(&config(server)).unwrap()
}
