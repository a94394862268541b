//! Typed endpoints of the course server.

use tracing::debug;

use crate::{
    http::{HttpClient, RequestOptions},
    model::{Course, CourseForm, CoursesPayload, Lesson, LessonsPayload},
    ClientConfig, ConfigError, Observable, ObservableExt,
};

/// The course server endpoints as cold observables.
///
/// Every method returns immediately, the request is sent on subscription.
#[derive(Debug, Clone)]
pub struct CoursesApi {
    http: HttpClient,
    page_size: u32,
    options: RequestOptions,
}

impl CoursesApi {
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_http(HttpClient::new(config)?, config))
    }

    /// Uses an existing [`HttpClient`], taking page size and retry policy from
    /// `config`.
    pub fn with_http(http: HttpClient, config: &ClientConfig) -> Self {
        CoursesApi {
            http,
            page_size: config.lessons_page_size,
            options: RequestOptions {
                retry: config.retry.clone(),
            },
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// `GET /api/courses`, the courses ordered by id.
    pub fn courses(&self) -> Observable<Vec<Course>> {
        match self.http.endpoint("api/courses", &[]) {
            Ok(url) => self
                .http
                .get_json::<CoursesPayload>(url, &self.options)
                .map(CoursesPayload::into_courses)
                .tap(|courses| debug!(count = courses.len(), "courses loaded")),
            Err(e) => Observable::throw(e),
        }
    }

    /// `GET /api/courses/<id>`.
    pub fn course(&self, course_id: u64) -> Observable<Course> {
        match self.http.endpoint(&format!("api/courses/{course_id}"), &[]) {
            Ok(url) => self.http.get_json(url, &self.options),
            Err(e) => Observable::throw(e),
        }
    }

    /// `GET /api/lessons` of a course whose title matches `filter`. An empty
    /// filter loads the first page of all lessons.
    pub fn lessons(&self, course_id: u64, filter: &str) -> Observable<Vec<Lesson>> {
        let course_id = course_id.to_string();
        let page_size = self.page_size.to_string();
        let query = [
            ("courseId", course_id.as_str()),
            ("pageSize", page_size.as_str()),
            ("filter", filter),
        ];
        match self.http.endpoint("api/lessons", &query) {
            Ok(url) => self
                .http
                .get_json::<LessonsPayload>(url, &self.options)
                .map(|lessons| lessons.payload),
            Err(e) => Observable::throw(e),
        }
    }

    /// `PUT /api/courses/<id>` with the form as JSON body. Never retried.
    pub fn save_course(&self, course_id: u64, form: &CourseForm) -> Observable<()> {
        match self.http.endpoint(&format!("api/courses/{course_id}"), &[]) {
            Ok(url) => self.http.put_json(url, form, &RequestOptions::default()),
            Err(e) => Observable::throw(e),
        }
    }
}
