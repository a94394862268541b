//! In-memory holder of the course list.
//!
//! A [`CourseStore`] is created explicitly and shared by cloning. It keeps the
//! last fetched course list in a [`BehaviorSubject`](crate::BehaviorSubject), so
//! every selector emits the current list right away and again after every
//! change.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    model::{Category, Course, CourseForm},
    observer::Observer,
    subjects::{BehaviorSubject, BehaviorSubjectEmitter, BehaviorSubjectReceiver},
    subscribe::{Subscriber, Subscription},
    CoursesApi, Observable, ObservableExt, StoreError, Subscribeable,
};

#[derive(Clone)]
pub struct CourseStore {
    emitter: BehaviorSubjectEmitter<Vec<Course>>,
    receiver: BehaviorSubjectReceiver<Vec<Course>>,
}

impl Default for CourseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseStore {
    /// An empty store.
    pub fn new() -> Self {
        let (emitter, receiver) = BehaviorSubject::emitter_receiver(Vec::new());
        CourseStore { emitter, receiver }
    }

    /// Loads the course list and replaces the stored one with it.
    ///
    /// A failed load is logged and leaves the store unchanged. The returned
    /// subscription can be awaited or unsubscribed to abort the load.
    pub fn init(&self, api: &CoursesApi) -> Subscription {
        let mut emitter = self.emitter.clone();
        let mut subscriber = Subscriber::on_next(move |courses: Vec<Course>| {
            debug!(count = courses.len(), "course store replaced");
            emitter.next(courses);
        });
        subscriber.on_error(|e| warn!(error = %e, "failed to load courses"));

        api.courses().subscribe(subscriber)
    }

    /// The stored courses, now and after every change.
    pub fn courses(&self) -> Observable<Vec<Course>> {
        self.receiver.clone().into()
    }

    /// Copy of the stored courses.
    pub fn snapshot(&self) -> Vec<Course> {
        self.receiver.value()
    }

    pub fn filter_by_category(&self, category: Category) -> Observable<Vec<Course>> {
        self.courses().map(move |courses| {
            courses
                .into_iter()
                .filter(|course| course.category == category)
                .collect()
        })
    }

    pub fn select_beginner_courses(&self) -> Observable<Vec<Course>> {
        self.filter_by_category(Category::Beginner)
    }

    pub fn select_advanced_courses(&self) -> Observable<Vec<Course>> {
        self.filter_by_category(Category::Advanced)
    }

    /// The course with `course_id`, emitted whenever the course list changes
    /// and skipped while the store does not contain it.
    pub fn select_course_by_id(&self, course_id: u64) -> Observable<Course> {
        self.courses()
            .filter_map(move |courses| courses.into_iter().find(|course| course.id == course_id))
    }

    /// Saves `form` as the new state of the course.
    ///
    /// On subscription the stored course is updated right away, then the PUT
    /// is sent. A failed PUT is reported through the returned observable, the
    /// local change is kept. An unknown course or an invalid form fails without
    /// touching the store or the network.
    pub fn save_course(
        &self,
        api: &CoursesApi,
        course_id: u64,
        form: &CourseForm,
    ) -> Observable<()> {
        let store = self.clone();
        let form = form.clone();
        let mut request = api.save_course(course_id, &form);

        Observable::new(move |mut o: Subscriber<()>| {
            if let Err(e) = store.apply_locally(course_id, &form) {
                warn!(course_id, error = %e, "course not saved");
                o.error(Arc::new(e));
                return Subscription::nil();
            }
            request.subscribe(o)
        })
    }

    fn apply_locally(&self, course_id: u64, form: &CourseForm) -> Result<(), StoreError> {
        form.check()?;

        let mut courses = self.snapshot();
        let course = courses
            .iter_mut()
            .find(|course| course.id == course_id)
            .ok_or(StoreError::UnknownCourse(course_id))?;
        course.apply(form);

        self.emitter.clone().next(courses);
        Ok(())
    }
}
