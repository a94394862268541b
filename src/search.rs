//! Lesson search of the course page.

use std::time::Duration;

use tracing::trace;

use crate::{
    model::{Course, Lesson},
    CourseStore, CoursesApi, Observable, ObservableExt, Subscribeable,
};

/// Turns a stream of search box contents into lesson lists.
///
/// A term is searched once `quiet` passed without a new keystroke, a term
/// equal to the previous one is not searched again, and a newer term
/// unsubscribes the request of the older one so its results are never
/// emitted. When `keystrokes` completes the pending term is still searched.
pub fn search_lessons<K>(
    api: &CoursesApi,
    course_id: u64,
    keystrokes: K,
    quiet: Duration,
) -> Observable<Vec<Lesson>>
where
    K: Subscribeable<ObsType = String> + Send + Sync + 'static,
{
    let api = api.clone();
    keystrokes
        .debounce_time(quiet)
        .distinct_until_changed()
        .tap(move |term| trace!(course_id, %term, "searching lessons"))
        .switch_map(move |term: String| api.lessons(course_id, &term))
}

/// The lesson list shown on the course page: every lesson of the course
/// first, then the results of each search.
pub fn lessons_with_search<K>(
    api: &CoursesApi,
    course_id: u64,
    keystrokes: K,
    quiet: Duration,
) -> Observable<Vec<Lesson>>
where
    K: Subscribeable<ObsType = String> + Send + Sync + 'static,
{
    Observable::concat(vec![
        api.lessons(course_id, ""),
        search_lessons(api, course_id, keystrokes, quiet),
    ])
}

/// The initial lesson load of a course paired with the course as currently
/// held by `store`. Emits nothing if the store does not know the course by
/// the time the lessons arrive.
pub fn course_page(
    api: &CoursesApi,
    store: &CourseStore,
    course_id: u64,
) -> Observable<(Vec<Lesson>, Course)> {
    api.lessons(course_id, "")
        .with_latest_from(store.select_course_by_id(course_id))
}
