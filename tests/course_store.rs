mod course_server;
mod record_emissions;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use course_server::{api, courses_body, mount_courses};
use record_emissions::Emissions;
use rxcourses::model::{Category, Course, CourseForm};
use rxcourses::subscribe::{Subscriber, Subscription};
use rxcourses::{search, CourseStore, FetchError, ObservableExt, StoreError, Subscribeable};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ids(courses: &[Course]) -> Vec<u64> {
    courses.iter().map(|c| c.id).collect()
}

async fn loaded_store(server: &MockServer) -> CourseStore {
    mount_courses(server).await;
    let store = CourseStore::new();
    store.init(&api(server)).join_concurrent().await.unwrap();
    store
}

fn edited_form(store: &CourseStore, course_id: u64) -> CourseForm {
    let course = store
        .snapshot()
        .into_iter()
        .find(|c| c.id == course_id)
        .unwrap();
    let mut form = CourseForm::from_course(&course);
    form.description = "RxJs In Practice, 2nd edition".to_string();
    form.category = Some(Category::Advanced);
    form
}

#[tokio::test]
async fn selectors_split_the_course_list_by_category() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;

    let beginner = Emissions::new();
    let advanced = Emissions::new();
    store.select_beginner_courses().subscribe(beginner.subscriber());
    store.select_advanced_courses().subscribe(advanced.subscriber());

    assert_eq!(ids(&beginner.nexts()[0]), vec![1, 3]);
    assert_eq!(ids(&advanced.nexts()[0]), vec![2]);
    assert_eq!(beginner.completes(), 0);
}

#[tokio::test]
async fn selectors_emit_the_empty_list_before_init() {
    let store = CourseStore::new();
    let beginner = Emissions::new();
    let course = Emissions::new();

    store.select_beginner_courses().subscribe(beginner.subscriber());
    store.select_course_by_id(1).subscribe(course.subscriber());

    assert_eq!(beginner.nexts(), vec![Vec::<Course>::new()]);
    assert!(course.nexts().is_empty());
}

#[tokio::test]
async fn failed_init_keeps_the_store_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = CourseStore::new();
    store.init(&api(&server)).join_concurrent().await.unwrap();

    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn shared_course_list_is_fetched_once_for_both_categories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(courses_body())
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let courses = api(&server).courses().share_replay();
    let beginner = Emissions::new();
    let advanced = Emissions::new();

    courses
        .clone()
        .map(|courses| ids(&courses).into_iter().filter(|id| id % 2 == 1).collect::<Vec<_>>())
        .subscribe(beginner.subscriber());
    courses
        .clone()
        .map(|courses| courses.len())
        .subscribe(advanced.subscriber());

    beginner.wait_for_nexts(1).await;
    advanced.wait_for_nexts(1).await;

    // A subscriber joining after the response gets the replayed list.
    let late = Emissions::new();
    courses.clone().subscribe(late.subscriber());

    assert_eq!(beginner.nexts(), vec![vec![1, 3]]);
    assert_eq!(advanced.nexts(), vec![3]);
    assert_eq!(ids(&late.nexts()[0]), vec![1, 2, 3]);
    assert!(courses.is_connected());
}

#[tokio::test]
async fn save_updates_the_store_before_the_put_completes() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/courses/1"))
        .and(body_partial_json(json!({
            "description": "RxJs In Practice, 2nd edition",
            "category": "ADVANCED",
            "longDescription": "RxJs In Practice, the long version"
        })))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let advanced = Emissions::new();
    store.select_advanced_courses().subscribe(advanced.subscriber());

    let saved = Emissions::new();
    let form = edited_form(&store, 1);
    let subscription = store.save_course(&api(&server), 1, &form).subscribe(saved.subscriber());

    // The local change is visible while the request is still in flight.
    assert_eq!(ids(&advanced.nexts()[1]), vec![1, 2]);
    assert!(saved.nexts().is_empty());

    subscription.join_concurrent().await.unwrap();

    assert_eq!(saved.nexts(), vec![()]);
    assert_eq!(saved.completes(), 1);
    let course = store.snapshot().into_iter().find(|c| c.id == 1).unwrap();
    assert_eq!(course.description, "RxJs In Practice, 2nd edition");
    assert_eq!(course.released_at, Some(form.released_at));
}

#[tokio::test]
async fn store_subscriber_may_save_in_response_to_a_change() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/courses/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let saves = Arc::new(Mutex::new(Vec::<Subscription>::new()));
    let (seen_c, saves_c) = (Arc::clone(&seen), Arc::clone(&saves));
    let (store_c, api_c) = (store.clone(), api(&server));
    let form = edited_form(&store, 1);

    store
        .select_course_by_id(1)
        .subscribe(Subscriber::on_next(move |course: Course| {
            seen_c.lock().unwrap().push(course.category);
            if course.category == Category::Beginner {
                let save = store_c
                    .save_course(&api_c, 1, &form)
                    .subscribe(Subscriber::on_next(|()| {}));
                saves_c.lock().unwrap().push(save);
            }
        }));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Category::Beginner, Category::Advanced]
    );

    let save = saves.lock().unwrap().pop().unwrap();
    save.join_concurrent().await.unwrap();
    assert_eq!(store.snapshot()[0].category, Category::Advanced);
}

#[tokio::test]
async fn failed_save_keeps_the_local_change() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/courses/1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let saved = Emissions::<()>::new();
    store
        .save_course(&api(&server), 1, &edited_form(&store, 1))
        .subscribe(saved.subscriber())
        .join_concurrent()
        .await
        .unwrap();

    let errors = saved.errors();
    assert_eq!(errors[0].downcast_ref::<FetchError>().unwrap().status(), Some(500));
    assert_eq!(store.snapshot()[0].category, Category::Advanced);
}

#[tokio::test]
async fn saving_an_unknown_course_fails_without_a_request() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let form = edited_form(&store, 1);
    let saved = Emissions::<()>::new();
    store
        .save_course(&api(&server), 99, &form)
        .subscribe(saved.subscriber())
        .join_concurrent()
        .await
        .unwrap();

    let errors = saved.errors();
    assert!(matches!(
        errors[0].downcast_ref::<StoreError>(),
        Some(StoreError::UnknownCourse(99))
    ));
    assert_eq!(store.snapshot()[0].description, "RxJs In Practice");
}

#[tokio::test]
async fn invalid_form_is_never_saved() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut form = edited_form(&store, 1);
    form.description.clear();
    let saved = Emissions::<()>::new();
    store
        .save_course(&api(&server), 1, &form)
        .subscribe(saved.subscriber())
        .join_concurrent()
        .await
        .unwrap();

    assert!(matches!(
        saved.errors()[0].downcast_ref::<StoreError>(),
        Some(StoreError::InvalidForm(_))
    ));
    assert_eq!(store.snapshot()[0].description, "RxJs In Practice");
}

#[tokio::test]
async fn course_page_pairs_lessons_with_the_stored_course() {
    let server = MockServer::start().await;
    let store = loaded_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/lessons"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(course_server::lessons_body(3, &["Intro", "Components"])),
        )
        .mount(&server)
        .await;

    let page = Emissions::new();
    search::course_page(&api(&server), &store, 3)
        .subscribe(page.subscriber())
        .join_concurrent()
        .await
        .unwrap();

    let (lessons, course) = page.nexts().remove(0);
    assert_eq!(course.description, "Angular Core Deep Dive");
    assert_eq!(lessons.len(), 2);
    assert_eq!(page.completes(), 1);

    // Without the course in the store the lessons are dropped.
    let missing = Emissions::new();
    search::course_page(&api(&server), &CourseStore::new(), 3)
        .subscribe(missing.subscriber())
        .join_concurrent()
        .await
        .unwrap();

    assert!(missing.nexts().is_empty());
    assert_eq!(missing.completes(), 1);
}
