mod course_server;
mod record_emissions;

use std::time::Duration;

use course_server::{api, lessons_body};
use record_emissions::Emissions;
use rxcourses::model::Lesson;
use rxcourses::search::{lessons_with_search, search_lessons};
use rxcourses::{ObservableExt, Observer, Subject, Subscribeable};
use tokio::time::sleep;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUIET: Duration = Duration::from_millis(50);

async fn mount_search(server: &MockServer, filter: &str, titles: &[&str], delay: u64, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/lessons"))
        .and(query_param("courseId", "1"))
        .and(query_param("filter", filter))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(lessons_body(1, titles))
                .set_delay(Duration::from_millis(delay)),
        )
        .expect(calls)
        .mount(server)
        .await;
}

fn titles(lessons: Vec<Lesson>) -> Vec<String> {
    lessons.into_iter().map(|l| l.title).collect()
}

#[tokio::test]
async fn only_the_latest_term_reaches_the_subscriber() {
    let server = MockServer::start().await;
    mount_search(&server, "a", &["slow result"], 400, 1).await;
    mount_search(&server, "ab", &["fast result"], 20, 1).await;

    let (mut keystrokes, typed) = Subject::emitter_receiver();
    let results = Emissions::new();
    search_lessons(&api(&server), 1, typed, QUIET)
        .map(titles)
        .subscribe(results.subscriber());

    keystrokes.next("a".to_string());
    sleep(Duration::from_millis(120)).await;
    keystrokes.next("ab".to_string());

    results.wait_for_nexts(1).await;
    // Past the moment the stale response would have arrived.
    sleep(Duration::from_millis(500)).await;

    assert_eq!(results.nexts(), vec![vec!["fast result".to_string()]]);
}

#[tokio::test]
async fn bursts_and_repeated_terms_send_one_request() {
    let server = MockServer::start().await;
    mount_search(&server, "r", &[], 0, 0).await;
    mount_search(&server, "rx", &[], 0, 0).await;
    mount_search(&server, "rxjs", &[], 0, 0).await;
    mount_search(&server, "rxj", &["Operators"], 0, 1).await;

    let (mut keystrokes, typed) = Subject::emitter_receiver();
    let results = Emissions::new();
    search_lessons(&api(&server), 1, typed, QUIET)
        .map(titles)
        .subscribe(results.subscriber());

    for term in ["r", "rx", "rxj"] {
        keystrokes.next(term.to_string());
        sleep(Duration::from_millis(10)).await;
    }
    results.wait_for_nexts(1).await;

    // Typing and deleting a character settles on the term already searched.
    keystrokes.next("rxjs".to_string());
    sleep(Duration::from_millis(10)).await;
    keystrokes.next("rxj".to_string());
    sleep(Duration::from_millis(200)).await;

    assert_eq!(results.nexts(), vec![vec!["Operators".to_string()]]);
}

#[tokio::test]
async fn pending_term_is_searched_when_typing_ends() {
    let server = MockServer::start().await;
    mount_search(&server, "x", &["Exhaust"], 0, 1).await;

    let (mut keystrokes, typed) = Subject::emitter_receiver();
    let results = Emissions::new();
    search_lessons(&api(&server), 1, typed, Duration::from_secs(10))
        .map(titles)
        .subscribe(results.subscriber());

    keystrokes.next("x".to_string());
    keystrokes.complete();
    results.wait_for_terminal().await;

    assert_eq!(results.nexts(), vec![vec!["Exhaust".to_string()]]);
    assert_eq!(results.completes(), 1);
}

#[tokio::test]
async fn all_lessons_are_shown_before_the_first_search() {
    let server = MockServer::start().await;
    mount_search(&server, "", &["Intro", "Setup", "Operators"], 0, 1).await;
    mount_search(&server, "op", &["Operators"], 0, 1).await;

    let (mut keystrokes, typed) = Subject::emitter_receiver();
    let results = Emissions::new();
    lessons_with_search(&api(&server), 1, typed, QUIET)
        .map(titles)
        .subscribe(results.subscriber());

    results.wait_for_nexts(1).await;
    keystrokes.next("op".to_string());
    results.wait_for_nexts(2).await;

    assert_eq!(
        results.nexts(),
        vec![
            vec!["Intro".to_string(), "Setup".to_string(), "Operators".to_string()],
            vec!["Operators".to_string()],
        ]
    );
}
