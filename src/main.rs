use rxcourses::{
    model::{Course, Lesson},
    search,
    subscribe::Subscriber,
    ClientConfig, CourseStore, CoursesApi, Subscribeable,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rxcourses=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    info!(base_url = %config.base_url, "loading courses");

    let api = CoursesApi::new(&config)?;
    let store = CourseStore::new();
    store.init(&api).join_concurrent().await?;

    let courses = store.snapshot();
    for course in &courses {
        info!(id = course.id, category = ?course.category, "{}", course.description);
    }

    let Some(first) = courses.first() else {
        warn!("the server has no courses");
        return Ok(());
    };

    search::course_page(&api, &store, first.id)
        .subscribe(Subscriber::on_next(|(lessons, course): (Vec<Lesson>, Course)| {
            info!(
                course = %course.description,
                lessons = lessons.len(),
                "course page loaded"
            );
        }))
        .join_concurrent()
        .await?;

    Ok(())
}
