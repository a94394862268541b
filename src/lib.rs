//! `rxcourses` is a reactive client for a course catalogue server.
//!
//! The crate is built on a small push-based reactive core: cold [`Observable`]s,
//! [`Subscriber`](subscribe::Subscriber)s and cancellable
//! [`Subscription`](subscribe::Subscription)s, plus multicasting subjects split into
//! an emitter and a receiver. On top of it sit:
//!
//! - a cancellable HTTP adapter turning a GET into a single-value observable whose
//!   unsubscribe aborts the request ([`HttpClient`]);
//! - typed endpoints of the course server ([`CoursesApi`]);
//! - an explicitly owned course list holder ([`CourseStore`]);
//! - the debounced, switch-to-latest lesson search ([`search`]);
//! - the course dialog save stream with a save policy per trigger ([`dialog`]).
//!
//! # Example
//!
//! ```no_run
//! use rxcourses::{
//!     model::Course, subscribe::Subscriber, ClientConfig, CourseStore, CoursesApi, Subscribeable,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let api = CoursesApi::new(&config)?;
//!
//!     let store = CourseStore::new();
//!     store.init(&api);
//!
//!     store
//!         .select_beginner_courses()
//!         .subscribe(Subscriber::on_next(|courses: Vec<Course>| {
//!             println!("{} beginner courses", courses.len())
//!         }));
//!     Ok(())
//! }
//! ```

mod errors;
mod observable;
mod observer;
mod subscription;

pub mod api;
pub mod config;
pub mod dialog;
pub mod http;
pub mod model;
pub mod search;
pub mod store;
pub mod subjects;

pub use api::CoursesApi;
pub use config::ClientConfig;
pub use errors::*;
pub use http::{HttpClient, RequestOptions, RetryPolicy};
pub use observable::*;
pub use observer::{Observer, StreamError};
pub use store::CourseStore;
pub use subjects::{BehaviorSubject, ReplaySubject, Subject};
pub use subscription::*;
pub use subscription::subscribe::{Subscribeable, Unsubscribeable};

use std::sync::{Mutex, MutexGuard, PoisonError};

// Poisoned locks are entered anyway, the state they guard stays consistent
// between callbacks.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
