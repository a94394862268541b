#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rxcourses::{subscribe::Subscriber, StreamError};

/// Shared record of everything delivered to the subscribers it creates.
pub struct Emissions<T> {
    nexts: Arc<Mutex<Vec<T>>>,
    errors: Arc<Mutex<Vec<StreamError>>>,
    completes: Arc<Mutex<usize>>,
}

impl<T> Clone for Emissions<T> {
    fn clone(&self) -> Self {
        Emissions {
            nexts: Arc::clone(&self.nexts),
            errors: Arc::clone(&self.errors),
            completes: Arc::clone(&self.completes),
        }
    }
}

impl<T: Clone + Send + 'static> Emissions<T> {
    pub fn new() -> Self {
        Emissions {
            nexts: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            completes: Arc::new(Mutex::new(0)),
        }
    }

    /// A new subscriber recording into this record.
    pub fn subscriber(&self) -> Subscriber<T> {
        let nexts = Arc::clone(&self.nexts);
        let errors = Arc::clone(&self.errors);
        let completes = Arc::clone(&self.completes);
        Subscriber::new(
            move |v| nexts.lock().unwrap().push(v),
            move |e| errors.lock().unwrap().push(e),
            move || *completes.lock().unwrap() += 1,
        )
    }

    pub fn nexts(&self) -> Vec<T> {
        self.nexts.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn completes(&self) -> usize {
        *self.completes.lock().unwrap()
    }

    /// Waits until `count` values were recorded, panics after two seconds.
    pub async fn wait_for_nexts(&self, count: usize) {
        for _ in 0..200 {
            if self.nexts.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} values, got {}", self.nexts.lock().unwrap().len());
    }

    /// Waits until a terminal signal was recorded, panics after two seconds.
    pub async fn wait_for_terminal(&self) {
        for _ in 0..200 {
            if self.completes() > 0 || !self.errors.lock().unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("stream did not terminate");
    }
}
