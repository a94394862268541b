//! The `subjects` module provides subjects: observables that multicast values pushed
//! into them to every registered subscriber.
//!
//! Subjects are split into an emitter and a receiver using the `emitter_receiver`
//! function.
//!
//! The emitter behaves as an `Observer`, enabling `next()`, `error()` and
//! `complete()` calls. It can also be turned into a `Subscriber` and passed to the
//! `subscribe` method of another `Observable`.
//!
//! The receiver functions as an `Observable`: it can be subscribed to and every
//! operator of `ObservableExt` can be applied to it. Calling `unsubscribe` on the
//! receiver closes the subject and drops all registered subscribers.
//!
//! Three varieties are provided: the basic `Subject` that only forwards live values,
//! `ReplaySubject` that caches emitted values for late subscribers, and
//! `BehaviorSubject` that always holds a current value.
//!
//! Subscribers are called without holding the subject's lock, so a subscriber may
//! subscribe to, unsubscribe from or emit into the subject it is observing.
//! Deliveries of one subject never overlap: a value emitted while another one is
//! being delivered, from a callback or from another thread, is queued and
//! delivered by the emitter already running, right after the current delivery.

mod behavior_subject;
mod replay_subject;
mod subject;

pub use behavior_subject::*;
pub use replay_subject::*;
pub use subject::*;

use std::{
    collections::VecDeque,
    marker::PhantomData,
    sync::{Arc, Mutex},
};

use crate::lock;
use crate::observer::{Observer, StreamError};
use crate::subscription::subscribe::{Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic};

type SharedSubscriber<T> = Arc<Mutex<Subscriber<T>>>;

#[derive(Clone)]
enum Terminal {
    Completed,
    Errored(StreamError),
}

impl Terminal {
    fn deliver<T>(&self, s: &mut Subscriber<T>) {
        match self {
            Terminal::Completed => s.complete(),
            Terminal::Errored(e) => s.error(Arc::clone(e)),
        }
    }
}

// Registered subscribers and the stop state every subject variety shares.
struct Registry<T> {
    observers: Vec<(u64, SharedSubscriber<T>)>,
    next_key: u64,
    terminal: Option<Terminal>,
    closed: bool,
    delivering: bool,
    pending: VecDeque<Delivery<T>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Registry {
            observers: Vec::with_capacity(4),
            next_key: 0,
            terminal: None,
            closed: false,
            delivering: false,
            pending: VecDeque::new(),
        }
    }

    fn register(&mut self, s: SharedSubscriber<T>) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.observers.push((key, s));
        key
    }

    fn remove(&mut self, key: u64) {
        self.observers.retain(|(k, _)| *k != key);
    }

    fn is_stopped(&self) -> bool {
        self.closed || self.terminal.is_some()
    }

    fn snapshot(&self) -> Vec<SharedSubscriber<T>> {
        self.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    // Records the terminal signal and hands back its delivery to the subscribers
    // still registered.
    fn stop(&mut self, terminal: Terminal) -> Option<Delivery<T>> {
        if self.is_stopped() {
            return None;
        }
        self.terminal = Some(terminal.clone());
        let observers = self.observers.drain(..).map(|(_, o)| o).collect();
        Some(Delivery::Terminal(observers, terminal))
    }

    fn close(&mut self) {
        self.closed = true;
        self.observers.clear();
        self.pending.clear();
    }
}

// One unit of work of a subject. Receivers are fixed when it is created.
enum Delivery<T> {
    Next(Vec<SharedSubscriber<T>>, T),
    Terminal(Vec<SharedSubscriber<T>>, Terminal),
    // Values a new subscriber gets on subscription, followed by the terminal
    // signal if the subject is already stopped.
    Replay(SharedSubscriber<T>, Vec<T>, Option<Terminal>),
}

impl<T: Clone> Delivery<T> {
    fn run(self) {
        match self {
            Delivery::Next(observers, v) => {
                for o in observers {
                    lock(&o).next(v.clone());
                }
            }
            Delivery::Terminal(observers, terminal) => {
                for o in observers {
                    terminal.deliver(&mut *lock(&o));
                }
            }
            Delivery::Replay(o, values, terminal) => {
                let mut replaying = lock(&o);
                for v in values {
                    replaying.next(v);
                }
                if let Some(terminal) = terminal {
                    terminal.deliver(&mut *replaying);
                }
            }
        }
    }
}

// Runs the delivery `prepare` creates under the subject lock. If another
// delivery of the subject is running, the new one is queued behind it instead
// and this call returns right away.
fn dispatch<T, S>(
    subject: &Arc<Mutex<S>>,
    prepare: impl FnOnce(&mut S) -> Option<Delivery<T>>,
)
where
    T: Clone,
    S: SubjectState<T>,
{
    let first = {
        let mut src = lock(subject);
        let Some(delivery) = prepare(&mut *src) else {
            return;
        };
        let registry = src.registry();
        if registry.delivering {
            registry.pending.push_back(delivery);
            return;
        }
        registry.delivering = true;
        delivery
    };

    let mut draining = Draining {
        subject,
        done: false,
        marker: PhantomData,
    };
    let mut current = Some(first);
    while let Some(delivery) = current {
        delivery.run();
        let mut src = lock(subject);
        let registry = src.registry();
        current = registry.pending.pop_front();
        if current.is_none() {
            registry.delivering = false;
        }
    }
    draining.done = true;
}

// Resets the subject when a subscriber panicked during delivery.
struct Draining<'a, T, S: SubjectState<T>> {
    subject: &'a Arc<Mutex<S>>,
    done: bool,
    marker: PhantomData<fn() -> T>,
}

impl<T, S: SubjectState<T>> Drop for Draining<'_, T, S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut src = lock(self.subject);
        let registry = src.registry();
        registry.delivering = false;
        registry.pending.clear();
    }
}

trait SubjectState<T> {
    fn registry(&mut self) -> &mut Registry<T>;
}

// Subscription that removes the subscriber registered under `key`.
fn removal<T, S>(subject: &Arc<Mutex<S>>, key: u64) -> Subscription
where
    S: SubjectState<T> + Send + 'static,
{
    let subject = Arc::clone(subject);
    Subscription::new(
        UnsubscribeLogic::Logic(Box::new(move || lock(&subject).registry().remove(key))),
        SubscriptionHandle::Nil,
    )
}
