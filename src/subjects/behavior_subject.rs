use std::sync::{Arc, Mutex};

use crate::{
    lock,
    observer::{Observer, StreamError},
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable,
};

use super::{dispatch, removal, Delivery, Registry, SubjectState, Terminal};

/// A `Subject` that always holds a current value.
///
/// New subscribers receive the current value immediately, then every later value.
/// The current value can also be read synchronously with `value()`.
///
/// A stopped `BehaviorSubject` only delivers the terminal signal to new subscribers.
///
/// # Example
///
///```no_run
/// use rxcourses::{subjects::BehaviorSubject, subscribe::Subscriber};
/// use rxcourses::{Observer, Subscribeable};
///
/// let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver(Vec::<u32>::new());
///
/// // Receives the empty vector right away.
/// receiver.subscribe(Subscriber::on_next(|v: Vec<u32>| println!("{} items", v.len())));
///
/// emitter.next(vec![1, 2]);
/// assert_eq!(receiver.value(), vec![1, 2]);
///```
pub struct BehaviorSubject<T> {
    value: T,
    registry: Registry<T>,
}

impl<T> SubjectState<T> for BehaviorSubject<T> {
    fn registry(&mut self) -> &mut Registry<T> {
        &mut self.registry
    }
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Creates a new pair of `BehaviorSubjectEmitter` for emitting values and
    /// `BehaviorSubjectReceiver` for subscribing to values, starting with `value`.
    pub fn emitter_receiver(
        value: T,
    ) -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(BehaviorSubject {
            value,
            registry: Registry::new(),
        }));

        (
            BehaviorSubjectEmitter(Arc::clone(&s)),
            BehaviorSubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handle for a `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectReceiver<T>(Arc<Mutex<BehaviorSubject<T>>>);

/// Multicasting emitter for a `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectEmitter<T>(Arc<Mutex<BehaviorSubject<T>>>);

impl<T> BehaviorSubjectReceiver<T> {
    /// Returns the number of registered subscribers.
    pub fn len(&self) -> usize {
        lock(&self.0).registry.observers.len()
    }

    /// Returns `true` if no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> BehaviorSubjectReceiver<T> {
    /// Returns a copy of the current value.
    pub fn value(&self) -> T {
        lock(&self.0).value.clone()
    }
}

impl<T: Clone> BehaviorSubjectEmitter<T> {
    /// Returns a copy of the current value.
    pub fn value(&self) -> T {
        lock(&self.0).value.clone()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let observer = Arc::new(Mutex::new(v));
        let mut key = None;

        // Queued like an emission, see `ReplaySubjectReceiver`.
        dispatch(&self.0, |src: &mut BehaviorSubject<T>| {
            if src.registry.closed {
                return None;
            }
            if let Some(terminal) = src.registry.terminal.clone() {
                return Some(Delivery::Replay(observer, Vec::new(), Some(terminal)));
            }
            key = Some(src.registry.register(Arc::clone(&observer)));
            Some(Delivery::Replay(observer, vec![src.value.clone()], None))
        });

        match key {
            Some(key) => removal(&self.0, key),
            None => Subscription::nil(),
        }
    }
}

impl<T> Unsubscribeable for BehaviorSubjectReceiver<T> {
    fn unsubscribe(self) {
        lock(&self.0).registry.close();
    }
}

impl<T: Clone> Observer for BehaviorSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        dispatch(&self.0, |src: &mut BehaviorSubject<T>| {
            if src.registry.is_stopped() {
                return None;
            }
            src.value = v.clone();
            Some(Delivery::Next(src.registry.snapshot(), v))
        });
    }

    fn error(&mut self, e: StreamError) {
        dispatch(&self.0, |src: &mut BehaviorSubject<T>| {
            src.registry.stop(Terminal::Errored(e))
        });
    }

    fn complete(&mut self) {
        dispatch(&self.0, |src: &mut BehaviorSubject<T>| {
            src.registry.stop(Terminal::Completed)
        });
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: BehaviorSubjectEmitter<T>) -> Self {
        let mut vn = value.clone();
        let mut ve = value.clone();
        let mut vc = value;
        Subscriber::new(
            move |v| vn.next(v),
            move |e| ve.error(e),
            move || vc.complete(),
        )
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: BehaviorSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
