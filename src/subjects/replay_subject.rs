use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    lock,
    observer::{Observer, StreamError},
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable,
};

use super::{dispatch, removal, Delivery, Registry, SubjectState, Terminal};

/// Specifies the buffer size for replaying previous emissions in `ReplaySubject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufSize {
    /// Specifies an infinite buffer size, allowing all emitted values to be replayed.
    Unbounded,

    /// Specifies a limited buffer size with the maximum number of values to be replayed.
    Bounded(usize),
}

/// Replaying old values to new subscribers, this variant of `Subject` emits these
/// values upon subscription.
///
/// `ReplaySubject` emits all cached values before emitting new items. Even when
/// stopped by `complete` or `error`, it replays cached values before notifying a new
/// subscriber of the terminal signal.
///
/// # Example
///
///```no_run
/// use rxcourses::{
///     subjects::{BufSize, ReplaySubject},
///     subscribe::Subscriber,
/// };
/// use rxcourses::{Observer, Subscribeable};
///
/// let (mut emitter, mut receiver) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));
///
/// emitter.next(1);
/// emitter.next(2);
/// emitter.next(3);
///
/// // Receives 2 and 3, then every later value.
/// receiver.subscribe(Subscriber::on_next(|v| println!("late subscriber got {}", v)));
///
/// emitter.next(4);
/// emitter.complete();
///```
pub struct ReplaySubject<T> {
    buf_size: BufSize,
    values: VecDeque<T>,
    registry: Registry<T>,
}

impl<T> SubjectState<T> for ReplaySubject<T> {
    fn registry(&mut self) -> &mut Registry<T> {
        &mut self.registry
    }
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
    /// Creates a new pair of `ReplaySubjectEmitter` for emitting values and
    /// `ReplaySubjectReceiver` for subscribing to values, replaying up to `buf_size`
    /// of the most recent values.
    pub fn emitter_receiver(
        buf_size: BufSize,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        let values = match buf_size {
            BufSize::Unbounded => VecDeque::new(),
            BufSize::Bounded(size) => VecDeque::with_capacity(size),
        };
        let s = Arc::new(Mutex::new(ReplaySubject {
            buf_size,
            values,
            registry: Registry::new(),
        }));

        (
            ReplaySubjectEmitter(Arc::clone(&s)),
            ReplaySubjectReceiver(Arc::clone(&s)),
        )
    }
}

impl<T> ReplaySubject<T> {
    fn push(&mut self, v: T) {
        if let BufSize::Bounded(size) = self.buf_size {
            if size == 0 {
                return;
            }
            if self.values.len() == size {
                self.values.pop_front();
            }
        }
        self.values.push_back(v);
    }
}

/// Subscription handle for a `ReplaySubject`.
#[derive(Clone)]
pub struct ReplaySubjectReceiver<T>(Arc<Mutex<ReplaySubject<T>>>);

/// Multicasting emitter for a `ReplaySubject`.
#[derive(Clone)]
pub struct ReplaySubjectEmitter<T>(Arc<Mutex<ReplaySubject<T>>>);

impl<T> ReplaySubjectReceiver<T> {
    /// Returns the number of registered subscribers.
    pub fn len(&self) -> usize {
        lock(&self.0).registry.observers.len()
    }

    /// Returns `true` if no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of values a new subscriber would have replayed.
    pub fn buffered(&self) -> usize {
        lock(&self.0).values.len()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for ReplaySubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let observer = Arc::new(Mutex::new(v));
        let mut key = None;

        // Queued like an emission, so that values emitted concurrently reach
        // the new subscriber after the buffered ones.
        dispatch(&self.0, |src: &mut ReplaySubject<T>| {
            if src.registry.closed {
                return None;
            }
            let replay: Vec<T> = src.values.iter().cloned().collect();
            let terminal = src.registry.terminal.clone();
            if terminal.is_none() {
                key = Some(src.registry.register(Arc::clone(&observer)));
            }
            Some(Delivery::Replay(observer, replay, terminal))
        });

        match key {
            Some(key) => removal(&self.0, key),
            None => Subscription::nil(),
        }
    }
}

impl<T> Unsubscribeable for ReplaySubjectReceiver<T> {
    fn unsubscribe(self) {
        lock(&self.0).registry.close();
    }
}

impl<T: Clone> Observer for ReplaySubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        dispatch(&self.0, |src: &mut ReplaySubject<T>| {
            if src.registry.is_stopped() {
                return None;
            }
            src.push(v.clone());
            Some(Delivery::Next(src.registry.snapshot(), v))
        });
    }

    fn error(&mut self, e: StreamError) {
        dispatch(&self.0, |src: &mut ReplaySubject<T>| {
            src.registry.stop(Terminal::Errored(e))
        });
    }

    fn complete(&mut self) {
        dispatch(&self.0, |src: &mut ReplaySubject<T>| {
            src.registry.stop(Terminal::Completed)
        });
    }
}

impl<T: Clone + Send + 'static> From<ReplaySubjectEmitter<T>> for Subscriber<T> {
    fn from(value: ReplaySubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<ReplaySubjectReceiver<T>> for Observable<T> {
    fn from(mut value: ReplaySubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
