use std::sync::{Arc, Mutex};

use crate::{
    lock,
    observer::{Observer, StreamError},
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable,
};

use super::{dispatch, removal, Delivery, Registry, SubjectState, Terminal};

/// A `Subject` forwards every value pushed into its emitter to all subscribers
/// registered at that moment.
///
/// Values are not stored: a subscriber registered after an emission does not see it.
/// After `complete` or `error` the subject is stopped, later subscribers receive only
/// the terminal signal.
///
/// Subjects are the entry points of user input in this crate, the lesson search
/// box and the course dialog buttons are both modelled as subjects.
///
/// # Example
///
///```no_run
/// use rxcourses::{subjects::Subject, subscribe::Subscriber};
/// use rxcourses::{ObservableExt, Observer, Subscribeable};
///
/// let (mut emitter, mut receiver) = Subject::emitter_receiver();
///
/// emitter.next("lost"); // No subscriber registered yet.
///
/// receiver.subscribe(Subscriber::on_next(|v| println!("1: {}", v)));
/// receiver
///     .clone()
///     .map(|v: &str| v.len())
///     .subscribe(Subscriber::on_next(|v| println!("2: {}", v)));
///
/// emitter.next("seen by both");
/// emitter.complete();
///```
pub struct Subject<T> {
    registry: Registry<T>,
}

impl<T> SubjectState<T> for Subject<T> {
    fn registry(&mut self) -> &mut Registry<T> {
        &mut self.registry
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Creates a new pair of `SubjectEmitter` for emitting values and
    /// `SubjectReceiver` for subscribing to values.
    pub fn emitter_receiver() -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(Subject {
            registry: Registry::new(),
        }));

        (SubjectEmitter(Arc::clone(&s)), SubjectReceiver(Arc::clone(&s)))
    }
}

/// Subscription handle for a `Subject`.
#[derive(Clone)]
pub struct SubjectReceiver<T>(Arc<Mutex<Subject<T>>>);

/// Multicasting emitter for a `Subject`.
#[derive(Clone)]
pub struct SubjectEmitter<T>(Arc<Mutex<Subject<T>>>);

impl<T> SubjectReceiver<T> {
    /// Returns the number of registered subscribers.
    pub fn len(&self) -> usize {
        lock(&self.0).registry.observers.len()
    }

    /// Returns `true` if no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + 'static> Subscribeable for SubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut v: Subscriber<Self::ObsType>) -> Subscription {
        let mut src = lock(&self.0);
        if src.registry.closed {
            return Subscription::nil();
        }
        if let Some(terminal) = src.registry.terminal.clone() {
            drop(src);
            terminal.deliver(&mut v);
            return Subscription::nil();
        }
        let key = src.registry.register(Arc::new(Mutex::new(v)));
        drop(src);

        removal(&self.0, key)
    }
}

impl<T> Unsubscribeable for SubjectReceiver<T> {
    fn unsubscribe(self) {
        lock(&self.0).registry.close();
    }
}

impl<T: Clone> Observer for SubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        dispatch(&self.0, |src: &mut Subject<T>| {
            if src.registry.is_stopped() {
                return None;
            }
            Some(Delivery::Next(src.registry.snapshot(), v))
        });
    }

    fn error(&mut self, e: StreamError) {
        dispatch(&self.0, |src: &mut Subject<T>| {
            src.registry.stop(Terminal::Errored(e))
        });
    }

    fn complete(&mut self) {
        dispatch(&self.0, |src: &mut Subject<T>| {
            src.registry.stop(Terminal::Completed)
        });
    }
}

impl<T: Clone + Send + 'static> From<SubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SubjectEmitter<T>) -> Self {
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

impl<T: Send + 'static> From<SubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn subscriber_may_subscribe_to_its_own_subject() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = Arc::clone(&seen);

        let (mut emitter, mut receiver) = Subject::emitter_receiver();
        let mut late = receiver.clone();
        receiver.subscribe(Subscriber::on_next(move |v: u32| {
            let seen = Arc::clone(&seen_c);
            late.subscribe(Subscriber::on_next(move |w| seen.lock().unwrap().push((v, w))));
        }));

        emitter.next(1);
        emitter.next(2);

        assert_eq!(receiver.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
    }

    #[test]
    fn value_emitted_from_a_callback_follows_the_current_one() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (mut emitter, mut receiver) = Subject::emitter_receiver();

        let mut inner = emitter.clone();
        let seen_a = Arc::clone(&seen);
        receiver.subscribe(Subscriber::on_next(move |v: u32| {
            seen_a.lock().unwrap().push(("a", v));
            if v == 1 {
                inner.next(2);
            }
        }));
        let seen_b = Arc::clone(&seen);
        receiver.subscribe(Subscriber::on_next(move |v: u32| {
            seen_b.lock().unwrap().push(("b", v))
        }));

        emitter.next(1);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn completing_from_a_callback_stops_the_subject() {
        let completes = Arc::new(Mutex::new(0));
        let completes_c = Arc::clone(&completes);
        let (mut emitter, mut receiver) = Subject::emitter_receiver();

        let mut inner = emitter.clone();
        receiver.subscribe(Subscriber::new(
            move |_: u8| inner.complete(),
            |_| {},
            move || *completes_c.lock().unwrap() += 1,
        ));

        emitter.next(1);
        emitter.next(2);

        assert_eq!(*completes.lock().unwrap(), 1);
        assert!(receiver.is_empty());
    }

    #[test]
    fn unsubscribe_removes_only_that_subscriber() {
        let (mut emitter, mut receiver) = Subject::emitter_receiver();
        let first = receiver.subscribe(Subscriber::on_next(|_: u8| {}));
        let _second = receiver.subscribe(Subscriber::on_next(|_: u8| {}));
        assert_eq!(receiver.len(), 2);

        first.unsubscribe();
        assert_eq!(receiver.len(), 1);

        emitter.complete();
        assert!(receiver.is_empty());
    }
}
