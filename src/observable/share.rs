//! Module for sharing one subscription to a cold observable between many
//! subscribers.
//!
//! A `Shared` observable subscribes to its source the first time anybody
//! subscribes to it, multicasts the emissions through a replay subject and hands
//! the whole history to every later subscriber. For the HTTP observables it turns
//! "one request per subscriber" into "one request, many views".

use std::sync::{Arc, Mutex};

use crate::{
    lock,
    subjects::{BufSize, ReplaySubject, ReplaySubjectEmitter, ReplaySubjectReceiver},
    subscribe::{Subscriber, Subscription},
    Observable, Subscribeable, Unsubscribeable,
};

/// Multicasting observable that connects to its source on first subscription and
/// replays everything the source emitted to later subscribers.
///
/// Usually created with the [`share_replay()`] operator. Clones share the same
/// source subscription and the same replay buffer.
///
/// [`share_replay()`]: ../trait.ObservableExt.html#method.share_replay
#[derive(Clone)]
pub struct Shared<T> {
    source: Arc<Mutex<Option<Observable<T>>>>,
    state_subject: (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>),
    connected_subscription: Arc<Mutex<Option<Subscription>>>,
}

impl<T: Clone + Send + 'static> Shared<T> {
    /// Creates a new `Shared` observable replaying up to `buf_size` values of
    /// `source`.
    pub fn new(source: Observable<T>, buf_size: BufSize) -> Self {
        Shared {
            source: Arc::new(Mutex::new(Some(source))),
            state_subject: ReplaySubject::emitter_receiver(buf_size),
            connected_subscription: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns `true` once the source has been subscribed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock(&self.source).is_none()
    }

    /// Unsubscribes from the source.
    ///
    /// Values already buffered are still replayed to new subscribers, nothing new
    /// arrives. A `Shared` observable never reconnects.
    pub fn disconnect(&self) {
        let connected = lock(&self.connected_subscription).take();
        if let Some(subscription) = connected {
            subscription.unsubscribe();
        }
    }

    fn connect(&self) {
        let source = lock(&self.source).take();
        if let Some(mut source) = source {
            tracing::trace!("share_replay connecting to its source");
            let subscription = source.subscribe(self.state_subject.0.clone().into());
            *lock(&self.connected_subscription) = Some(subscription);
        }
    }
}

impl<T: Clone + Send + 'static> Subscribeable for Shared<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription {
        // Sink the subscriber before connecting so that a source emitting
        // synchronously reaches the very first subscriber.
        let subscription = self.state_subject.1.subscribe(s);
        self.connect();
        subscription
    }
}
