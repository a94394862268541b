//! Shared machinery of the higher order operators.
//!
//! `switch_map`, `merge_map`, `concat_map` and `exhaust_map` differ only in what
//! happens when the outer observable emits while inner observables are active.
//! They share the rule for completion: downstream completes once the outer
//! observable completed and no inner observable is active or queued.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use tracing::trace;

use super::Observable;
use crate::lock;
use crate::observer::{Observer, StreamError};
use crate::subscription::subscribe::{
    Subscribeable, Subscriber, Subscription, UnsubscribeLogic, Unsubscribeable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flatten {
    /// Unsubscribe the active inner observable, subscribe the new one.
    Switch,
    /// Subscribe every inner observable concurrently.
    Merge,
    /// Queue inner observables, subscribe one at a time.
    Concat,
    /// Ignore outer values while an inner observable is active.
    Exhaust,
}

struct Inners<R> {
    next_key: u64,
    latest: u64,
    // `None` while the inner observable is still inside its `subscribe` call.
    active: HashMap<u64, Option<Subscription>>,
    queued: VecDeque<Observable<R>>,
    outer: Option<Subscription>,
    outer_done: bool,
    closed: bool,
}

impl<R> Inners<R> {
    fn register(&mut self) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.latest = key;
        self.active.insert(key, None);
        key
    }

    fn drain_active(&mut self) -> Vec<Subscription> {
        self.active.drain().filter_map(|(_, s)| s).collect()
    }

    fn finished(&self) -> bool {
        !self.closed && self.outer_done && self.active.is_empty() && self.queued.is_empty()
    }
}

struct FlattenState<R> {
    mode: Flatten,
    downstream: Mutex<Subscriber<R>>,
    inners: Mutex<Inners<R>>,
}

impl<R: Send + 'static> FlattenState<R> {
    fn new(mode: Flatten, downstream: Subscriber<R>) -> Arc<Self> {
        Arc::new(FlattenState {
            mode,
            downstream: Mutex::new(downstream),
            inners: Mutex::new(Inners {
                next_key: 0,
                latest: 0,
                active: HashMap::new(),
                queued: VecDeque::new(),
                outer: None,
                outer_done: false,
                closed: false,
            }),
        })
    }

    fn outer_next<T, F>(self: &Arc<Self>, value: T, project: &Mutex<F>)
    where
        F: FnMut(T) -> Observable<R>,
    {
        let replaced = {
            let mut inners = lock(&self.inners);
            if inners.closed {
                return;
            }
            match self.mode {
                Flatten::Exhaust if !inners.active.is_empty() => {
                    trace!("exhaust_map ignored a value while an inner observable is active");
                    return;
                }
                Flatten::Switch => inners.drain_active(),
                _ => Vec::new(),
            }
        };
        for subscription in replaced {
            trace!("switch_map unsubscribed the previous inner observable");
            subscription.unsubscribe();
        }

        let inner = {
            let mut project = lock(project);
            (&mut *project)(value)
        };

        let key = {
            let mut inners = lock(&self.inners);
            if inners.closed {
                return;
            }
            if self.mode == Flatten::Concat
                && (!inners.active.is_empty() || !inners.queued.is_empty())
            {
                inners.queued.push_back(inner);
                trace!(queued = inners.queued.len(), "concat_map queued an inner observable");
                return;
            }
            inners.register()
        };
        self.attach(key, inner);
    }

    fn attach(self: &Arc<Self>, key: u64, mut inner: Observable<R>) {
        let s_next = Arc::clone(self);
        let s_error = Arc::clone(self);
        let s_complete = Arc::clone(self);

        let subscription = inner.subscribe(Subscriber::new(
            move |v| s_next.inner_next(key, v),
            move |e| s_error.inner_error(key, e),
            move || s_complete.inner_complete(key),
        ));

        let mut inners = lock(&self.inners);
        if let Some(slot) = inners.active.get_mut(&key) {
            *slot = Some(subscription);
            return;
        }
        drop(inners);
        // Completed synchronously, or got switched away or closed while subscribing.
        subscription.unsubscribe();
    }

    fn is_stale(&self, key: u64) -> bool {
        self.mode == Flatten::Switch && lock(&self.inners).latest != key
    }

    fn inner_next(&self, key: u64, v: R) {
        if self.is_stale(key) {
            trace!(key, "switch_map dropped a value of a stale inner observable");
            return;
        }
        lock(&self.downstream).next(v);
    }

    fn inner_error(&self, key: u64, e: StreamError) {
        if self.is_stale(key) {
            return;
        }
        self.fail(e);
    }

    fn inner_complete(self: &Arc<Self>, key: u64) {
        let (next, finished) = {
            let mut inners = lock(&self.inners);
            inners.active.remove(&key);
            if inners.closed || (self.mode == Flatten::Switch && inners.latest != key) {
                return;
            }
            let queued = if inners.active.is_empty() {
                inners.queued.pop_front()
            } else {
                None
            };
            match queued {
                Some(observable) => (Some((inners.register(), observable)), false),
                None => (None, inners.finished()),
            }
        };

        if let Some((key, observable)) = next {
            self.attach(key, observable);
        } else if finished {
            lock(&self.downstream).complete();
        }
    }

    fn outer_complete(&self) {
        let finished = {
            let mut inners = lock(&self.inners);
            inners.outer_done = true;
            inners.finished()
        };
        if finished {
            lock(&self.downstream).complete();
        }
    }

    fn fail(&self, e: StreamError) {
        if let Some(subscriptions) = self.close_inners() {
            lock(&self.downstream).error(e);
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
        }
    }

    fn set_outer(&self, subscription: Subscription) {
        let mut inners = lock(&self.inners);
        if inners.closed {
            drop(inners);
            subscription.unsubscribe();
        } else {
            inners.outer = Some(subscription);
        }
    }

    fn close(&self) {
        for subscription in self.close_inners().unwrap_or_default() {
            subscription.unsubscribe();
        }
    }

    // Marks the state closed and hands back every subscription to release, or
    // `None` when it was already closed.
    fn close_inners(&self) -> Option<Vec<Subscription>> {
        let mut inners = lock(&self.inners);
        if inners.closed {
            return None;
        }
        inners.closed = true;
        inners.queued.clear();
        let mut subscriptions = inners.drain_active();
        subscriptions.extend(inners.outer.take());
        Some(subscriptions)
    }
}

pub(super) fn flatten<S, T, R, F>(mut source: S, project: F, mode: Flatten) -> Observable<R>
where
    S: Subscribeable<ObsType = T> + Send + Sync + 'static,
    T: 'static,
    R: Send + 'static,
    F: FnMut(T) -> Observable<R> + Send + 'static,
{
    let project = Arc::new(Mutex::new(project));

    Observable::new(move |o| {
        let state = FlattenState::new(mode, o);
        let s_next = Arc::clone(&state);
        let s_error = Arc::clone(&state);
        let s_complete = Arc::clone(&state);
        let project = Arc::clone(&project);

        let mut outer = source.subscribe(Subscriber::new(
            move |v| s_next.outer_next(v, &project),
            move |e| s_error.fail(e),
            move || s_complete.outer_complete(),
        ));

        let handle = outer.take_handle();
        state.set_outer(outer);

        Subscription::new(UnsubscribeLogic::Logic(Box::new(move || state.close())), handle)
    })
}
