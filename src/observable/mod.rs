//! The `observable` module provides the building blocks for creating and composing
//! observables.
//!
//! Observables are cold: every call to `subscribe` runs the subscribe function
//! again. For the HTTP observables that means one independent request per
//! subscription, which is why fan-out to several consumers goes through
//! [`share_replay`](ObservableExt::share_replay).

use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::lock;
use crate::observer::{Observer, StreamError};
use crate::subjects::BufSize;
use crate::subscription::subscribe::{
    Subscribeable, Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic,
    Unsubscribeable,
};

mod flatten;
mod share;

pub use share::Shared;

use flatten::{flatten, Flatten};

/// The `Observable` struct represents a source of values that can be observed
/// and transformed.
///
/// # Example: asynchronous `Observable` with cancellation
///
/// The subscribe function returns a `Subscription` whose unsubscribe logic stops the
/// background task. Operators such as `take` and `switch_map` rely on it.
///
/// ```no_run
/// use rxcourses::subscribe::{Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic};
/// use rxcourses::{Observable, ObservableExt, Observer, Subscribeable};
///
/// #[tokio::main]
/// async fn main() {
///     let ticks = Observable::new(|mut o: Subscriber<u32>| {
///         let join_handle = tokio::spawn(async move {
///             for i in 0..100 {
///                 o.next(i);
///                 tokio::time::sleep(std::time::Duration::from_millis(10)).await;
///             }
///             o.complete();
///         });
///         let abort = join_handle.abort_handle();
///         Subscription::new(
///             UnsubscribeLogic::Logic(Box::new(move || abort.abort())),
///             SubscriptionHandle::JoinTask(join_handle),
///         )
///     });
///
///     let subscription = ticks
///         .take(3)
///         .map(|v| v * 10)
///         .subscribe(Subscriber::on_next(|v| println!("{}", v)));
///
///     let _ = subscription.join_concurrent().await;
/// }
/// ```
pub struct Observable<T> {
    subscribe_fn: Box<dyn FnMut(Subscriber<T>) -> Subscription + Send + Sync>,
}

impl<T> Observable<T> {
    /// Creates a new `Observable` with the provided subscribe function.
    ///
    /// The function runs once per subscription. It delivers values to the
    /// `Subscriber` and returns a `Subscription` that stops the delivery when
    /// unsubscribed and, for asynchronous observables, holds the handle of the
    /// Tokio task doing the work.
    pub fn new(sf: impl FnMut(Subscriber<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Box::new(sf),
        }
    }
}

impl<T: 'static> Observable<T> {
    /// An observable that completes immediately without emitting.
    pub fn empty() -> Self {
        Observable::new(|mut o: Subscriber<T>| {
            o.complete();
            Subscription::nil()
        })
    }

    /// An observable that emits `error` to every subscriber and nothing else.
    pub fn throw(error: impl Error + Send + Sync + 'static) -> Self {
        let error: StreamError = Arc::new(error);
        Observable::new(move |mut o: Subscriber<T>| {
            o.error(Arc::clone(&error));
            Subscription::nil()
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Emits `value` synchronously and completes.
    pub fn of(value: T) -> Self {
        Observable::new(move |mut o| {
            o.next(value.clone());
            o.complete();
            Subscription::nil()
        })
    }

    /// Emits every value of `values` synchronously, in order, and completes.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<T> = values.into_iter().collect();
        Observable::new(move |mut o| {
            for v in &values {
                o.next(v.clone());
            }
            o.complete();
            Subscription::nil()
        })
    }
}

struct ConcatState<T> {
    downstream: Mutex<Subscriber<T>>,
    current: Mutex<Option<Subscription>>,
    active: AtomicUsize,
    closed: AtomicBool,
}

type ConcatSources<T> = Arc<Mutex<Vec<Option<Observable<T>>>>>;

impl<T: Send + 'static> Observable<T> {
    /// Subscribes to `sources` one after another, each only after the previous one
    /// completed, and completes after the last one.
    ///
    /// An error from any source is forwarded and ends the concatenation.
    pub fn concat(sources: Vec<Observable<T>>) -> Self {
        let sources: ConcatSources<T> = Arc::new(Mutex::new(sources.into_iter().map(Some).collect()));

        Observable::new(move |o| {
            let state = Arc::new(ConcatState {
                downstream: Mutex::new(o),
                current: Mutex::new(None),
                active: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            });
            subscribe_concat_source(&sources, 0, &state);

            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    state.closed.store(true, Ordering::SeqCst);
                    let current = lock(&state.current).take();
                    if let Some(s) = current {
                        s.unsubscribe();
                    }
                })),
                SubscriptionHandle::Nil,
            )
        })
    }
}

fn subscribe_concat_source<T: Send + 'static>(
    sources: &ConcatSources<T>,
    index: usize,
    state: &Arc<ConcatState<T>>,
) {
    if state.closed.load(Ordering::SeqCst) {
        return;
    }
    let source = {
        let mut sources = lock(sources);
        if index >= sources.len() {
            None
        } else {
            // Taken out for the duration of `subscribe`, a synchronous completion
            // re-enters this function for the following source.
            sources[index].take()
        }
    };
    let Some(mut source) = source else {
        lock(&state.downstream).complete();
        return;
    };
    state.active.store(index, Ordering::SeqCst);

    let s_next = Arc::clone(state);
    let s_error = Arc::clone(state);
    let s_complete = Arc::clone(state);
    let sources_complete = Arc::clone(sources);

    let subscription = source.subscribe(Subscriber::new(
        move |v| lock(&s_next.downstream).next(v),
        move |e| lock(&s_error.downstream).error(e),
        move || subscribe_concat_source(&sources_complete, index + 1, &s_complete),
    ));

    if let Some(slot) = lock(sources).get_mut(index) {
        *slot = Some(source);
    }
    if state.closed.load(Ordering::SeqCst) {
        subscription.unsubscribe();
    } else if state.active.load(Ordering::SeqCst) == index {
        *lock(&state.current) = Some(subscription);
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        (self.subscribe_fn)(v)
    }
}

// Builds a subscriber that hands values to `on_next` and forwards error and
// completion to `downstream` untouched.
fn relay<T, U: 'static>(
    downstream: Subscriber<U>,
    mut on_next: impl FnMut(&Mutex<Subscriber<U>>, T) + Send + 'static,
) -> Subscriber<T> {
    let o_shared = Arc::new(Mutex::new(downstream));
    let o_cloned_e = Arc::clone(&o_shared);
    let o_cloned_c = Arc::clone(&o_shared);

    Subscriber::new(
        move |v| on_next(&o_shared, v),
        move |observable_error| lock(&o_cloned_e).error(observable_error),
        move || lock(&o_cloned_c).complete(),
    )
}

fn unsubscribe_all(subscriptions: &Mutex<Option<Vec<Subscription>>>) {
    let subscriptions = lock(subscriptions).take();
    for subscription in subscriptions.into_iter().flatten() {
        subscription.unsubscribe();
    }
}

struct DebounceSlot<T> {
    generation: u64,
    value: Option<T>,
    timer: Option<JoinHandle<()>>,
    closed: bool,
}

// Lock order: `downstream` before `slot`.
struct DebounceState<T> {
    downstream: Mutex<Subscriber<T>>,
    slot: Mutex<DebounceSlot<T>>,
}

impl<T> DebounceState<T> {
    // Stops the timer for good and hands back the pending value.
    fn cancel(&self) -> Option<T> {
        let mut slot = lock(&self.slot);
        slot.closed = true;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.value.take()
    }
}

/// The `ObservableExt` trait provides the operators that can be chained onto
/// anything `Subscribeable`: observables, subject receivers and shared observables.
pub trait ObservableExt<T: 'static>: Subscribeable<ObsType = T> {
    /// Transforms the items emitted by the observable using a transformation
    /// function.
    fn map<U, F>(mut self, f: F) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(relay(o, move |o, v| {
                let t = f(v);
                lock(o).next(t);
            }))
        })
    }

    /// Filters the items emitted by the observable based on a predicate function.
    fn filter<P>(mut self, predicate: P) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Observable::new(move |o| {
            let predicate = Arc::clone(&predicate);
            self.subscribe(relay(o, move |o, v| {
                if predicate(&v) {
                    lock(o).next(v);
                }
            }))
        })
    }

    /// Maps and filters in one step: `None` results are dropped.
    fn filter_map<U, F>(mut self, f: F) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(relay(o, move |o, v| {
                if let Some(u) = f(v) {
                    lock(o).next(u);
                }
            }))
        })
    }

    /// Runs a side effect for every item and passes the item on unchanged.
    fn tap<F>(mut self, f: F) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(relay(o, move |o, v| {
                f(&v);
                lock(o).next(v);
            }))
        })
    }

    /// Suppresses items equal to the item emitted immediately before them.
    ///
    /// Only the previous item is remembered: `a, b, a` passes through unchanged.
    fn distinct_until_changed(mut self) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: PartialEq + Clone + Send,
    {
        Observable::new(move |o| {
            let mut last: Option<T> = None;
            self.subscribe(relay(o, move |o, v| {
                if last.as_ref() == Some(&v) {
                    tracing::trace!("distinct_until_changed dropped a repeated value");
                    return;
                }
                last = Some(v.clone());
                lock(o).next(v);
            }))
        })
    }

    /// Emits at most the first `n` items, then completes and unsubscribes from the
    /// source.
    fn take(mut self, n: usize) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |mut o| {
            if n == 0 {
                o.complete();
                return Subscription::nil();
            }
            let upstream: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
            let done = Arc::new(AtomicBool::new(false));

            let upstream_c = Arc::clone(&upstream);
            let done_c = Arc::clone(&done);
            let mut taken = 0;

            let mut unsubscriber = self.subscribe(relay(o, move |o, v| {
                if taken == n {
                    return;
                }
                taken += 1;
                let mut o = lock(o);
                o.next(v);
                if taken == n {
                    o.complete();
                    drop(o);
                    done_c.store(true, Ordering::SeqCst);
                    let upstream = lock(&upstream_c).take();
                    if let Some(s) = upstream {
                        s.unsubscribe();
                    }
                }
            }));
            let handle = unsubscriber.take_handle();

            if done.load(Ordering::SeqCst) {
                // The source delivered `n` items while being subscribed.
                unsubscriber.unsubscribe();
                return Subscription::new(UnsubscribeLogic::Nil, handle);
            }
            *lock(&upstream) = Some(unsubscriber);

            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    let upstream = lock(&upstream).take();
                    if let Some(s) = upstream {
                        s.unsubscribe();
                    }
                })),
                handle,
            )
        })
    }

    /// Emits an item only after `due` passed without the source emitting another
    /// one.
    ///
    /// A pending item is flushed immediately when the source completes and dropped
    /// when the source errors or the subscription is cancelled.
    ///
    /// # Panics
    ///
    /// The quiet-period timer is a Tokio task, so items must be delivered from
    /// within a Tokio runtime.
    fn debounce_time(mut self, due: Duration) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Send,
    {
        Observable::new(move |o| {
            let state = Arc::new(DebounceState {
                downstream: Mutex::new(o),
                slot: Mutex::new(DebounceSlot {
                    generation: 0,
                    value: None,
                    timer: None,
                    closed: false,
                }),
            });
            let s_next = Arc::clone(&state);
            let s_error = Arc::clone(&state);
            let s_complete = Arc::clone(&state);

            let u = Subscriber::new(
                move |v| {
                    let mut slot = lock(&s_next.slot);
                    if slot.closed {
                        return;
                    }
                    slot.generation += 1;
                    slot.value = Some(v);
                    if let Some(timer) = slot.timer.take() {
                        timer.abort();
                    }

                    let generation = slot.generation;
                    let state = Arc::clone(&s_next);
                    slot.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(due).await;
                        // Taken under the downstream lock, a racing completion
                        // then either flushes it or finds it delivered.
                        let mut downstream = lock(&state.downstream);
                        let value = {
                            let mut slot = lock(&state.slot);
                            if slot.closed || slot.generation != generation {
                                return;
                            }
                            slot.timer = None;
                            slot.value.take()
                        };
                        if let Some(v) = value {
                            downstream.next(v);
                        }
                    }));
                },
                move |e| {
                    let mut downstream = lock(&s_error.downstream);
                    s_error.cancel();
                    downstream.error(e);
                },
                move || {
                    let mut downstream = lock(&s_complete.downstream);
                    if let Some(v) = s_complete.cancel() {
                        downstream.next(v);
                    }
                    downstream.complete();
                },
            );

            let mut source = self.subscribe(u);
            let handle = source.take_handle();
            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    state.cancel();
                    source.unsubscribe();
                })),
                handle,
            )
        })
    }

    /// Maps each item to an inner observable and emits only from the most recent
    /// one.
    ///
    /// A new item unsubscribes the previous inner observable, which for HTTP
    /// observables aborts the request. Values of an inner observable that was
    /// switched away from are discarded even if they race with the switch.
    fn switch_map<R, F>(self, project: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        R: Send + 'static,
        F: FnMut(T) -> Observable<R> + Send + 'static,
    {
        flatten(self, project, Flatten::Switch)
    }

    /// Maps each item to an inner observable and subscribes to all of them
    /// concurrently, merging their emissions in arrival order.
    fn merge_map<R, F>(self, project: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        R: Send + 'static,
        F: FnMut(T) -> Observable<R> + Send + 'static,
    {
        flatten(self, project, Flatten::Merge)
    }

    /// Maps each item to an inner observable and subscribes to them one at a time,
    /// queuing the inner observables until the active one completes.
    fn concat_map<R, F>(self, project: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        R: Send + 'static,
        F: FnMut(T) -> Observable<R> + Send + 'static,
    {
        flatten(self, project, Flatten::Concat)
    }

    /// Maps an item to an inner observable only while no inner observable is
    /// active; items arriving in the meantime are ignored.
    fn exhaust_map<R, F>(self, project: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        R: Send + 'static,
        F: FnMut(T) -> Observable<R> + Send + 'static,
    {
        flatten(self, project, Flatten::Exhaust)
    }

    /// Merges the current observable with `sources`, emitting items from all of
    /// them as they arrive. Completes once every source completed.
    ///
    /// An error of any source is forwarded and unsubscribes the other sources.
    fn merge(mut self, mut sources: Vec<Observable<T>>) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Send,
    {
        Observable::new(move |o| {
            let o = Arc::new(Mutex::new(o));
            let remaining = Arc::new(AtomicUsize::new(sources.len() + 1));
            let subscriptions: Arc<Mutex<Option<Vec<Subscription>>>> =
                Arc::new(Mutex::new(Some(Vec::with_capacity(sources.len() + 1))));

            let wrap = |o: &Arc<Mutex<Subscriber<T>>>| {
                let o_next = Arc::clone(o);
                let o_error = Arc::clone(o);
                let o_complete = Arc::clone(o);
                let remaining = Arc::clone(&remaining);
                let siblings = Arc::clone(&subscriptions);
                Subscriber::new(
                    move |v| lock(&o_next).next(v),
                    move |e| {
                        lock(&o_error).error(e);
                        unsubscribe_all(&siblings);
                    },
                    move || {
                        if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                            lock(&o_complete).complete();
                        }
                    },
                )
            };

            let mut subscribed = vec![self.subscribe(wrap(&o))];
            for source in &mut sources {
                subscribed.push(source.subscribe(wrap(&o)));
            }
            // A source that failed while subscribing already emptied the list.
            let failed = match lock(&subscriptions).as_mut() {
                Some(list) => {
                    list.append(&mut subscribed);
                    false
                }
                None => true,
            };
            if failed {
                for subscription in subscribed {
                    subscription.unsubscribe();
                }
            }

            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || unsubscribe_all(&subscriptions))),
                SubscriptionHandle::Nil,
            )
        })
    }

    /// Pairs every item with the latest item of `other`.
    ///
    /// Items that arrive before `other` emitted anything are dropped. `other` is
    /// subscribed first, so a subject that replays on subscription is ready before
    /// the source starts.
    fn with_latest_from<U, O>(mut self, mut other: O) -> Observable<(T, U)>
    where
        Self: Sized + Send + Sync + 'static,
        O: Subscribeable<ObsType = U> + Send + Sync + 'static,
        U: Clone + Send + 'static,
    {
        Observable::new(move |o| {
            let o_shared = Arc::new(Mutex::new(o));
            let latest: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));

            let latest_c = Arc::clone(&latest);
            let o_other_e = Arc::clone(&o_shared);
            let other_subscription = other.subscribe(Subscriber::new(
                move |u| *lock(&latest_c) = Some(u),
                move |e| lock(&o_other_e).error(e),
                || {},
            ));

            let o_cloned_e = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);
            let mut source = self.subscribe(Subscriber::new(
                move |v| {
                    let current = lock(&latest).clone();
                    match current {
                        Some(u) => lock(&o_shared).next((v, u)),
                        None => tracing::trace!("with_latest_from dropped a value, other has not emitted"),
                    }
                },
                move |e| lock(&o_cloned_e).error(e),
                move || lock(&o_cloned_c).complete(),
            ));

            let handle = source.take_handle();
            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    source.unsubscribe();
                    other_subscription.unsubscribe();
                })),
                handle,
            )
        })
    }

    /// Replaces an error with the observable returned by `handler`.
    fn catch_error<F>(mut self, handler: F) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        F: FnMut(StreamError) -> Observable<T> + Send + 'static,
    {
        let handler = Arc::new(Mutex::new(handler));
        Observable::new(move |o| {
            let o_shared = Arc::new(Mutex::new(o));
            let fallback: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

            let o_next = Arc::clone(&o_shared);
            let o_complete = Arc::clone(&o_shared);
            let fallback_c = Arc::clone(&fallback);
            let handler = Arc::clone(&handler);

            let mut source = self.subscribe(Subscriber::new(
                move |v| lock(&o_next).next(v),
                move |e| {
                    let mut replacement = {
                        let mut handler = lock(&handler);
                        (&mut *handler)(e)
                    };
                    let o_next = Arc::clone(&o_shared);
                    let o_error = Arc::clone(&o_shared);
                    let o_complete = Arc::clone(&o_shared);
                    let s = replacement.subscribe(Subscriber::new(
                        move |v| lock(&o_next).next(v),
                        move |e| lock(&o_error).error(e),
                        move || lock(&o_complete).complete(),
                    ));
                    *lock(&fallback_c) = Some(s);
                },
                move || lock(&o_complete).complete(),
            ));

            let handle = source.take_handle();
            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    source.unsubscribe();
                    let fallback = lock(&fallback).take();
                    if let Some(s) = fallback {
                        s.unsubscribe();
                    }
                })),
                handle,
            )
        })
    }

    /// Shares one subscription to this observable between all subscribers and
    /// replays every emitted item to late subscribers.
    ///
    /// The source is subscribed on the first subscription to the returned
    /// [`Shared`] and stays subscribed until [`Shared::disconnect`].
    fn share_replay(mut self) -> Shared<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Clone + Send,
    {
        Shared::new(
            Observable::new(move |o| self.subscribe(o)),
            BufSize::Unbounded,
        )
    }
}

impl<O, T: 'static> ObservableExt<T> for O where O: Subscribeable<ObsType = T> {}
