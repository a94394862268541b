use std::{error::Error, future::Future, pin::Pin, sync::Arc};

use tokio::runtime;
use tokio::task::{JoinError, JoinHandle};

use crate::observer::Observer;

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Subscribes to the observable stream and specifies how to handle emitted values.
    ///
    /// The returned `Subscription` allows the subscriber to manage the subscription,
    /// such as unsubscribing or awaiting the task that drives the emissions.
    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, allowing the clean release of resources
/// associated with a subscription.
///
/// For asynchronous observables unsubscribing is also the signal to stop emitting,
/// for the HTTP observables it aborts the request that is still in flight.
pub trait Unsubscribeable {
    /// Unsubscribes from a subscription and releases associated resources.
    ///
    /// The instance this method is called on is consumed.
    fn unsubscribe(self);
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(Arc<dyn Error + Send + Sync>) + Send>;

/// A type that acts as an observer, allowing users to handle emitted values, errors,
/// and completion when subscribing to an `Observable` or a subject.
///
/// Once `complete` or `error` has been delivered the subscriber is stopped and every
/// later signal is ignored, so a producer racing with its own termination can never
/// deliver a value after the terminal signal.
pub struct Subscriber<NextFnType> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
    completed: bool,
    errored: bool,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for emitted
    /// values, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
            completed: false,
            errored: false,
        }
    }

    /// Create a new Subscriber with the provided `next` function.
    ///
    /// Errors and completion are silently dropped unless handlers are attached with
    /// [`on_error`](Self::on_error) and [`on_complete`](Self::on_complete).
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            error_fn: None,
            completed: false,
            errored: false,
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function for the Subscriber.
    pub fn on_error(
        &mut self,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send,
    ) {
        self.error_fn = Some(Box::new(error_fn));
    }

    /// Returns `true` once the subscriber received `complete` or `error`.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.completed || self.errored
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        if self.is_stopped() {
            return;
        }
        (self.next_fn)(v);
    }

    fn complete(&mut self) {
        if self.is_stopped() {
            return;
        }
        self.completed = true;
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
    }

    fn error(&mut self, observable_error: Arc<dyn Error + Send + Sync>) {
        if self.is_stopped() {
            return;
        }
        self.errored = true;
        if let Some(efn) = &mut self.error_fn {
            (efn)(observable_error);
        }
    }
}

/// Handle used by a `Subscription` to await the task driving an asynchronous
/// observable.
pub enum SubscriptionHandle {
    /// Nothing to await, the observable is synchronous or shares another task.
    Nil,

    /// Holds a join handle for awaiting an asynchronous observable using a Tokio task.
    JoinTask(JoinHandle<()>),
}

/// Represents a subscription to an observable or a subject, allowing control over
/// the subscription.
///
/// The subscription can be used to unsubscribe, which releases resources and stops
/// asynchronous producers, and to await the Tokio task of an asynchronous observable.
pub struct Subscription {
    pub(crate) unsubscribe_logic: UnsubscribeLogic,
    pub(crate) subscription_future: SubscriptionHandle,
    pub(crate) runtime_handle: Result<runtime::Handle, runtime::TryCurrentError>,
}

impl Subscription {
    /// Creates a new Subscription instance with the specified unsubscribe logic and
    /// subscription handle.
    #[must_use]
    pub fn new(
        unsubscribe_logic: UnsubscribeLogic,
        subscription_future: SubscriptionHandle,
    ) -> Self {
        let runtime_handle = tokio::runtime::Handle::try_current();
        Subscription {
            unsubscribe_logic,
            subscription_future,
            runtime_handle,
        }
    }

    /// A subscription with nothing to release and nothing to await.
    pub fn nil() -> Self {
        Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::Nil)
    }

    /// Detaches the task handle so that another subscription can own it.
    pub(crate) fn take_handle(&mut self) -> SubscriptionHandle {
        std::mem::replace(&mut self.subscription_future, SubscriptionHandle::Nil)
    }

    /// Awaits the completion of the Tokio task associated with this subscription.
    ///
    /// Resolves immediately for synchronous observables. An aborted task resolves
    /// with a cancelled `JoinError`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task driving the observable panicked or was aborted.
    pub async fn join_concurrent(self) -> Result<(), JoinError> {
        match self.subscription_future {
            SubscriptionHandle::JoinTask(task_handle) => task_handle.await,
            SubscriptionHandle::Nil => Ok(()),
        }
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(self) {
        self.unsubscribe_logic.unsubscribe(self.runtime_handle);
    }
}

/// Enumerates various unsubscribe logic options for a subscription.
pub enum UnsubscribeLogic {
    /// No specific unsubscribe logic.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon unsubscribing.
    Wrapped(Box<Subscription>),

    /// Unsubscribe logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous unsubscribe logic represented by a future, spawned on the
    /// runtime the subscription was created in.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl UnsubscribeLogic {
    fn unsubscribe(self, runtime_handle: Result<runtime::Handle, runtime::TryCurrentError>) {
        match self {
            UnsubscribeLogic::Nil => (),
            UnsubscribeLogic::Logic(fnc) => fnc(),
            UnsubscribeLogic::Wrapped(subscription) => subscription.unsubscribe(),
            UnsubscribeLogic::Future(future) => match runtime_handle {
                Ok(handle) => {
                    handle.spawn(future);
                }
                Err(e) => {
                    tracing::warn!("asynchronous unsubscribe dropped outside of Tokio runtime: {e}");
                }
            },
        }
    }
}
