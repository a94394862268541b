//! Provides structures and traits related to subscription management.
//!
//! This module includes `Subscriber` for handling observed values, errors and
//! completions, and `Subscription` for controlling subscriptions to observables and
//! subjects: unsubscribing, which cancels asynchronous producers, and awaiting the
//! Tokio task that drives them.
pub mod subscribe;
