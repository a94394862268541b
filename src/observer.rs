use std::{error::Error, sync::Arc};

/// Error value carried by the `error` signal of every stream in this crate.
///
/// Typed errors such as [`FetchError`](crate::FetchError) are recovered with
/// `downcast_ref`.
pub type StreamError = Arc<dyn Error + Send + Sync>;

/// Receiving side of a stream: one `next` call per value, then at most one
/// terminal `complete` or `error`.
pub trait Observer {
    type NextFnType;

    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self);
    fn error(&mut self, _: StreamError);
}
