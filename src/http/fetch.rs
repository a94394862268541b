use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{retry, RequestOptions};
use crate::{
    lock,
    observer::Observer,
    subscription::subscribe::{Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic},
    FetchError, Observable,
};

/// Turns a request into a cold observable emitting exactly one value.
///
/// Every subscription spawns one Tokio task running `send` (retried according to
/// `options`). Unsubscribing cancels the task: the request future is dropped,
/// which aborts the connection, and no signal reaches the subscriber afterwards,
/// not even an error.
///
/// # Panics
///
/// Subscribing outside of a Tokio runtime panics.
pub(crate) fn request_observable<T, F, Fut>(
    url: Url,
    options: RequestOptions,
    send: F,
) -> Observable<T>
where
    T: Send + 'static,
    F: Fn(Url) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    let send = Arc::new(send);

    Observable::new(move |o: Subscriber<T>| {
        let token = CancellationToken::new();
        let slot = Arc::new(Mutex::new(Some(o)));

        let task_token = token.clone();
        let task_slot = Arc::clone(&slot);
        let send = Arc::clone(&send);
        let url = url.clone();
        let policy = options.retry.clone();

        let join_handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = task_token.cancelled() => {
                    debug!(%url, "request aborted");
                    return;
                }
                outcome = retry::execute(policy.as_ref(), url.as_str(), || send(url.clone())) => outcome,
            };

            // Taken out so that no lock is held while the subscriber runs.
            let subscriber = lock(&task_slot).take();
            let Some(mut subscriber) = subscriber else {
                return;
            };
            if task_token.is_cancelled() {
                return;
            }
            match outcome {
                Ok(value) => {
                    subscriber.next(value);
                    subscriber.complete();
                }
                Err(e) => subscriber.error(Arc::new(e)),
            }
        });

        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                lock(&slot).take();
                token.cancel();
            })),
            SubscriptionHandle::JoinTask(join_handle),
        )
    })
}

/// Fails with [`FetchError::Status`] unless the response status is a success.
pub(crate) fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    debug!(%url, status = status.as_u16(), "HTTP request executed");
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Reads the whole body and decodes it as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(
    url: &Url,
    response: Response,
) -> Result<T, FetchError> {
    let response = check_status(url, response)?;
    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
