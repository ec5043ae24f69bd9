use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Marker for a promise that was dropped before being completed.
///
/// Queues of pending promises are torn down by dropping them; the waiting
/// side observes that as this value, which error types convert into their
/// aborted/stopped variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseDropped;

/// The resolving half of a single-shot asynchronous result.
///
/// `resolve` and `reject` take the promise by value, so completing twice is
/// unrepresentable.
#[derive(Debug)]
pub struct Promise<T, E> {
    tx: oneshot::Sender<Result<T, E>>,
}

/// The awaiting half of a single-shot asynchronous result.
///
/// Resolves to `Ok(value)` or `Err(error)`. If the promise is dropped
/// without being completed, the completion yields
/// `Err(E::from(PromiseDropped))`.
#[derive(Debug)]
pub struct Completion<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

/// Create a connected promise/completion pair.
pub fn promise<T, E>() -> (Promise<T, E>, Completion<T, E>) {
    let (tx, rx) = oneshot::channel();
    (Promise { tx }, Completion { rx })
}

impl<T, E> Promise<T, E> {
    /// Complete with a value. A no-op if the completion was dropped.
    pub fn resolve(self, value: T) {
        let _ = self.tx.send(Ok(value));
    }

    /// Complete with an error. A no-op if the completion was dropped.
    pub fn reject(self, error: E) {
        let _ = self.tx.send(Err(error));
    }

    /// Forward an already-computed result.
    pub fn complete(self, result: Result<T, E>) {
        let _ = self.tx.send(result);
    }
}

impl<T, E> Future for Completion<T, E>
where
    E: From<PromiseDropped>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(PromiseDropped))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Await the future parked in `slot`, or stay pending while the slot is
/// empty.
///
/// Actor loops keep a long-running future in an `Option` so that a
/// `tokio::select!` can poll it across iterations without dropping it
/// mid-flight; this is the selectable view of that slot.
pub async fn pending_or<F>(slot: &mut Option<Pin<Box<F>>>) -> F::Output
where
    F: Future + ?Sized,
{
    match slot {
        Some(fut) => fut.as_mut().await,
        None => std::future::pending().await,
    }
}
