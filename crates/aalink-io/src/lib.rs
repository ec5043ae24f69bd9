//! Single-shot asynchronous results for the aalink pipeline.
//!
//! Every asynchronous operation in aalink terminates by completing a
//! [`Promise`] exactly once. The holder of the matching [`Completion`]
//! awaits the outcome. Completion handlers run on the awaiting task, so
//! the concurrency domain of the continuation is chosen by whoever holds
//! the completion, not by whoever resolves the promise.

pub mod promise;

pub use promise::{pending_or, promise, Completion, Promise, PromiseDropped};
