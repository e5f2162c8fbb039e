//! Settable, chainable promises, plus an adapter that turns a blocking
//! call into one that returns a promise immediately.
//!
//! The simplest usage is [`promisify`], which converts a
//! (potentially-blocking) function into a non-blocking, promise-returning
//! one. The wrapped call runs on a background thread and its outcome
//! settles the promise:
//!
//! ```
//! use futures::executor::block_on;
//! use promise_chain::promisify;
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let wrapped = promisify(add);
//! let promise = wrapped((2, 3));
//! let value = block_on(promise.outcome()).unwrap();
//! assert_eq!(value.get::<i32>(), Some(5));
//! ```
//!
//! To manage a promise directly, create one, chain callbacks with
//! [`then`](Promise::then), and settle it yourself:
//!
//! ```
//! use futures::executor::block_on;
//! use promise_chain::{callback, Promise, Value};
//! use std::thread;
//!
//! let promise = Promise::new();
//! let shouted = promise.then(
//!     Some(callback(|v: Value| {
//!         Value::new(v.get::<String>().unwrap().to_uppercase())
//!     })),
//!     None,
//! );
//!
//! let producer = promise.clone();
//! thread::spawn(move || {
//!     producer.resolve(Value::new(String::from("hi")));
//! });
//!
//! let value = block_on(shouted.outcome()).unwrap();
//! assert_eq!(value.get::<String>(), Some(String::from("HI")));
//! ```
//!
//! Each `then` call returns a new child promise, so chains compose; a link
//! that supplies no callback for the side that fires passes the value (or
//! rejection reason) through unchanged. A promise may be settled exactly
//! once: settling again is a programming error and panics. Callbacks never
//! run inline with `then`, `resolve`, or `reject`: dispatch always happens
//! on a separate thread, in registration order.

use thiserror::Error as ThisError;

mod dispatch;
mod promise;
mod promisify;
mod value;

pub use crate::promise::{callback, Callback, Outcome, Promise, State};
pub use crate::promisify::{promisify, Callable, Outputs};
pub use crate::value::Value;

/// Settlement protocol violations.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A promise may be settled at most once. `resolve` and `reject` treat
    /// this as fatal and panic; the `try_` variants report it here for call
    /// sites that race settlements on purpose.
    #[error("cannot settle a promise that is already {0}")]
    AlreadySettled(State),
}
