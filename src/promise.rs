//! The promise state machine: settlement, callback chaining, and the
//! awaitable settlement surface.

use crate::{dispatch, Error, Value};
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// A unary transformation applied to a settled value or rejection reason.
/// The return value is handed to the next link in the chain.
pub type Callback = Box<dyn FnOnce(Value) -> Value + Send>;

/// Boxes a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: FnOnce(Value) -> Value + Send + 'static,
{
    Box::new(f)
}

/// Settlement state: moves from `Pending` to exactly one terminal state,
/// exactly once, and never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Pending => "pending",
            State::Fulfilled => "fulfilled",
            State::Rejected => "rejected",
        })
    }
}

struct Inner {
    state: State,
    value: Option<Value>,
    on_success: Vec<Callback>,
    on_failure: Vec<Callback>,
    wakers: Vec<Waker>,
}

/// A settable, chainable placeholder for a value produced elsewhere.
///
/// A `Promise` starts pending and is settled at most once, by
/// [`resolve`](Promise::resolve) or [`reject`](Promise::reject). Callbacks
/// registered through [`then`](Promise::then) run asynchronously once the
/// promise settles, in registration order, never on the thread that settled
/// or registered them.
///
/// Handles are cheap to clone; all clones share one settlement.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use promise_chain::{callback, Promise, Value};
///
/// let promise = Promise::new();
/// let doubled = promise.then(
///     Some(callback(|v: Value| Value::new(v.get::<i32>().unwrap() * 2))),
///     None,
/// );
/// promise.resolve(Value::new(21));
/// let value = block_on(doubled.outcome()).unwrap();
/// assert_eq!(value.get::<i32>(), Some(42));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Arc<Mutex<Inner>>,
}

impl Promise {
    /// Creates a pending promise. Whoever holds it must eventually settle it.
    pub fn new() -> Self {
        Promise {
            inner: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                value: None,
                on_success: Vec::new(),
                on_failure: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Current settlement state. A non-pending answer is final.
    pub fn state(&self) -> State {
        self.inner.lock().unwrap().state
    }

    /// The settled payload, or `None` while pending.
    pub fn value(&self) -> Option<Value> {
        self.inner.lock().unwrap().value.clone()
    }

    /// Registers `on_success` and `on_failure` to run once this promise is
    /// fulfilled or rejected, and returns a new child promise that settles
    /// with the invoked callback's return value.
    ///
    /// An absent callback passes the value (or reason) through unchanged, so
    /// `then(None, None)` is a forwarding link. A callback that panics
    /// rejects the child with the panic value instead.
    ///
    /// Registration never runs anything inline: even on an already-settled
    /// promise the new pair is dispatched asynchronously.
    pub fn then(&self, on_success: Option<Callback>, on_failure: Option<Callback>) -> Promise {
        let child = Promise::new();
        let (on_success, on_failure) = child.wrap(on_success, on_failure);
        let ready = {
            let mut inner = self.inner.lock().unwrap();
            match inner.state {
                State::Pending => {
                    inner.on_success.push(on_success);
                    inner.on_failure.push(on_failure);
                    None
                }
                State::Fulfilled => Some((settled_value(&inner), on_success)),
                State::Rejected => Some((settled_value(&inner), on_failure)),
            }
        };
        // Late registration: dispatch just this pair's relevant side.
        if let Some((value, callback)) = ready {
            dispatch::run(value, vec![callback]);
        }
        child
    }

    /// Wraps a callback pair so that each one settles `self` (the child of a
    /// `then` call) with its result: the success side fulfills, the failure
    /// side rejects, and a panic in either becomes the child's rejection
    /// rather than escaping to the dispatch thread.
    fn wrap(
        &self,
        on_success: Option<Callback>,
        on_failure: Option<Callback>,
    ) -> (Callback, Callback) {
        let fulfill = {
            let child = self.clone();
            callback(move |value| {
                let run = move || match on_success {
                    Some(f) => f(value),
                    None => value,
                };
                match catch_unwind(AssertUnwindSafe(run)) {
                    Ok(out) => child.resolve(out),
                    Err(payload) => child.reject(Value::from_panic(payload)),
                }
            })
        };
        let fail = {
            let child = self.clone();
            callback(move |value| {
                let run = move || match on_failure {
                    Some(f) => f(value),
                    None => value,
                };
                match catch_unwind(AssertUnwindSafe(run)) {
                    Ok(out) => child.reject(out),
                    Err(payload) => child.reject(Value::from_panic(payload)),
                }
            })
        };
        (fulfill, fail)
    }

    /// Fulfills this promise and returns the value unchanged, for call sites
    /// that resolve with another call's result.
    ///
    /// Dispatch of the success queue is asynchronous: callbacks will not
    /// have run yet when this returns.
    ///
    /// # Panics
    ///
    /// Settling twice is a defect in the calling code, not a recoverable
    /// condition; this panics with [`Error::AlreadySettled`].
    pub fn resolve(&self, value: Value) -> Value {
        match self.try_resolve(value) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Rejects this promise and returns the reason unchanged.
    ///
    /// # Panics
    ///
    /// Like [`resolve`](Promise::resolve), panics if already settled.
    pub fn reject(&self, reason: Value) -> Value {
        match self.try_reject(reason) {
            Ok(reason) => reason,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fulfills this promise unless it has already been settled.
    ///
    /// Meant for racing a settlement against an external timer or competing
    /// producers, where losing the race is expected rather than a defect.
    pub fn try_resolve(&self, value: Value) -> Result<Value, Error> {
        self.settle(State::Fulfilled, value)
    }

    /// Rejects this promise unless it has already been settled.
    pub fn try_reject(&self, reason: Value) -> Result<Value, Error> {
        self.settle(State::Rejected, reason)
    }

    /// A future that completes with the final settlement: `Ok` for
    /// fulfillment, `Err` for rejection. Any number of outcomes may wait on
    /// one promise.
    pub fn outcome(&self) -> Outcome {
        Outcome {
            inner: self.inner.clone(),
        }
    }

    fn settle(&self, state: State, value: Value) -> Result<Value, Error> {
        let (callbacks, wakers) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != State::Pending {
                return Err(Error::AlreadySettled(inner.state));
            }
            inner.state = state;
            inner.value = Some(value.clone());
            // Both queues are drained and discarded on the way out of
            // pending; only the matching side runs.
            let on_success = mem::take(&mut inner.on_success);
            let on_failure = mem::take(&mut inner.on_failure);
            let callbacks = match state {
                State::Fulfilled => on_success,
                _ => on_failure,
            };
            (callbacks, mem::take(&mut inner.wakers))
        };
        for waker in wakers {
            waker.wake();
        }
        dispatch::run(value.clone(), callbacks);
        Ok(value)
    }
}

impl Default for Promise {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("Promise")
            .field("state", &inner.state)
            .field("value", &inner.value)
            .finish_non_exhaustive()
    }
}

fn settled_value(inner: &Inner) -> Value {
    inner.value.clone().expect("settled promise holds a value")
}

/// Waits for a promise's settlement. Created by [`Promise::outcome`].
#[derive(Clone)]
pub struct Outcome {
    inner: Arc<Mutex<Inner>>,
}

impl Future for Outcome {
    type Output = Result<Value, Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Pending => {
                inner.wakers.push(cx.waker().clone());
                Poll::Pending
            }
            State::Fulfilled => Poll::Ready(Ok(settled_value(&inner))),
            State::Rejected => Poll::Ready(Err(settled_value(&inner))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(State::Pending.to_string(), "pending");
        assert_eq!(State::Fulfilled.to_string(), "fulfilled");
        assert_eq!(State::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_resolve_returns_value_unchanged() {
        let promise = Promise::new();
        let value = promise.resolve(Value::new(5_i32));
        assert_eq!(value.get::<i32>(), Some(5));
        assert_eq!(promise.state(), State::Fulfilled);
        assert_eq!(promise.value().and_then(|v| v.get::<i32>()), Some(5));
    }

    #[test]
    fn test_reject_returns_reason_unchanged() {
        let promise = Promise::new();
        let reason = promise.reject(Value::new(String::from("nope")));
        assert_eq!(reason.get::<String>(), Some("nope".into()));
        assert_eq!(promise.state(), State::Rejected);
    }

    #[test]
    #[should_panic(expected = "already fulfilled")]
    fn test_double_settle_panics() {
        let promise = Promise::new();
        promise.resolve(Value::new(1_i32));
        promise.reject(Value::new(2_i32));
    }

    #[test]
    fn test_try_settle_after_settlement() {
        let promise = Promise::new();
        promise.reject(Value::new(String::from("first")));
        assert_eq!(
            promise
                .try_resolve(Value::new(String::from("late")))
                .unwrap_err(),
            Error::AlreadySettled(State::Rejected)
        );
        assert_eq!(
            promise
                .try_reject(Value::new(String::from("late")))
                .unwrap_err(),
            Error::AlreadySettled(State::Rejected)
        );
        // The losing settlements changed nothing.
        assert_eq!(
            promise.value().and_then(|v| v.get::<String>()),
            Some("first".into())
        );
    }
}
