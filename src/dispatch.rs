//! Asynchronous callback dispatch.
//!
//! Settlement never runs callbacks on the thread that settled or registered
//! them; every batch goes through here instead.

use crate::{Callback, Value};
use std::thread;

/// Runs `callbacks` against `value`, in order, on a fresh thread.
///
/// Order holds within one batch only; batches for different promises may
/// interleave freely. There is no retry here: a panic escaping a callback
/// is a defect in the wrapping installed by `then`, and takes the dispatch
/// thread down with it.
pub(crate) fn run(value: Value, callbacks: Vec<Callback>) {
    if callbacks.is_empty() {
        return;
    }
    thread::spawn(move || {
        for callback in callbacks {
            callback(value.clone());
        }
    });
}
