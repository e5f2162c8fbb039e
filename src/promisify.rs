//! Wrapping blocking calls into promise-returning ones.
//!
//! [`promisify`] takes a plain function or closure and produces a wrapper
//! that returns a [`Promise`] immediately, running the wrapped call on a
//! background thread and settling the promise with its outcome:
//!
//! * a panic rejects the promise with the panic value;
//! * a `Result` return declares a failure channel, and `Err` rejects the
//!   promise with the failure value;
//! * the remaining outputs fulfill the promise: nothing → a null value, one
//!   output → that value alone, a tuple → an ordered sequence.

use crate::{Promise, Value};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// How a wrapped call's declared outputs settle a promise.
///
/// Whether a failure channel exists is decided structurally by the return
/// type, never by inspecting the runtime value: `Result` declares one,
/// every other implementor does not.
pub trait Outputs: Send + 'static {
    /// Folds the outputs into a settlement: `Ok` fulfills, `Err` rejects.
    fn into_settlement(self) -> Result<Value, Value>;
}

impl Outputs for () {
    fn into_settlement(self) -> Result<Value, Value> {
        Ok(Value::null())
    }
}

impl Outputs for Value {
    fn into_settlement(self) -> Result<Value, Value> {
        Ok(self)
    }
}

impl Outputs for Vec<Value> {
    fn into_settlement(self) -> Result<Value, Value> {
        Ok(Value::new(self))
    }
}

/// `Err` rejects with the failure value; `Ok` strips the failure channel
/// and folds the remaining outputs.
impl<T, E> Outputs for Result<T, E>
where
    T: Outputs,
    E: Any + Send + Sync,
{
    fn into_settlement(self) -> Result<Value, Value> {
        match self {
            Ok(outputs) => outputs.into_settlement(),
            Err(failure) => Err(Value::new(failure)),
        }
    }
}

macro_rules! impl_outputs_single {
    ($($ty:ty),* $(,)?) => {$(
        impl Outputs for $ty {
            fn into_settlement(self) -> Result<Value, Value> {
                Ok(Value::new(self))
            }
        }
    )*};
}

impl_outputs_single! {
    bool, char,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    String, &'static str,
}

macro_rules! impl_outputs_tuple {
    ($($name:ident),+) => {
        /// Multiple outputs fulfill with an ordered sequence, in
        /// declaration order.
        impl<$($name),+> Outputs for ($($name,)+)
        where
            $($name: Any + Send + Sync),+
        {
            fn into_settlement(self) -> Result<Value, Value> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                Ok(Value::new(vec![$(Value::new($name)),+]))
            }
        }
    };
}

impl_outputs_tuple!(A, B);
impl_outputs_tuple!(A, B, C);
impl_outputs_tuple!(A, B, C, D);

/// A callable of fixed arity, invocable with its arguments packed as a
/// tuple. Implemented for functions and closures of up to five parameters
/// whose return type describes its own settlement shape (see [`Outputs`]).
pub trait Callable<Args> {
    type Out: Outputs;

    fn invoke(&self, args: Args) -> Self::Out;
}

macro_rules! impl_callable {
    ($($arg:ident),*) => {
        impl<Fun, Out, $($arg),*> Callable<($($arg,)*)> for Fun
        where
            Fun: Fn($($arg),*) -> Out,
            Out: Outputs,
        {
            type Out = Out;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($arg,)*): ($($arg,)*)) -> Out {
                self($($arg),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);

/// Turns a blocking callable into one that returns a [`Promise`]
/// immediately and settles it from a background thread.
///
/// The wrapper never blocks and may be called any number of times; each
/// call spawns one fire-and-forget thread for the wrapped call. There is no
/// pooling, backpressure, or cancellation.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use promise_chain::promisify;
///
/// fn divide(a: i32, b: i32) -> Result<i32, String> {
///     if b == 0 {
///         return Err(String::from("division by zero"));
///     }
///     Ok(a / b)
/// }
///
/// let wrapped = promisify(divide);
/// let value = block_on(wrapped((6, 3)).outcome()).unwrap();
/// assert_eq!(value.get::<i32>(), Some(2));
///
/// let reason = block_on(wrapped((1, 0)).outcome()).unwrap_err();
/// assert_eq!(reason.get::<String>(), Some(String::from("division by zero")));
/// ```
pub fn promisify<Args, F>(f: F) -> impl Fn(Args) -> Promise
where
    F: Callable<Args> + Send + Sync + 'static,
    Args: Send + 'static,
{
    let f = Arc::new(f);
    move |args| {
        let promise = Promise::new();
        let settle = promise.clone();
        let f = Arc::clone(&f);
        thread::spawn(move || {
            match catch_unwind(AssertUnwindSafe(move || f.invoke(args))) {
                Ok(outputs) => match outputs.into_settlement() {
                    Ok(value) => settle.resolve(value),
                    Err(reason) => settle.reject(reason),
                },
                Err(payload) => settle.reject(Value::from_panic(payload)),
            };
        });
        promise
    }
}
