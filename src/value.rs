//! Dynamic settlement payloads.
//!
//! A promise's fulfillment value and its rejection reason share one opaque
//! payload type, so the same callback shape can ride either channel.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

/// An opaque, shareable settlement payload.
///
/// Cloning a `Value` is cheap; every callback dispatched for one settlement
/// observes the same underlying payload.
///
/// # Examples
///
/// ```
/// use promise_chain::Value;
/// let value = Value::new(String::from("🍓"));
/// assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("🍓"));
/// assert!(value.get::<i32>().is_none());
/// ```
#[derive(Clone)]
pub struct Value(Arc<dyn Any + Send + Sync>);

impl Value {
    /// Wraps an arbitrary payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Value(Arc::new(value))
    }

    /// The empty payload, used when a settled call declared no outputs.
    pub fn null() -> Self {
        Value::new(())
    }

    pub fn is_null(&self) -> bool {
        self.0.is::<()>()
    }

    /// Borrows the payload as a concrete type, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Copies the payload out as a concrete type, if it is one.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Converts a caught panic payload into a rejection reason.
    ///
    /// `String` and `&str` payloads (everything `panic!` and failed
    /// assertions produce) come through as `String`. Any other payload is
    /// kept behind a mutex so the original value stays reachable through
    /// [`Value::downcast_ref`].
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<String>() {
            Ok(message) => Value::new(*message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Value::new((*message).to_string()),
                Err(payload) => Value::new(Mutex::new(payload)),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Value(null)")
        } else if let Some(text) = self.downcast_ref::<String>() {
            write!(f, "Value({text:?})")
        } else {
            write!(f, "Value(..)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_downcast() {
        let value = Value::new(7_i32);
        assert_eq!(value.get::<i32>(), Some(7));
        assert_eq!(value.downcast_ref::<i32>(), Some(&7));
        assert!(value.get::<String>().is_none());
        assert!(!value.is_null());
        assert!(Value::null().is_null());
    }

    #[test]
    fn test_clones_share_payload() {
        let value = Value::new(String::from("shared"));
        let copy = value.clone();
        assert_eq!(copy.get::<String>(), value.get::<String>());
    }

    #[test]
    fn test_from_panic_string_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(Value::from_panic(boxed).get::<String>(), Some("boom".into()));

        let boxed: Box<dyn Any + Send> = Box::new("static boom");
        assert_eq!(
            Value::from_panic(boxed).get::<String>(),
            Some("static boom".into())
        );
    }

    #[test]
    fn test_from_panic_keeps_other_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new(42_i32);
        let reason = Value::from_panic(boxed);
        let held = reason
            .downcast_ref::<Mutex<Box<dyn Any + Send>>>()
            .expect("non-string payload is kept");
        assert_eq!(held.lock().unwrap().downcast_ref::<i32>(), Some(&42));
    }
}
