//! Optional event handlers for overlay widgets.
//!
//! Widgets turn user interaction into application messages. Rather than
//! spelling out `Option<Box<dyn Fn(T) -> M>>` on every widget, they hold a
//! `Callback<T, M>`:
//!
//! ```ignore
//! let on_pick: Callback<FaceRect, Message> = Callback::new(Message::BoxActivated);
//! if let Some(message) = on_pick.call(rect) {
//!     app.update(message);
//! }
//! ```

use std::fmt;

/// A handler that maps an event payload `T` to a message `M`, or nothing.
pub struct Callback<T, M> {
    f: Option<Box<dyn Fn(T) -> M>>,
}

impl<T, M> Callback<T, M> {
    /// Wrap a handler function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T) -> M + 'static,
    {
        Self {
            f: Some(Box::new(f)),
        }
    }

    /// A callback with no handler; every call yields `None`.
    pub fn none() -> Self {
        Self { f: None }
    }

    /// Invoke the handler, if one is registered.
    pub fn call(&self, value: T) -> Option<M> {
        self.f.as_ref().map(|f| f(value))
    }

    /// Check if a handler is registered.
    pub fn is_some(&self) -> bool {
        self.f.is_some()
    }
}

impl<T, M> Default for Callback<T, M> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T, M> fmt::Debug for Callback<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("set", &self.is_some())
            .finish()
    }
}
