//! Rendered/intrinsic size tracking for image elements.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::ViewError;
use crate::source::ResizeSource;

/// Rendered (layout) and intrinsic (source) pixel size of an image element.
///
/// `complete` stays false until the image resource has finished decoding.
/// Geometry derived from a size that is not [`ready`](Self::is_ready) is
/// undefined and must not be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplaySize {
    pub client_width: f64,
    pub client_height: f64,
    pub natural_width: f64,
    pub natural_height: f64,
    pub complete: bool,
}

impl DisplaySize {
    /// Size of a fully decoded image rendered at the given layout size.
    pub fn loaded(
        client_width: f64,
        client_height: f64,
        natural_width: f64,
        natural_height: f64,
    ) -> Self {
        Self {
            client_width,
            client_height,
            natural_width,
            natural_height,
            complete: true,
        }
    }

    /// Sanitize a raw measurement.
    ///
    /// Non-finite or negative dimensions become zero, and a "complete" image
    /// with a zero natural dimension is reported as not loaded.
    pub fn normalized(self) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let mut size = Self {
            client_width: clean(self.client_width),
            client_height: clean(self.client_height),
            natural_width: clean(self.natural_width),
            natural_height: clean(self.natural_height),
            complete: self.complete,
        };
        if size.natural_width == 0.0 || size.natural_height == 0.0 {
            size.complete = false;
        }
        size
    }

    /// True when scale factors can be derived from this size.
    pub fn is_ready(&self) -> bool {
        self.complete && self.natural_width > 0.0 && self.natural_height > 0.0
    }
}

/// Handle returned by [`SizeObserver::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(DisplaySize)>;

#[derive(Default)]
struct Shared {
    size: Cell<DisplaySize>,
    revision: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

impl Shared {
    /// Replace the current size as a whole. Returns false if nothing changed.
    fn publish(&self, raw: DisplaySize) -> bool {
        let next = raw.normalized();
        if self.size.get() == next {
            return false;
        }
        self.size.set(next);
        self.revision.set(self.revision.get() + 1);

        // Listeners may subscribe/unsubscribe while being notified
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, f)| Rc::clone(f))
            .collect();
        for listener in listeners {
            listener(next);
        }
        true
    }
}

/// Publishes the [`DisplaySize`] of one image element.
///
/// The observer owns the [`ResizeSource`] it is attached to. Detaching,
/// attaching a different source, or dropping the observer releases the
/// platform observation.
pub struct SizeObserver {
    shared: Rc<Shared>,
    source: Option<Box<dyn ResizeSource>>,
}

impl SizeObserver {
    /// Create an observer that is not attached to any element yet.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared::default()),
            source: None,
        }
    }

    /// Attach to an element, replacing any previous one.
    ///
    /// Takes one synchronous measurement, then follows resize and load
    /// notifications until detached.
    pub fn attach(&mut self, mut source: Box<dyn ResizeSource>) -> Result<(), ViewError> {
        self.detach();

        if let Some(size) = source.measure() {
            self.shared.publish(size);
        }

        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        let notify = Rc::new(move |size: DisplaySize| {
            if let Some(shared) = weak.upgrade() {
                shared.publish(size);
            }
        });

        if let Err(e) = source.observe(notify) {
            source.unobserve();
            log::warn!("Size observation failed: {}", e);
            return Err(e);
        }

        log::debug!("Size observer attached ({:?})", self.shared.size.get());
        self.source = Some(source);
        Ok(())
    }

    /// Stop observing and forget the last measured size.
    pub fn detach(&mut self) {
        if self.release() {
            self.shared.publish(DisplaySize::default());
            log::debug!("Size observer detached");
        }
    }

    fn release(&mut self) -> bool {
        match self.source.take() {
            Some(mut source) => {
                source.unobserve();
                true
            }
            None => false,
        }
    }

    /// The latest published size.
    pub fn current(&self) -> DisplaySize {
        self.shared.size.get()
    }

    /// Incremented on every published change.
    pub fn revision(&self) -> u64 {
        self.shared.revision.get()
    }

    /// Register a listener called with every newly published size.
    pub fn subscribe<F>(&self, f: F) -> ListenerId
    where
        F: Fn(DisplaySize) + 'static,
    {
        let id = ListenerId(self.shared.next_listener.get());
        self.shared.next_listener.set(id.0 + 1);
        self.shared.listeners.borrow_mut().push((id, Rc::new(f)));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.shared
            .listeners
            .borrow_mut()
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

impl Default for SizeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SizeObserver {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SizeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeObserver")
            .field("size", &self.shared.size.get())
            .field("revision", &self.shared.revision.get())
            .field("attached", &self.source.is_some())
            .finish()
    }
}
