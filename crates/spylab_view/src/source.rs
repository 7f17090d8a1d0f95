//! The resize-observation capability and a manually driven implementation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ViewError;
use crate::size::DisplaySize;

/// Sink for fresh measurements, handed to a source by the observer.
pub type Notify = Rc<dyn Fn(DisplaySize)>;

/// Platform capability for watching the size of one image element.
///
/// Implementations report a full measurement through `notify` whenever the
/// element's layout size changes or its image finishes loading.
pub trait ResizeSource {
    /// Measure the element now. `None` if the element does not exist.
    fn measure(&self) -> Option<DisplaySize>;

    /// Start delivering notifications.
    fn observe(&mut self, notify: Notify) -> Result<(), ViewError>;

    /// Stop delivering notifications and release platform resources.
    /// Must be safe to call more than once.
    fn unobserve(&mut self);
}

#[derive(Default)]
struct ElementState {
    size: DisplaySize,
    notify: Option<Notify>,
}

/// An image element driven by hand.
///
/// Used by the native host, which knows the layout it renders into, and by
/// tests. Clones share the same element.
#[derive(Clone, Default)]
pub struct ManualElement {
    state: Rc<RefCell<ElementState>>,
}

impl ManualElement {
    /// An element with no layout and no loaded image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the rendered size (a resize notification).
    pub fn set_layout(&self, client_width: f64, client_height: f64) {
        self.update(|size| {
            size.client_width = client_width;
            size.client_height = client_height;
        });
    }

    /// Finish decoding the image (a load notification).
    pub fn finish_loading(&self, natural_width: f64, natural_height: f64) {
        self.update(|size| {
            size.natural_width = natural_width;
            size.natural_height = natural_height;
            size.complete = true;
        });
    }

    /// Swap in a new, not yet decoded image.
    pub fn reset_image(&self) {
        self.update(|size| {
            size.natural_width = 0.0;
            size.natural_height = 0.0;
            size.complete = false;
        });
    }

    /// Whether an observer is currently registered.
    pub fn is_observed(&self) -> bool {
        self.state.borrow().notify.is_some()
    }

    /// The raw, unnormalized size of the element.
    pub fn size(&self) -> DisplaySize {
        self.state.borrow().size
    }

    /// A [`ResizeSource`] bound to this element.
    pub fn source(&self) -> ManualResizeSource {
        ManualResizeSource {
            element: self.clone(),
            registered: false,
        }
    }

    fn update(&self, f: impl FnOnce(&mut DisplaySize)) {
        let (size, notify) = {
            let mut state = self.state.borrow_mut();
            f(&mut state.size);
            (state.size, state.notify.clone())
        };
        if let Some(notify) = notify {
            notify(size);
        }
    }
}

impl std::fmt::Debug for ManualElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualElement")
            .field("size", &self.size())
            .field("observed", &self.is_observed())
            .finish()
    }
}

/// [`ResizeSource`] for a [`ManualElement`].
#[derive(Debug)]
pub struct ManualResizeSource {
    element: ManualElement,
    registered: bool,
}

impl ResizeSource for ManualResizeSource {
    fn measure(&self) -> Option<DisplaySize> {
        Some(self.element.size())
    }

    fn observe(&mut self, notify: Notify) -> Result<(), ViewError> {
        let mut state = self.element.state.borrow_mut();
        if state.notify.is_some() {
            return Err(ViewError::observe("element is already observed"));
        }
        state.notify = Some(notify);
        self.registered = true;
        Ok(())
    }

    fn unobserve(&mut self) {
        if std::mem::take(&mut self.registered) {
            self.element.state.borrow_mut().notify = None;
        }
    }
}

impl Drop for ManualResizeSource {
    fn drop(&mut self) {
        self.unobserve();
    }
}
