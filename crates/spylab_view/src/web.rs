//! DOM `<img>` size observation for the browser host.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlImageElement, ResizeObserver};

use crate::error::ViewError;
use crate::size::DisplaySize;
use crate::source::{Notify, ResizeSource};

/// Look up an `<img>` element by id.
pub fn image_element_by_id(id: &str) -> Result<HtmlImageElement, ViewError> {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(id))
        .ok_or_else(|| ViewError::ElementNotFound(id.to_string()))?
        .dyn_into::<HtmlImageElement>()
        .map_err(|_| ViewError::ElementNotFound(format!("{} is not an <img>", id)))
}

fn measure_element(element: &HtmlImageElement) -> DisplaySize {
    DisplaySize {
        client_width: f64::from(element.client_width()),
        client_height: f64::from(element.client_height()),
        natural_width: f64::from(element.natural_width()),
        natural_height: f64::from(element.natural_height()),
        complete: element.complete(),
    }
}

/// [`ResizeSource`] backed by `ResizeObserver` and the element's `load` event.
pub struct ImageElementSource {
    element: HtmlImageElement,
    observer: Option<ResizeObserver>,
    /// Closures stored to prevent deallocation while registered
    on_resize: Option<Closure<dyn FnMut(js_sys::Array, ResizeObserver)>>,
    on_load: Option<Closure<dyn FnMut(Event)>>,
}

impl ImageElementSource {
    pub fn new(element: HtmlImageElement) -> Self {
        Self {
            element,
            observer: None,
            on_resize: None,
            on_load: None,
        }
    }

    pub fn element(&self) -> &HtmlImageElement {
        &self.element
    }
}

impl ResizeSource for ImageElementSource {
    fn measure(&self) -> Option<DisplaySize> {
        Some(measure_element(&self.element))
    }

    fn observe(&mut self, notify: Notify) -> Result<(), ViewError> {
        self.unobserve();

        let element = self.element.clone();
        let resize_notify = notify.clone();
        let on_resize = Closure::wrap(Box::new(
            move |_entries: js_sys::Array, _observer: ResizeObserver| {
                resize_notify(measure_element(&element));
            },
        ) as Box<dyn FnMut(js_sys::Array, ResizeObserver)>);

        let observer = ResizeObserver::new(on_resize.as_ref().unchecked_ref())
            .map_err(|e| ViewError::observe(format!("{:?}", e)))?;
        observer.observe(&self.element);
        self.observer = Some(observer);
        self.on_resize = Some(on_resize);

        let element = self.element.clone();
        let on_load = Closure::wrap(Box::new(move |_event: Event| {
            notify(measure_element(&element));
        }) as Box<dyn FnMut(Event)>);

        self.element
            .add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())
            .map_err(|e| ViewError::observe(format!("{:?}", e)))?;
        self.on_load = Some(on_load);

        Ok(())
    }

    fn unobserve(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        if let Some(on_load) = self.on_load.take() {
            if let Err(e) = self
                .element
                .remove_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())
            {
                log::warn!("Failed to remove load listener: {:?}", e);
            }
        }
        self.on_resize = None;
    }
}

impl Drop for ImageElementSource {
    fn drop(&mut self) {
        self.unobserve();
    }
}
