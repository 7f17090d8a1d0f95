//! Face boxes drawn over a responsively scaled image.

use std::cell::RefCell;
use std::rc::Rc;

use spylab_view::{Callback, DisplaySize, ResizeSource, SizeObserver, ViewError};

use crate::geometry::{hit_test, place_boxes, PlacedBox};
use crate::model::{mark_selected, FaceBox, FaceRect};

struct CachedLayout {
    boxes_revision: u64,
    size_revision: u64,
    placed: Rc<[PlacedBox]>,
}

/// An image with clickable face boxes.
///
/// Boxes are given in original image pixels and placed on the rendered image
/// once its size is known. Activating a box hands the *original* rectangle to
/// the `on_box_activated` callback.
pub struct ImageBoxOverlay<M> {
    source_url: Option<String>,
    boxes: Vec<FaceBox>,
    boxes_revision: u64,
    observer: SizeObserver,
    on_box_activated: Callback<FaceRect, M>,
    layout: RefCell<Option<CachedLayout>>,
}

impl<M> ImageBoxOverlay<M> {
    /// Create an overlay with no image and no boxes.
    pub fn new() -> Self {
        Self {
            source_url: None,
            boxes: Vec::new(),
            boxes_revision: 0,
            observer: SizeObserver::new(),
            on_box_activated: Callback::none(),
            layout: RefCell::new(None),
        }
    }

    /// Set the message produced when a box is activated.
    pub fn on_box_activated<F>(mut self, f: F) -> Self
    where
        F: Fn(FaceRect) -> M + 'static,
    {
        self.on_box_activated = Callback::new(f);
        self
    }

    /// Show a new image.
    ///
    /// The observer of the previous image is released before the new element
    /// is measured, so geometry from the old image never leaks into the new one.
    pub fn set_source(
        &mut self,
        url: impl Into<String>,
        element: Box<dyn ResizeSource>,
    ) -> Result<(), ViewError> {
        self.observer.detach();
        self.source_url = Some(url.into());
        log::debug!("Overlay source set to {:?}", self.source_url);
        self.observer.attach(element)
    }

    /// Remove the image and stop observing it.
    pub fn clear_source(&mut self) {
        self.observer.detach();
        self.source_url = None;
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Replace the box list. Insertion order is display order.
    pub fn set_boxes(&mut self, boxes: Vec<FaceBox>) {
        self.boxes = boxes;
        self.boxes_revision += 1;
    }

    pub fn boxes(&self) -> &[FaceBox] {
        &self.boxes
    }

    /// Highlight the box equal to `selected`, clearing any other highlight.
    pub fn mark_selected(&mut self, selected: Option<&FaceRect>) {
        if mark_selected(&mut self.boxes, selected) {
            self.boxes_revision += 1;
        }
    }

    /// The latest observed size of the image.
    pub fn display_size(&self) -> DisplaySize {
        self.observer.current()
    }

    pub fn size_observer(&self) -> &SizeObserver {
        &self.observer
    }

    /// Boxes placed on the rendered image; empty until the image is loaded.
    ///
    /// Recomputed only when the boxes or the observed size changed.
    pub fn placed_boxes(&self) -> Rc<[PlacedBox]> {
        let size_revision = self.observer.revision();
        let mut layout = self.layout.borrow_mut();
        if let Some(cached) = layout.as_ref() {
            if cached.boxes_revision == self.boxes_revision
                && cached.size_revision == size_revision
            {
                return Rc::clone(&cached.placed);
            }
        }

        let placed: Rc<[PlacedBox]> = place_boxes(&self.boxes, &self.observer.current()).into();
        *layout = Some(CachedLayout {
            boxes_revision: self.boxes_revision,
            size_revision,
            placed: Rc::clone(&placed),
        });
        placed
    }

    /// Activate the rendered box at `index` in display order.
    pub fn activate(&self, index: usize) -> Option<M> {
        let placed = self.placed_boxes();
        let face = placed.get(index)?;
        self.on_box_activated.call(face.face.rect)
    }

    /// Activate the box under a point in rendered pixels.
    pub fn activate_at(&self, px: f64, py: f64) -> Option<M> {
        let placed = self.placed_boxes();
        let index = hit_test(&placed, px, py)?;
        log::debug!("Box {} hit at ({}, {})", index, px, py);
        self.on_box_activated.call(placed[index].face.rect)
    }
}

impl<M> Default for ImageBoxOverlay<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for ImageBoxOverlay<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBoxOverlay")
            .field("source_url", &self.source_url)
            .field("boxes", &self.boxes.len())
            .field("observer", &self.observer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spylab_view::ManualElement;

    fn loaded_element() -> ManualElement {
        let element = ManualElement::new();
        element.set_layout(200.0, 100.0);
        element.finish_loading(400.0, 200.0);
        element
    }

    fn overlay_with(element: &ManualElement) -> ImageBoxOverlay<FaceRect> {
        let mut overlay = ImageBoxOverlay::new().on_box_activated(|rect| rect);
        overlay
            .set_source("blob:face.jpg", Box::new(element.source()))
            .unwrap();
        overlay.set_boxes(vec![
            FaceBox::new(FaceRect::new(10.0, 10.0, 50.0, 50.0)),
            FaceBox::new(FaceRect::new(200.0, 40.0, 100.0, 100.0)),
        ]);
        overlay
    }

    #[test]
    fn test_boxes_follow_layout_changes() {
        let element = loaded_element();
        let overlay = overlay_with(&element);

        assert_eq!(overlay.placed_boxes()[0].scaled.left, 5.0);

        element.set_layout(400.0, 200.0);
        assert_eq!(overlay.placed_boxes()[0].scaled.left, 10.0);
        assert_eq!(overlay.placed_boxes()[1].scaled.width, 100.0);
    }

    #[test]
    fn test_nothing_rendered_before_load() {
        let element = ManualElement::new();
        element.set_layout(200.0, 100.0);
        let overlay = overlay_with(&element);

        assert!(overlay.placed_boxes().is_empty());
        assert_eq!(overlay.activate(0), None);
        assert_eq!(overlay.activate_at(10.0, 10.0), None);

        element.finish_loading(400.0, 200.0);
        assert_eq!(overlay.placed_boxes().len(), 2);
    }

    #[test]
    fn test_activation_reports_original_rect() {
        let element = loaded_element();
        let overlay = overlay_with(&element);

        assert_eq!(
            overlay.activate_at(12.0, 12.0),
            Some(FaceRect::new(10.0, 10.0, 50.0, 50.0))
        );
        assert_eq!(
            overlay.activate(1),
            Some(FaceRect::new(200.0, 40.0, 100.0, 100.0))
        );
        assert_eq!(overlay.activate(2), None);
    }

    #[test]
    fn test_placed_boxes_memoized() {
        let element = loaded_element();
        let overlay = overlay_with(&element);

        let first = overlay.placed_boxes();
        let second = overlay.placed_boxes();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_mark_selected_invalidates_layout() {
        let element = loaded_element();
        let mut overlay = overlay_with(&element);
        let before = overlay.placed_boxes();

        overlay.mark_selected(Some(&FaceRect::new(10.0, 10.0, 50.0, 50.0)));
        let after = overlay.placed_boxes();

        assert!(!Rc::ptr_eq(&before, &after));
        assert!(after[0].face.is_strong);
        assert!(!after[1].face.is_strong);
    }

    #[test]
    fn test_replacing_source_releases_old_element() {
        let old = loaded_element();
        let mut overlay = overlay_with(&old);

        let new = ManualElement::new();
        new.set_layout(200.0, 100.0);
        overlay
            .set_source("blob:other.jpg", Box::new(new.source()))
            .unwrap();

        assert!(!old.is_observed());
        assert!(new.is_observed());
        assert_eq!(overlay.source_url(), Some("blob:other.jpg"));
        assert!(overlay.placed_boxes().is_empty());
    }

    #[test]
    fn test_overlay_drop_releases_element() {
        let element = loaded_element();
        {
            let _overlay = overlay_with(&element);
            assert!(element.is_observed());
        }
        assert!(!element.is_observed());
    }

    #[test]
    fn test_no_callback_no_message() {
        let element = loaded_element();
        let mut overlay: ImageBoxOverlay<()> = ImageBoxOverlay::new();
        overlay
            .set_source("detail.jpg", Box::new(element.source()))
            .unwrap();
        overlay.set_boxes(vec![FaceBox::new(FaceRect::new(10.0, 10.0, 50.0, 50.0))]);

        assert_eq!(overlay.placed_boxes().len(), 1);
        assert_eq!(overlay.activate(0), None);
    }
}
