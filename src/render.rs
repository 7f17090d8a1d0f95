//! Drawing the overlay into a raster image for the native host.

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use spylab_view::DisplaySize;
use thiserror::Error;

use crate::constants::{BOX_STROKE, STRONG_BOX_STROKE};
use crate::geometry::PlacedBox;

/// Errors that can occur while rendering an overlay.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The display size has no area
    #[error("Cannot render into a {width}x{height} display")]
    EmptyDisplay { width: f64, height: f64 },
}

/// Rendered size of an image: `width` if given (never upscaled), otherwise
/// the natural width, then shrunk to `max_height` keeping the aspect ratio.
pub fn display_dimensions(natural: (u32, u32), width: Option<u32>, max_height: u32) -> (u32, u32) {
    let (nw, nh) = natural;
    if nw == 0 || nh == 0 {
        return (0, 0);
    }

    let mut w = f64::from(width.unwrap_or(nw).min(nw).max(1));
    let mut h = w * f64::from(nh) / f64::from(nw);
    if max_height > 0 && h > f64::from(max_height) {
        h = f64::from(max_height);
        w = h * f64::from(nw) / f64::from(nh);
    }
    (w.round().max(1.0) as u32, h.round().max(1.0) as u32)
}

/// Scale `image` to the display size and outline every placed box.
///
/// The selected box gets a thicker border.
pub fn render_overlay(
    image: &DynamicImage,
    size: &DisplaySize,
    placed: &[PlacedBox],
) -> Result<RgbImage, RenderError> {
    let width = size.client_width.round();
    let height = size.client_height.round();
    if width < 1.0 || height < 1.0 {
        return Err(RenderError::EmptyDisplay {
            width: size.client_width,
            height: size.client_height,
        });
    }

    let mut canvas = image
        .resize_exact(width as u32, height as u32, FilterType::Triangle)
        .to_rgb8();

    for placed_box in placed {
        let color = Rgb(placed_box.face.border_color().0);
        let stroke = if placed_box.face.is_strong {
            STRONG_BOX_STROKE
        } else {
            BOX_STROKE
        };
        for inset in 0..stroke {
            if let Some(rect) = inset_rect(placed_box, inset) {
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
    }

    log::debug!(
        "Rendered {} boxes onto {}x{} image",
        placed.len(),
        canvas.width(),
        canvas.height()
    );
    Ok(canvas)
}

fn inset_rect(placed: &PlacedBox, inset: u32) -> Option<Rect> {
    let s = &placed.scaled;
    let inset = f64::from(inset);
    let width = (s.width - 2.0 * inset).round();
    let height = (s.height - 2.0 * inset).round();
    if width < 1.0 || height < 1.0 {
        return None;
    }
    Some(
        Rect::at((s.left + inset).round() as i32, (s.top + inset).round() as i32)
            .of_size(width as u32, height as u32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::place_boxes;
    use crate::model::{BoxColor, FaceBox, FaceRect};

    #[test]
    fn test_display_dimensions() {
        assert_eq!(display_dimensions((400, 200), Some(200), 500), (200, 100));
        assert_eq!(display_dimensions((400, 200), None, 500), (400, 200));
        assert_eq!(display_dimensions((400, 200), Some(800), 500), (400, 200));
        assert_eq!(display_dimensions((400, 1000), None, 500), (200, 500));
        assert_eq!(display_dimensions((0, 200), Some(100), 500), (0, 0));
    }

    #[test]
    fn test_render_draws_box_borders() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 200, Rgb([0, 0, 0])));
        let size = DisplaySize::loaded(200.0, 100.0, 400.0, 200.0);
        let boxes = vec![
            FaceBox::new(FaceRect::new(10.0, 10.0, 50.0, 50.0)).with_color(BoxColor::RED),
            FaceBox::new(FaceRect::new(200.0, 40.0, 100.0, 100.0)),
        ];
        let placed = place_boxes(&boxes, &size);

        let canvas = render_overlay(&image, &size, &placed).unwrap();

        assert_eq!(canvas.dimensions(), (200, 100));
        assert_eq!(canvas.get_pixel(5, 5), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(100, 20), &Rgb([144, 238, 144]));
        assert_eq!(canvas.get_pixel(15, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_strong_box_is_thicker() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0])));
        let size = DisplaySize::loaded(100.0, 100.0, 100.0, 100.0);
        let mut face = FaceBox::new(FaceRect::new(10.0, 10.0, 40.0, 40.0));
        face.is_strong = true;
        let placed = place_boxes(&[face], &size);

        let canvas = render_overlay(&image, &size, &placed).unwrap();
        assert_eq!(canvas.get_pixel(12, 30), &Rgb([144, 238, 144]));
        assert_eq!(canvas.get_pixel(13, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_rejects_empty_display() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let err = render_overlay(&image, &DisplaySize::default(), &[]).unwrap_err();
        assert!(matches!(err, RenderError::EmptyDisplay { .. }));
    }
}
