//! Selection state and the similarity query it drives.
//!
//! The controller holds the picked file and the activated face rectangle.
//! Every change to either (or to the filters) starts a new selection
//! generation. A request is tagged with the generation it was issued for,
//! and its response is applied only if that generation is still current,
//! so a slow response can never overwrite results for a newer selection.

use crate::model::{mark_selected, FaceBox, FaceRect, SimilarFace, SimilarityFilters};
use crate::service::{ServiceError, UploadFile};

/// Identifies the selection generation a request was issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) u64);

/// A similarity query ready to be sent to the backend.
#[derive(Debug, Clone)]
pub struct SimilarityRequest<F> {
    pub ticket: Ticket,
    pub file: F,
    pub rect: FaceRect,
    pub filters: SimilarityFilters,
}

/// What the results table shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SimilarityResults {
    /// No complete selection
    #[default]
    Idle,
    /// A request for the current selection is in flight
    Loading,
    Loaded(Vec<SimilarFace>),
    /// The request for the current selection failed
    Failed(String),
}

impl SimilarityResults {
    /// Faces to display; empty unless loaded.
    pub fn faces(&self) -> &[SimilarFace] {
        match self {
            SimilarityResults::Loaded(faces) => faces,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SimilarityResults::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SimilarityResults::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Owns the current (file, rectangle) selection.
#[derive(Debug)]
pub struct SelectionController<F> {
    file: Option<F>,
    rect: Option<FaceRect>,
    filters: SimilarityFilters,
    generation: u64,
    pending: Option<Ticket>,
    results: SimilarityResults,
}

impl<F: UploadFile> SelectionController<F> {
    /// An empty selection.
    pub fn new(filters: SimilarityFilters) -> Self {
        Self {
            file: None,
            rect: None,
            filters,
            generation: 0,
            pending: None,
            results: SimilarityResults::Idle,
        }
    }

    /// A file was picked or dropped.
    ///
    /// Clears the selected rectangle and any results. Missing or empty files
    /// are ignored and the previous selection is kept. Returns whether the
    /// file was accepted.
    pub fn on_file_selected(&mut self, file: Option<F>) -> bool {
        let Some(file) = file.filter(|f| !f.is_empty()) else {
            log::debug!("Ignoring empty file selection");
            return false;
        };

        log::debug!("File selected: {}", file.name());
        self.file = Some(file);
        self.rect = None;
        self.advance();
        self.reissue();
        true
    }

    /// A face box was activated.
    ///
    /// Returns the request to send when the selection became (or stayed)
    /// complete with a different rectangle.
    pub fn on_box_activated(&mut self, rect: FaceRect) -> Option<SimilarityRequest<F>> {
        if self.rect == Some(rect) {
            return None;
        }
        log::debug!("Face selected: {:?}", rect);
        self.rect = Some(rect);
        self.advance();
        self.reissue()
    }

    /// Change the query filters, re-issuing the query if the selection is complete.
    pub fn set_filters(&mut self, filters: SimilarityFilters) -> Option<SimilarityRequest<F>> {
        if self.filters == filters {
            return None;
        }
        self.filters = filters;
        self.advance();
        self.reissue()
    }

    /// Apply a backend response.
    ///
    /// Returns false, leaving the state untouched, if the selection changed
    /// since the request was issued.
    pub fn apply_response(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<SimilarFace>, ServiceError>,
    ) -> bool {
        if self.pending != Some(ticket) {
            log::debug!("Discarding stale similarity response {:?}", ticket);
            return false;
        }
        self.pending = None;
        self.results = match result {
            Ok(faces) => {
                log::info!("Found {} similar faces", faces.len());
                SimilarityResults::Loaded(faces)
            }
            Err(e) => {
                log::error!("Similarity search failed: {}", e);
                SimilarityResults::Failed(e.to_string())
            }
        };
        true
    }

    /// Both a file and a rectangle are selected.
    pub fn is_ready(&self) -> bool {
        self.file.is_some() && self.rect.is_some()
    }

    pub fn selected_file(&self) -> Option<&F> {
        self.file.as_ref()
    }

    pub fn selected_rect(&self) -> Option<&FaceRect> {
        self.rect.as_ref()
    }

    pub fn filters(&self) -> SimilarityFilters {
        self.filters
    }

    pub fn results(&self) -> &SimilarityResults {
        &self.results
    }

    fn ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    /// Mark the box matching the selected rectangle, clearing the rest.
    pub fn highlight(&self, boxes: &mut [FaceBox]) -> bool {
        mark_selected(boxes, self.rect.as_ref())
    }

    fn advance(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    fn reissue(&mut self) -> Option<SimilarityRequest<F>> {
        let (Some(file), Some(rect)) = (self.file.as_ref(), self.rect) else {
            self.results = SimilarityResults::Idle;
            return None;
        };

        let ticket = self.ticket();
        self.pending = Some(ticket);
        self.results = SimilarityResults::Loading;
        log::info!(
            "Searching faces similar to {:?} in {} ({:?})",
            rect,
            file.name(),
            ticket
        );
        Some(SimilarityRequest {
            ticket,
            file: file.clone(),
            rect,
            filters: self.filters,
        })
    }
}

impl<F: UploadFile> Default for SelectionController<F> {
    fn default() -> Self {
        Self::new(SimilarityFilters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ImageFile;
    use crate::tests::similar_face;

    fn file(name: &str) -> ImageFile {
        ImageFile::new(name, vec![0xFFu8, 0xD8, 0xFF])
    }

    const R1: FaceRect = FaceRect {
        x: 10.0,
        y: 10.0,
        w: 50.0,
        h: 50.0,
    };
    const R2: FaceRect = FaceRect {
        x: 100.0,
        y: 20.0,
        w: 40.0,
        h: 40.0,
    };

    #[test]
    fn test_no_request_without_file() {
        let mut sel: SelectionController<ImageFile> = SelectionController::default();
        assert!(sel.on_box_activated(R1).is_none());
        assert!(!sel.is_ready());
        assert_eq!(sel.results(), &SimilarityResults::Idle);
    }

    #[test]
    fn test_request_issued_when_ready() {
        let mut sel = SelectionController::default();
        assert!(sel.on_file_selected(Some(file("a.jpg"))));

        let req = sel.on_box_activated(R1).unwrap();
        assert_eq!(req.rect, R1);
        assert_eq!(req.file.name, "a.jpg");
        assert!(sel.results().is_loading());

        assert!(sel.apply_response(req.ticket, Ok(vec![similar_face(1, 0.1, None)])));
        assert_eq!(sel.results().faces().len(), 1);
    }

    #[test]
    fn test_same_rect_not_reissued() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        assert!(sel.on_box_activated(R1).is_some());
        assert!(sel.on_box_activated(R1).is_none());
    }

    #[test]
    fn test_rect_change_supersedes_in_flight_request() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();
        let q2 = sel.on_box_activated(R2).unwrap();

        // Q2 arrives first, then the older Q1
        assert!(sel.apply_response(q2.ticket, Ok(vec![similar_face(2, 0.2, None)])));
        assert!(!sel.apply_response(q1.ticket, Ok(vec![similar_face(1, 0.1, None)])));

        assert_eq!(sel.results().faces()[0].face.id, 2);
    }

    #[test]
    fn test_new_file_discards_in_flight_response() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();

        sel.on_file_selected(Some(file("b.jpg")));
        assert!(sel.selected_rect().is_none());
        assert_eq!(sel.results(), &SimilarityResults::Idle);

        assert!(!sel.apply_response(q1.ticket, Ok(vec![similar_face(1, 0.1, None)])));
        assert!(sel.results().faces().is_empty());
    }

    #[test]
    fn test_new_file_clears_loaded_results() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();
        sel.apply_response(q1.ticket, Ok(vec![similar_face(1, 0.1, None)]));

        sel.on_file_selected(Some(file("b.jpg")));
        assert!(sel.results().faces().is_empty());
    }

    #[test]
    fn test_empty_or_missing_file_ignored() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();

        assert!(!sel.on_file_selected(None));
        assert!(!sel.on_file_selected(Some(ImageFile::new("empty.jpg", Vec::<u8>::new()))));

        assert_eq!(sel.selected_file().unwrap().name, "a.jpg");
        assert_eq!(sel.selected_rect(), Some(&R1));
        assert!(sel.apply_response(q1.ticket, Ok(Vec::new())));
    }

    #[test]
    fn test_failure_leaves_results_empty() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();

        assert!(sel.apply_response(
            q1.ticket,
            Err(ServiceError::http("/similar-to-image", 500, "Vector not found"))
        ));
        assert!(sel.results().faces().is_empty());
        assert!(sel.results().error().unwrap().contains("500"));
    }

    #[test]
    fn test_response_applied_once() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();

        assert!(sel.apply_response(q1.ticket, Ok(vec![similar_face(1, 0.1, None)])));
        assert!(!sel.apply_response(q1.ticket, Ok(Vec::new())));
        assert_eq!(sel.results().faces().len(), 1);
    }

    #[test]
    fn test_filter_change_reissues() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let q1 = sel.on_box_activated(R1).unwrap();

        let q2 = sel
            .set_filters(SimilarityFilters::high_quality(true))
            .unwrap();
        assert_ne!(q1.ticket, q2.ticket);
        assert_eq!(q2.filters.quality, Some(1));
        assert!(sel.set_filters(SimilarityFilters::high_quality(true)).is_none());
    }

    #[test]
    fn test_filter_change_without_selection() {
        let mut sel: SelectionController<ImageFile> = SelectionController::default();
        assert!(sel
            .set_filters(SimilarityFilters::high_quality(true))
            .is_none());
        assert_eq!(sel.filters().quality, Some(1));
    }

    #[test]
    fn test_highlight_follows_selection() {
        let mut sel = SelectionController::default();
        sel.on_file_selected(Some(file("a.jpg")));
        let mut boxes = vec![FaceBox::new(R1), FaceBox::new(R2)];

        sel.on_box_activated(R2);
        sel.highlight(&mut boxes);
        assert!(!boxes[0].is_strong && boxes[1].is_strong);

        sel.on_file_selected(Some(file("b.jpg")));
        sel.highlight(&mut boxes);
        assert!(boxes.iter().all(|b| !b.is_strong));
    }
}
