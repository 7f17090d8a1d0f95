//! The face finder page: pick an image, click a face, browse similar faces.
//!
//! Hosts feed [`Message`]s into [`FaceFinder::update`] and execute the
//! [`Command`]s it returns against a [`FaceService`], feeding the resulting
//! message back in. All state lives here; hosts only render it.

use spylab_view::{ResizeSource, ViewError};

use crate::constants::DEFAULT_DISTANCE_DECIMALS;
use crate::model::{AnalyzeResponse, Face, FaceBox, FaceRect, SimilarFace, SimilarityFilters};
use crate::overlay::ImageBoxOverlay;
use crate::present::{decorate, detail_title, ResultRow};
use crate::selection::{SelectionController, SimilarityRequest, SimilarityResults, Ticket};
use crate::service::{FaceService, ServiceError, UploadFile};

/// Events driving the face finder.
#[derive(Debug, Clone)]
pub enum Message<F> {
    /// A file was picked or dropped (`None` when the pick was cancelled)
    FileSelected(Option<F>),
    /// `/analyze` completed
    AnalysisFinished(Ticket, Result<AnalyzeResponse, ServiceError>),
    /// A face box was clicked
    BoxActivated(FaceRect),
    /// The result filters changed
    FiltersChanged(SimilarityFilters),
    /// `/similar-to-image` completed
    SimilarityFinished(Ticket, Result<Vec<SimilarFace>, ServiceError>),
    /// A result row's preview was clicked
    DetailOpened(usize),
    DetailClosed,
}

/// Upload to analyze.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest<F> {
    pub ticket: Ticket,
    pub file: F,
}

/// Backend work requested by the face finder.
#[derive(Debug, Clone)]
pub enum Command<F> {
    Analyze(AnalyzeRequest<F>),
    FindSimilar(SimilarityRequest<F>),
}

/// Progress of the face detection on the selected file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnalysisState {
    #[default]
    Idle,
    Analyzing(Ticket),
    Ready(AnalyzeResponse),
    Failed(String),
}

/// Full-size source image of one result with its face outlined.
#[derive(Debug)]
pub struct DetailView {
    pub title: String,
    pub face: Face,
    pub overlay: ImageBoxOverlay<()>,
}

impl DetailView {
    pub fn new(face: Face) -> Self {
        let mut overlay = ImageBoxOverlay::new();
        overlay.set_boxes(vec![FaceBox {
            is_strong: true,
            ..FaceBox::new(face.rect())
        }]);
        Self {
            title: detail_title(&face),
            face,
            overlay,
        }
    }

    /// Show the source image in `element`.
    pub fn attach(&mut self, element: Box<dyn ResizeSource>) -> Result<(), ViewError> {
        let url = self.face.source_url.clone();
        self.overlay.set_source(url, element)
    }
}

/// Page state of the face finder.
#[derive(Debug)]
pub struct FaceFinder<F> {
    selection: SelectionController<F>,
    overlay: ImageBoxOverlay<Message<F>>,
    analysis: AnalysisState,
    analysis_generation: u64,
    detail: Option<DetailView>,
    distance_decimals: u32,
}

impl<F: UploadFile + 'static> FaceFinder<F> {
    pub fn new(filters: SimilarityFilters) -> Self {
        Self {
            selection: SelectionController::new(filters),
            overlay: ImageBoxOverlay::new().on_box_activated(Message::BoxActivated),
            analysis: AnalysisState::Idle,
            analysis_generation: 0,
            detail: None,
            distance_decimals: DEFAULT_DISTANCE_DECIMALS,
        }
    }

    /// Decimals shown for similarity distances.
    pub fn with_distance_decimals(mut self, decimals: u32) -> Self {
        self.distance_decimals = decimals;
        self
    }

    /// Handle one message, returning the backend call to make, if any.
    pub fn update(&mut self, message: Message<F>) -> Option<Command<F>> {
        match message {
            Message::FileSelected(file) => self.start_analysis(file).map(Command::Analyze),
            Message::AnalysisFinished(ticket, result) => {
                self.apply_analysis(ticket, result);
                None
            }
            Message::BoxActivated(rect) => self.activate_box(rect).map(Command::FindSimilar),
            Message::FiltersChanged(filters) => {
                self.selection.set_filters(filters).map(Command::FindSimilar)
            }
            Message::SimilarityFinished(ticket, result) => {
                self.selection.apply_response(ticket, result);
                None
            }
            Message::DetailOpened(index) => {
                self.open_detail(index);
                None
            }
            Message::DetailClosed => {
                self.close_detail();
                None
            }
        }
    }

    /// Select a file and request its analysis.
    ///
    /// The previous file's boxes disappear right away. Missing or empty
    /// files are ignored.
    pub fn start_analysis(&mut self, file: Option<F>) -> Option<AnalyzeRequest<F>> {
        if !self.selection.on_file_selected(file) {
            return None;
        }
        let file = self.selection.selected_file()?.clone();

        self.analysis_generation += 1;
        let ticket = Ticket(self.analysis_generation);
        self.analysis = AnalysisState::Analyzing(ticket);
        self.overlay.clear_source();
        self.overlay.set_boxes(Vec::new());
        self.detail = None;

        log::info!("Analyzing {}", file.name());
        Some(AnalyzeRequest { ticket, file })
    }

    /// Install the detected faces, unless another file was selected meanwhile.
    pub fn apply_analysis(
        &mut self,
        ticket: Ticket,
        result: Result<AnalyzeResponse, ServiceError>,
    ) -> bool {
        if self.analysis != AnalysisState::Analyzing(ticket) {
            log::debug!("Discarding stale analysis {:?}", ticket);
            return false;
        }

        match result {
            Ok(response) => {
                log::info!("Detected {} faces", response.boxes.len());
                self.overlay.set_boxes(decorate(&response.boxes));
                self.overlay.mark_selected(self.selection.selected_rect());
                self.analysis = AnalysisState::Ready(response);
            }
            Err(e) => {
                log::error!("Face analysis failed: {}", e);
                self.analysis = AnalysisState::Failed(e.to_string());
            }
        }
        true
    }

    /// Show the selected file in `element`, e.g. once its object URL exists.
    pub fn attach_image(
        &mut self,
        url: impl Into<String>,
        element: Box<dyn ResizeSource>,
    ) -> Result<(), ViewError> {
        self.overlay.set_source(url, element)
    }

    /// Whether the analyzed file is ready but not shown in an image element
    /// yet. Stays false when a superseded analysis finishes late.
    pub fn image_pending(&self) -> bool {
        matches!(self.analysis, AnalysisState::Ready(_)) && self.overlay.source_url().is_none()
    }

    /// Select a face rectangle.
    pub fn activate_box(&mut self, rect: FaceRect) -> Option<SimilarityRequest<F>> {
        let request = self.selection.on_box_activated(rect);
        self.overlay.mark_selected(self.selection.selected_rect());
        request
    }

    /// Select the face under a point of the rendered image.
    pub fn activate_box_at(&mut self, px: f64, py: f64) -> Option<Command<F>> {
        let message = self.overlay.activate_at(px, py)?;
        self.update(message)
    }

    /// Query the backend for the current selection and apply the answer.
    pub async fn run_similarity<S>(&mut self, service: &S, request: SimilarityRequest<F>) -> bool
    where
        S: FaceService<F>,
    {
        let result = service
            .similar_to_image(&request.file, &request.rect, &request.filters)
            .await;
        self.selection.apply_response(request.ticket, result)
    }

    /// Open the detail view for a result row.
    pub fn open_detail(&mut self, index: usize) -> Option<&DetailView> {
        let face = self.selection.results().faces().get(index)?.face.clone();
        log::debug!("Opening detail for face {}", face.id);
        self.detail = Some(DetailView::new(face));
        self.detail.as_ref()
    }

    pub fn close_detail(&mut self) {
        if self.detail.take().is_some() {
            log::debug!("Detail closed");
        }
    }

    /// Result rows in backend order.
    pub fn results(&self) -> Vec<ResultRow> {
        self.selection
            .results()
            .faces()
            .iter()
            .map(|hit| ResultRow::new(hit, self.distance_decimals))
            .collect()
    }

    pub fn similarity(&self) -> &SimilarityResults {
        self.selection.results()
    }

    pub fn selection(&self) -> &SelectionController<F> {
        &self.selection
    }

    pub fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    pub fn overlay(&self) -> &ImageBoxOverlay<Message<F>> {
        &self.overlay
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn detail_mut(&mut self) -> Option<&mut DetailView> {
        self.detail.as_mut()
    }
}

/// Perform a command against `service`, producing the message that reports
/// its outcome.
pub async fn execute<F, S>(service: &S, command: Command<F>) -> Message<F>
where
    F: UploadFile,
    S: FaceService<F>,
{
    match command {
        Command::Analyze(request) => {
            let result = service.analyze(&request.file).await;
            Message::AnalysisFinished(request.ticket, result)
        }
        Command::FindSimilar(request) => {
            let result = service
                .similar_to_image(&request.file, &request.rect, &request.filters)
                .await;
            Message::SimilarityFinished(request.ticket, result)
        }
    }
}
