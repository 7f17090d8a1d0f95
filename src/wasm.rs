//! Browser host.
//!
//! The page owns the markup and the HTTP client; this module owns the state.
//! The page passes in a backend object whose `analyze(file)` and
//! `similarToImage(file, x, y, w, h, quality)` methods return promises of the
//! parsed JSON bodies, and re-renders whenever the `on_change` callback fires.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, Promise, Reflect, JSON};
use serde::Serialize;
use serde::de::DeserializeOwned;
use spylab_view::web::{image_element_by_id, ImageElementSource};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::File;

use crate::config::AppConfig;
use crate::finder::{execute, AnalysisState, FaceFinder, Message};
use crate::geometry::PlacedBox;
use crate::model::{AnalyzeResponse, FaceRect, SimilarFace, SimilarityFilters};
use crate::selection::SimilarityResults;
use crate::service::{endpoints, FaceService, ServiceError, UploadFile};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let level = AppConfig::load_from_local_storage()
        .unwrap_or_default()
        .preferences
        .log_level;
    if let Err(e) = console_log::init_with_level(level.to_level()) {
        web_sys::console::log_1(&format!("Logger already initialized: {}", e).into());
    }
    log::info!("SpyLab starting");
}

impl UploadFile for File {
    fn name(&self) -> String {
        File::name(self)
    }

    fn size(&self) -> u64 {
        web_sys::Blob::size(self) as u64
    }
}

/// Forwards backend calls to the page's API client.
struct JsBackend {
    client: JsValue,
}

impl JsBackend {
    async fn call(&self, method: &str, endpoint: &str, args: &Array) -> Result<JsValue, ServiceError> {
        let function: Function = Reflect::get(&self.client, &method.into())
            .ok()
            .and_then(|f| f.dyn_into().ok())
            .ok_or_else(|| ServiceError::Network(format!("Backend has no `{}` method", method)))?;

        let promise: Promise = function
            .apply(&self.client, args)
            .map_err(|e| js_error(endpoint, &e))?
            .dyn_into()
            .map_err(|_| ServiceError::invalid_response(endpoint, "expected a Promise"))?;

        JsFuture::from(promise)
            .await
            .map_err(|e| js_error(endpoint, &e))
    }
}

fn parse<T: DeserializeOwned>(endpoint: &str, value: &JsValue) -> Result<T, ServiceError> {
    let json: String = JSON::stringify(value)
        .map_err(|e| js_error(endpoint, &e))?
        .into();
    serde_json::from_str(&json).map_err(|e| ServiceError::invalid_response(endpoint, e.to_string()))
}

/// Rejections carrying a numeric `status` are HTTP failures, anything else a
/// network failure.
fn js_error(endpoint: &str, error: &JsValue) -> ServiceError {
    let field = |name: &str| Reflect::get(error, &name.into()).ok();
    let status = field("status").and_then(|s| s.as_f64());
    let message = field("message")
        .and_then(|m| m.as_string())
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{:?}", error));

    match status {
        Some(status) => ServiceError::http(endpoint, status as u16, message),
        None => ServiceError::Network(message),
    }
}

impl FaceService<File> for JsBackend {
    async fn analyze(&self, file: &File) -> Result<AnalyzeResponse, ServiceError> {
        let value = self
            .call("analyze", endpoints::ANALYZE, &Array::of1(file))
            .await?;
        parse(endpoints::ANALYZE, &value)
    }

    async fn similar_to_image(
        &self,
        file: &File,
        rect: &FaceRect,
        filters: &SimilarityFilters,
    ) -> Result<Vec<SimilarFace>, ServiceError> {
        let args = Array::of5(
            file,
            &rect.x.into(),
            &rect.y.into(),
            &rect.w.into(),
            &rect.h.into(),
        );
        args.push(
            &filters
                .quality
                .map_or(JsValue::UNDEFINED, |q| JsValue::from_f64(q as f64)),
        );
        let value = self
            .call("similarToImage", endpoints::SIMILAR_TO_IMAGE, &args)
            .await?;
        parse(endpoints::SIMILAR_TO_IMAGE, &value)
    }
}

/// A box positioned in percent of the rendered image.
#[derive(Serialize)]
struct BoxStyle<'a> {
    index: usize,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    color: String,
    tooltip: Option<&'a str>,
    strong: bool,
}

fn box_styles(placed: &[PlacedBox], size: &spylab_view::DisplaySize) -> Vec<BoxStyle<'_>> {
    placed
        .iter()
        .enumerate()
        .filter_map(|(index, b)| {
            let pct = b.scaled.to_percent(size)?;
            Some(BoxStyle {
                index,
                left: pct.left,
                top: pct.top,
                width: pct.width,
                height: pct.height,
                color: b.face.border_color().to_css(),
                tooltip: b.face.tooltip.as_deref(),
                strong: b.face.is_strong,
            })
        })
        .collect()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

struct Session {
    finder: RefCell<FaceFinder<File>>,
    backend: JsBackend,
    config: RefCell<AppConfig>,
    image_id: String,
    object_url: RefCell<Option<String>>,
    on_change: RefCell<Option<Function>>,
}

impl Session {
    fn notify(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                log::warn!("on_change callback failed: {:?}", e);
            }
        }
    }

    /// Notify from a fresh task, after any borrow of the finder is released.
    fn notify_later(session: Weak<Session>) {
        wasm_bindgen_futures::spawn_local(async move {
            if let Some(session) = session.upgrade() {
                session.notify();
            }
        });
    }

    fn dispatch(session: &Rc<Session>, message: Message<File>) {
        let command = session.finder.borrow_mut().update(message);
        if session.finder.borrow().image_pending() {
            session.show_selected_image();
        }
        session.notify();

        if let Some(command) = command {
            let session = Rc::clone(session);
            wasm_bindgen_futures::spawn_local(async move {
                let message = execute(&session.backend, command).await;
                Session::dispatch(&session, message);
            });
        }
    }

    /// Put the analyzed file into the page's image element.
    fn show_selected_image(&self) {
        let mut finder = self.finder.borrow_mut();
        let Some(file) = finder.selection().selected_file().cloned() else {
            return;
        };

        let element = match image_element_by_id(&self.image_id) {
            Ok(element) => element,
            Err(e) => {
                log::error!("{}", e);
                return;
            }
        };
        let url = match web_sys::Url::create_object_url_with_blob(&file) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Failed to create object URL: {:?}", e);
                return;
            }
        };
        if let Some(old) = self.object_url.replace(Some(url.clone())) {
            let _ = web_sys::Url::revoke_object_url(&old);
        }

        element.set_src(&url);
        if let Err(e) = finder.attach_image(url, Box::new(ImageElementSource::new(element))) {
            log::error!("Failed to observe image: {}", e);
        }
    }
}

/// The face finder page, driven from JavaScript.
#[wasm_bindgen]
pub struct WasmFaceFinder {
    session: Rc<Session>,
}

#[wasm_bindgen]
impl WasmFaceFinder {
    /// `backend` is the page's API client, `image_id` the id of the `<img>`
    /// showing the analyzed file.
    #[wasm_bindgen(constructor)]
    pub fn new(backend: JsValue, image_id: String) -> WasmFaceFinder {
        let config = AppConfig::load_from_local_storage().unwrap_or_default();
        let finder = FaceFinder::new(config.preferences.filters())
            .with_distance_decimals(config.preferences.distance_decimals);

        let session = Rc::new(Session {
            finder: RefCell::new(finder),
            backend: JsBackend { client: backend },
            config: RefCell::new(config),
            image_id,
            object_url: RefCell::new(None),
            on_change: RefCell::new(None),
        });

        let weak = Rc::downgrade(&session);
        session
            .finder
            .borrow()
            .overlay()
            .size_observer()
            .subscribe(move |_| Session::notify_later(weak.clone()));

        WasmFaceFinder { session }
    }

    /// Register the function called after every state change.
    pub fn set_on_change(&self, callback: Option<Function>) {
        *self.session.on_change.borrow_mut() = callback;
    }

    /// A file was picked or dropped.
    pub fn select_file(&self, file: Option<File>) {
        Session::dispatch(&self.session, Message::FileSelected(file));
    }

    /// Click at a point of the rendered image, in CSS pixels.
    pub fn activate_at(&self, x: f64, y: f64) {
        let command = self.session.finder.borrow_mut().activate_box_at(x, y);
        self.session.notify();
        if let Some(command) = command {
            let session = Rc::clone(&self.session);
            wasm_bindgen_futures::spawn_local(async move {
                let message = execute(&session.backend, command).await;
                Session::dispatch(&session, message);
            });
        }
    }

    /// Click on the box at `index` in display order.
    pub fn activate_box(&self, index: usize) {
        let message = self.session.finder.borrow().overlay().activate(index);
        if let Some(message) = message {
            Session::dispatch(&self.session, message);
        }
    }

    /// Toggle the "high quality only" filter and remember the choice.
    pub fn set_high_quality(&self, enabled: bool) {
        {
            let mut config = self.session.config.borrow_mut();
            config.preferences.high_quality_only = enabled;
            if let Err(e) = config.save_to_local_storage() {
                log::warn!("{}", e);
            }
        }
        Session::dispatch(
            &self.session,
            Message::FiltersChanged(SimilarityFilters::high_quality(enabled)),
        );
    }

    pub fn high_quality(&self) -> bool {
        self.session.config.borrow().preferences.high_quality_only
    }

    /// Boxes of the analyzed image as JSON, positioned in percent.
    pub fn boxes(&self) -> Result<String, JsValue> {
        let finder = self.session.finder.borrow();
        let overlay = finder.overlay();
        let placed = overlay.placed_boxes();
        to_json(&box_styles(&placed, &overlay.display_size()))
    }

    /// Result rows as JSON.
    pub fn results(&self) -> Result<String, JsValue> {
        to_json(&self.session.finder.borrow().results())
    }

    /// One of `idle`, `analyzing`, `analysis-failed`, `searching`,
    /// `search-failed` or `ready`.
    pub fn status(&self) -> String {
        let finder = self.session.finder.borrow();
        let status = match (finder.analysis(), finder.similarity()) {
            (AnalysisState::Idle, _) => "idle",
            (AnalysisState::Analyzing(_), _) => "analyzing",
            (AnalysisState::Failed(_), _) => "analysis-failed",
            (AnalysisState::Ready(_), SimilarityResults::Loading) => "searching",
            (AnalysisState::Ready(_), SimilarityResults::Failed(_)) => "search-failed",
            (AnalysisState::Ready(_), _) => "ready",
        };
        status.to_string()
    }

    /// Error message of the last failed request, if any.
    pub fn error(&self) -> Option<String> {
        let finder = self.session.finder.borrow();
        match finder.analysis() {
            AnalysisState::Failed(message) => Some(message.clone()),
            _ => finder.similarity().error().map(str::to_string),
        }
    }

    /// Open the detail view of result `index`, showing it in the `<img>`
    /// with id `image_id`. Returns the view's title.
    pub fn open_detail(&self, index: usize, image_id: &str) -> Result<Option<String>, JsValue> {
        let element = image_element_by_id(image_id).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let mut finder = self.session.finder.borrow_mut();
        if finder.open_detail(index).is_none() {
            return Ok(None);
        }
        let Some(detail) = finder.detail_mut() else {
            return Ok(None);
        };
        element.set_src(&detail.face.source_url);
        detail
            .attach(Box::new(ImageElementSource::new(element)))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let weak = Rc::downgrade(&self.session);
        detail
            .overlay
            .size_observer()
            .subscribe(move |_| Session::notify_later(weak.clone()));
        Ok(Some(detail.title.clone()))
    }

    /// Boxes of the detail view as JSON.
    pub fn detail_boxes(&self) -> Result<String, JsValue> {
        let finder = self.session.finder.borrow();
        match finder.detail() {
            Some(detail) => {
                let placed = detail.overlay.placed_boxes();
                to_json(&box_styles(&placed, &detail.overlay.display_size()))
            }
            None => Ok("[]".to_string()),
        }
    }

    pub fn close_detail(&self) {
        Session::dispatch(&self.session, Message::DetailClosed);
    }
}

impl Drop for WasmFaceFinder {
    fn drop(&mut self) {
        if let Some(url) = self.session.object_url.borrow_mut().take() {
            let _ = web_sys::Url::revoke_object_url(&url);
        }
    }
}
