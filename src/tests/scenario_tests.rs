//! End-to-end selection scenarios driven through `FaceFinder::update`.
//!
//! Backend calls are executed with `execute` against a recorded service and
//! their completion messages delivered in whatever order a test needs.

use spylab_view::ManualElement;

use super::similar_face;
use crate::finder::{execute, AnalysisState, Command, FaceFinder, Message};
use crate::model::{AnalyzeBox, AnalyzeResponse, FaceRect, SimilarFace, SimilarityFilters};
use crate::selection::SimilarityResults;
use crate::service::{ImageFile, RecordedService, ServiceError};

const R1: FaceRect = FaceRect {
    x: 10.0,
    y: 10.0,
    w: 50.0,
    h: 50.0,
};

fn analysis() -> AnalyzeResponse {
    AnalyzeResponse {
        preview_url: "http://api/preview/".to_string(),
        source_url: "http://api/source_img/".to_string(),
        boxes: vec![
            AnalyzeBox {
                x: R1.x,
                y: R1.y,
                w: R1.w,
                h: R1.h,
                face_confidence: 0.99,
                similar_faces: 4,
            },
            AnalyzeBox {
                x: 200.0,
                y: 40.0,
                w: 100.0,
                h: 100.0,
                face_confidence: 0.97,
                similar_faces: 0,
            },
        ],
    }
}

fn file(name: &str) -> ImageFile {
    ImageFile::new(name, name.as_bytes().to_vec())
}

fn loaded_element() -> ManualElement {
    let element = ManualElement::new();
    element.set_layout(200.0, 100.0);
    element.finish_loading(400.0, 200.0);
    element
}

fn run(service: &RecordedService, command: Command<ImageFile>) -> Message<ImageFile> {
    pollster::block_on(execute(service, command))
}

/// Select `name`, let its analysis finish and show it in `element`.
fn pick(finder: &mut FaceFinder<ImageFile>, name: &str, element: &ManualElement) {
    let service = RecordedService::new(Some(analysis()), None);
    let command = finder
        .update(Message::FileSelected(Some(file(name))))
        .unwrap();
    let done = run(&service, command);
    assert!(finder.update(done).is_none());
    finder
        .attach_image(format!("blob:{}", name), Box::new(element.source()))
        .unwrap();
}

fn hits(ids: &[u64]) -> Vec<SimilarFace> {
    ids.iter()
        .map(|&id| similar_face(id, 0.1 * id as f64, Some(1.0)))
        .collect()
}

#[test]
fn test_reference_box_placement() {
    let element = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());
    pick(&mut finder, "a.jpg", &element);

    let placed = finder.overlay().placed_boxes();
    assert_eq!(placed[0].scaled.left, 5.0);
    assert_eq!(placed[0].scaled.top, 5.0);
    assert_eq!(placed[0].scaled.width, 25.0);
    assert_eq!(placed[0].scaled.height, 25.0);
}

#[test]
fn test_file_change_discards_in_flight_query() {
    let element_a = loaded_element();
    let element_b = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());

    pick(&mut finder, "a.jpg", &element_a);
    let q1 = finder.activate_box_at(12.0, 12.0).unwrap();
    let service_a = RecordedService::new(None, Some(hits(&[1, 2])));
    let q1_done = run(&service_a, q1);

    pick(&mut finder, "b.jpg", &element_b);
    assert!(finder.update(q1_done).is_none());

    assert!(finder.results().is_empty());
    assert_eq!(finder.similarity(), &SimilarityResults::Idle);
    assert!(finder.overlay().boxes().iter().all(|b| !b.is_strong));

    let q2 = finder.activate_box_at(12.0, 12.0).unwrap();
    let Command::FindSimilar(request) = &q2 else {
        panic!("expected a similarity command");
    };
    assert_eq!(request.file.name, "b.jpg");
    assert_eq!(request.rect, R1);

    let service_b = RecordedService::new(None, Some(hits(&[7])));
    finder.update(run(&service_b, q2));
    let rows = finder.results();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 7);
}

#[test]
fn test_out_of_order_responses_keep_latest_selection() {
    let element = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());
    pick(&mut finder, "a.jpg", &element);

    let q1 = finder.update(Message::BoxActivated(R1)).unwrap();
    let q2 = finder.activate_box_at(120.0, 40.0).unwrap();

    let q2_done = run(&RecordedService::new(None, Some(hits(&[2]))), q2);
    let q1_done = run(&RecordedService::new(None, Some(hits(&[1]))), q1);
    finder.update(q2_done);
    finder.update(q1_done);

    assert_eq!(finder.results()[0].id, 2);
    assert_eq!(
        finder.selection().selected_rect(),
        Some(&FaceRect::new(200.0, 40.0, 100.0, 100.0))
    );
    assert!(finder.overlay().boxes()[1].is_strong);
}

#[test]
fn test_similarity_failure_shows_no_rows() {
    let element = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());
    pick(&mut finder, "a.jpg", &element);

    let q1 = finder.activate_box_at(12.0, 12.0).unwrap();
    let failed = run(&RecordedService::default(), q1);
    finder.update(failed);

    assert!(finder.results().is_empty());
    assert_eq!(
        finder.similarity().error(),
        Some(ServiceError::NotRecorded("/similar-to-image".to_string()).to_string().as_str())
    );
}

#[test]
fn test_high_quality_toggle_requeries() {
    let element = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());
    pick(&mut finder, "a.jpg", &element);

    let mut faces = hits(&[1, 2]);
    faces[1].quality = Some(0.0);
    let service = RecordedService::new(None, Some(faces));

    let q1 = finder.activate_box_at(12.0, 12.0).unwrap();
    finder.update(run(&service, q1));
    assert_eq!(finder.results().len(), 2);

    let q2 = finder
        .update(Message::FiltersChanged(SimilarityFilters::high_quality(true)))
        .unwrap();
    assert!(finder.similarity().is_loading());
    finder.update(run(&service, q2));

    let rows = finder.results();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].good_quality);
}

#[test]
fn test_empty_drop_keeps_selection() {
    let element = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());
    pick(&mut finder, "a.jpg", &element);
    finder.activate_box_at(12.0, 12.0).unwrap();

    assert!(finder
        .update(Message::FileSelected(Some(ImageFile::new("empty.jpg", Vec::<u8>::new()))))
        .is_none());
    assert!(finder.update(Message::FileSelected(None)).is_none());

    assert_eq!(finder.selection().selected_file().unwrap().name, "a.jpg");
    assert_eq!(finder.selection().selected_rect(), Some(&R1));
    assert!(matches!(finder.analysis(), AnalysisState::Ready(_)));
    assert_eq!(finder.overlay().boxes().len(), 2);
}

#[test]
fn test_result_preview_opens_detail() {
    let element = loaded_element();
    let mut finder = FaceFinder::new(SimilarityFilters::default());
    pick(&mut finder, "a.jpg", &element);

    let q1 = finder.activate_box_at(12.0, 12.0).unwrap();
    finder.update(run(&RecordedService::new(None, Some(hits(&[3, 4]))), q1));
    finder.update(Message::DetailOpened(1));

    let detail = finder.detail().unwrap();
    assert_eq!(detail.face.id, 4);
    assert_eq!(detail.title, "Full size: 30×40px");

    // A new pick closes the detail view.
    pick(&mut finder, "b.jpg", &loaded_element());
    assert!(finder.detail().is_none());
}
