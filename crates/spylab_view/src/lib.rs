//! spylab_view - host-agnostic view plumbing for the SpyLab face finder
//!
//! This crate tracks the rendered and intrinsic size of an image element and
//! provides the callback type used by overlay widgets. The platform resize
//! primitive is hidden behind [`ResizeSource`], with a DOM implementation on
//! wasm32 and a manually driven one everywhere else.

mod callback;
mod error;
mod size;
mod source;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use callback::Callback;
pub use error::ViewError;
pub use size::{DisplaySize, ListenerId, SizeObserver};
pub use source::{ManualElement, ManualResizeSource, Notify, ResizeSource};
