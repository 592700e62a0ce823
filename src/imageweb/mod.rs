//! The image generation page: login, the prompt form with its persisted draft, reference
//! images, generation and history.

pub mod app;
pub mod draft;
pub mod facts;
pub mod files;
pub mod form;
pub mod generate;
pub mod history;
pub mod refs;
pub mod session;

pub use app::ImageWebApp;
pub use draft::{Draft, DraftStore};
pub use files::{PreviewUrls, SelectedFile};
pub use refs::{ReferenceList, RowId};

pub(crate) const LOADING_TEXT: &str = "Загрузка…";
