//! View state held by [`SearchClient`](crate::client::SearchClient).
//!
//! Each logical operation owns one [`OpState`] instead of a loose set of
//! loading/error flags:
//!
//! ```text
//! search:   Idle ─▶ Pending ─▶ Succeeded(SearchOutcome) | Failed("Search failed")
//! upload:   Idle ─▶ Pending ─▶ Succeeded(UploadResult)  | Failed(UploadError)
//!           Idle ─▶ Failed(validation error)             (nothing sent)
//! datasets: Idle ─▶ Pending ─▶ Succeeded(count)         | Failed(logged only)
//! ```
//!
//! The upload form's two inputs are a single [`UploadInput`] union, so a
//! file and pasted text can never both be pending submission.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::{ClientError, UploadError};
use crate::models::{Dataset, DatasetId, Document, DocumentId, UploadResult};
use crate::service::{UploadPayload, UploadRequest};

/// Lifecycle of one asynchronous operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OpState<T, E = String> {
    Idle,
    Pending,
    Succeeded(T),
    Failed(E),
}

impl<T, E> Default for OpState<T, E> {
    fn default() -> Self {
        OpState::Idle
    }
}

impl<T, E> OpState<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, OpState::Pending)
    }

    pub fn succeeded(&self) -> Option<&T> {
        match self {
            OpState::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            OpState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

// ============ Search ============

/// One position in a ranked result list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSlot {
    pub id: DocumentId,
    /// Missing when the service returned fewer scores than ids.
    pub score: Option<f64>,
    /// `None` when the document fetch failed; such slots are skipped when rendering.
    pub document: Option<Document>,
}

/// A settled search: slots in the order the service ranked them.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub dataset_id: Option<DatasetId>,
    pub slots: Vec<ResultSlot>,
    pub total_found: Option<u64>,
}

impl SearchOutcome {
    /// Scores by result index, aligned with `slots`.
    pub fn scores(&self) -> Vec<Option<f64>> {
        self.slots.iter().map(|s| s.score).collect()
    }

    /// Slots whose document was fetched, with their original index.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &ResultSlot, &Document)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.document.as_ref().map(|d| (i, slot, d)))
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }
}

// ============ Datasets ============

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(DatasetId),
}

/// The last-loaded dataset list and the active selection (`None` = default dataset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetCatalog {
    pub datasets: Vec<Dataset>,
    pub selected: Option<DatasetId>,
    pub refresh: OpState<usize>,
}

impl DatasetCatalog {
    /// Install a freshly loaded list. If the selected dataset is gone, the
    /// selection falls back to default and the dropped id is returned.
    pub fn replace(&mut self, datasets: Vec<Dataset>) -> Option<DatasetId> {
        self.datasets = datasets;
        match self.selected {
            Some(id) if !self.contains(id) => {
                self.selected = None;
                Some(id)
            }
            _ => None,
        }
    }

    pub fn contains(&self, id: DatasetId) -> bool {
        self.datasets.iter().any(|d| d.id == id)
    }

    /// Make `id` the only active selection, or clear it with `None`.
    pub fn select(&mut self, id: Option<DatasetId>) -> Result<(), SelectError> {
        if let Some(id) = id {
            if !self.contains(id) {
                return Err(SelectError::UnknownDataset(id));
            }
        }
        self.selected = id;
        Ok(())
    }

    pub fn selected_dataset(&self) -> Option<&Dataset> {
        self.selected
            .and_then(|id| self.datasets.iter().find(|d| d.id == id))
    }
}

// ============ Upload ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadMode {
    #[default]
    File,
    Text,
}

/// A file chosen for upload. Its bytes are read when the upload is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub path: PathBuf,
    pub file_name: String,
}

impl FileSelection {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self { path, file_name }
    }
}

/// The upload payload slot: either a file or pasted text, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadInput {
    File(Option<FileSelection>),
    Text(String),
}

impl Default for UploadInput {
    fn default() -> Self {
        UploadInput::File(None)
    }
}

impl UploadInput {
    pub fn empty(mode: UploadMode) -> Self {
        match mode {
            UploadMode::File => UploadInput::File(None),
            UploadMode::Text => UploadInput::Text(String::new()),
        }
    }

    pub fn mode(&self) -> UploadMode {
        match self {
            UploadInput::File(_) => UploadMode::File,
            UploadInput::Text(_) => UploadMode::Text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub dataset_name: String,
    pub input: UploadInput,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUpload {
    pub dataset_name: String,
    pub source: UploadSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    File(FileSelection),
    Text(String),
}

impl UploadForm {
    pub fn mode(&self) -> UploadMode {
        self.input.mode()
    }

    /// Switch input mode. Switching discards the other mode's input.
    pub fn set_mode(&mut self, mode: UploadMode) {
        if self.mode() != mode {
            self.input = UploadInput::empty(mode);
        }
    }

    /// Fill the file input. From text mode this is a switch to file mode:
    /// pasted text is discarded, as with [`UploadForm::set_mode`].
    pub fn select_file(&mut self, file: FileSelection) {
        self.input = UploadInput::File(Some(file));
    }

    /// Fill the text input. From file mode this is a switch to text mode:
    /// a selected file is discarded, as with [`UploadForm::set_mode`].
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.input = UploadInput::Text(text.into());
    }

    /// Clear name and payload, keeping the current mode.
    pub fn clear_fields(&mut self) {
        self.dataset_name.clear();
        self.input = UploadInput::empty(self.mode());
    }

    /// Name first, then the payload for the current mode.
    pub fn validate(&self) -> Result<ValidUpload, UploadError> {
        let dataset_name = self.dataset_name.trim();
        if dataset_name.is_empty() {
            return Err(UploadError::NameRequired);
        }

        let source = match &self.input {
            UploadInput::File(None) => return Err(UploadError::FileRequired),
            UploadInput::File(Some(file)) => UploadSource::File(file.clone()),
            UploadInput::Text(text) if text.trim().is_empty() => {
                return Err(UploadError::TextRequired)
            }
            UploadInput::Text(text) => UploadSource::Text(text.clone()),
        };

        Ok(ValidUpload {
            dataset_name: dataset_name.to_string(),
            source,
        })
    }
}

impl ValidUpload {
    /// Read the file (if any) and build the request.
    pub async fn into_request(self) -> Result<UploadRequest, ClientError> {
        let payload = match self.source {
            UploadSource::Text(text) => UploadPayload::Text(text),
            UploadSource::File(file) => {
                let bytes = tokio::fs::read(&file.path)
                    .await
                    .map_err(|source| ClientError::Io {
                        path: file.path.display().to_string(),
                        source,
                    })?;
                UploadPayload::File {
                    file_name: file.file_name,
                    bytes,
                }
            }
        };

        Ok(UploadRequest {
            dataset_name: self.dataset_name,
            payload,
        })
    }
}

/// Upload form, its operation state, and panel visibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadView {
    pub form: UploadForm,
    pub state: OpState<UploadResult, UploadError>,
    /// Orthogonal to `state`.
    pub panel_open: bool,
}

impl UploadView {
    /// Clear mode, status and fields, and close the panel.
    pub fn reset(&mut self) {
        *self = UploadView::default();
    }
}

/// Everything a renderer needs, cloned out of the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub search: OpState<SearchOutcome>,
    pub catalog: DatasetCatalog,
    pub upload: UploadView,
}
