//! `SearchClient`: the stateful view over a [`SearchService`].
//!
//! All methods take `&self`, so a UI loop (or the interactive session) can
//! keep accepting input while a search or upload is in flight. View state
//! lives behind a mutex that is never held across an `.await`.
//!
//! # Search generations
//!
//! Every accepted search takes the next value of a monotonically increasing
//! generation counter. Document fetches for that search run in a
//! [`JoinSet`] whose abort handles are registered under the same generation.
//! A result is committed only if its generation is still current, and
//! [`SearchClient::cancel_search`] bumps the counter and aborts the task
//! group. A search that was superseded can never overwrite newer state.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use zerostack::client::SearchClient;
//! use zerostack::config::Config;
//! use zerostack::service::HttpSearchService;
//!
//! let config = Config::minimal();
//! let client = SearchClient::new(Arc::new(HttpSearchService::new(&config)?), &config);
//! client.mount().await;
//! client.submit_search("apple pie").await;
//! let view = client.snapshot();
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::{AbortHandle, JoinSet};

use crate::config::Config;
use crate::error::{ClientError, UploadError, SEARCH_FAILED};
use crate::models::{DatasetId, Document, DocumentId, ErrorBody, SearchRequest, UploadResult};
use crate::service::SearchService;
use crate::state::{
    FileSelection, OpState, ResultSlot, SearchOutcome, SelectError, UploadMode, ViewState,
};

/// What happened to a call to [`SearchClient::submit_search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSubmit {
    /// Nothing was sent: the query was blank or a search is already pending.
    Ignored,
    /// The search settled and its outcome is in the view state.
    Settled,
    /// A newer generation (or a cancel) replaced this search; its results were discarded.
    Superseded,
}

/// Mutable state shared by all calls.
#[derive(Default)]
struct Inner {
    view: ViewState,
    generation: u64,
    fanout: Vec<AbortHandle>,
}

impl Inner {
    fn abort_fanout(&mut self) {
        for handle in self.fanout.drain(..) {
            handle.abort();
        }
    }
}

/// Why a search stopped before producing an outcome.
enum SearchStop {
    Superseded,
    Failed(ClientError),
}

impl From<ClientError> for SearchStop {
    fn from(e: ClientError) -> Self {
        SearchStop::Failed(e)
    }
}

pub struct SearchClient {
    service: Arc<dyn SearchService>,
    top_k: usize,
    inner: Mutex<Inner>,
}

impl SearchClient {
    pub fn new(service: Arc<dyn SearchService>, config: &Config) -> Self {
        Self::with_top_k(service, config.search.top_k)
    }

    pub fn with_top_k(service: Arc<dyn SearchService>, top_k: usize) -> Self {
        Self {
            service,
            top_k,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn service(&self) -> &Arc<dyn SearchService> {
        &self.service
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A copy of the current view state for rendering.
    pub fn snapshot(&self) -> ViewState {
        self.lock().view.clone()
    }

    pub fn search_state(&self) -> OpState<SearchOutcome> {
        self.lock().view.search.clone()
    }

    pub fn upload_state(&self) -> OpState<UploadResult, UploadError> {
        self.lock().view.upload.state.clone()
    }

    /// Called once when the view comes up: loads the dataset catalog.
    /// Returns whether the catalog could be loaded.
    pub async fn mount(&self) -> bool {
        self.refresh_datasets().await
    }

    // ============ Search ============

    /// Submit a query against the selected dataset.
    ///
    /// Blank queries and submissions while a search is pending are ignored.
    /// A failed search leaves the generic [`SEARCH_FAILED`] message; a failed
    /// document fetch only blanks that one slot.
    pub async fn submit_search(&self, query: &str) -> SearchSubmit {
        let query = query.trim();
        if query.is_empty() {
            return SearchSubmit::Ignored;
        }

        let (generation, request) = {
            let mut inner = self.lock();
            if inner.view.search.is_pending() {
                tracing::debug!("search already in flight, ignoring submit");
                return SearchSubmit::Ignored;
            }
            inner.generation += 1;
            inner.view.search = OpState::Pending;
            let request = SearchRequest {
                query: query.to_string(),
                top_k: self.top_k,
                dataset_id: inner.view.catalog.selected,
            };
            (inner.generation, request)
        };

        let mut guard = PendingSearch {
            client: self,
            generation,
            armed: true,
        };

        let result = self.run_search(generation, request).await;

        let mut inner = self.lock();
        guard.armed = false;
        if inner.generation != generation {
            return SearchSubmit::Superseded;
        }
        inner.fanout.clear();

        match result {
            Ok(outcome) => {
                inner.view.search = OpState::Succeeded(outcome);
                SearchSubmit::Settled
            }
            Err(SearchStop::Failed(e)) => {
                tracing::warn!(error = %e, "search failed");
                inner.view.search = OpState::Failed(SEARCH_FAILED.to_string());
                SearchSubmit::Settled
            }
            Err(SearchStop::Superseded) => {
                inner.view.search = OpState::Idle;
                SearchSubmit::Superseded
            }
        }
    }

    /// Abandon the pending search, if any. Outstanding document fetches are aborted.
    pub fn cancel_search(&self) -> bool {
        let mut inner = self.lock();
        if !inner.view.search.is_pending() {
            return false;
        }
        inner.generation += 1;
        inner.abort_fanout();
        inner.view.search = OpState::Idle;
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    async fn run_search(
        &self,
        generation: u64,
        request: SearchRequest,
    ) -> Result<SearchOutcome, SearchStop> {
        let response = self.service.search(&request).await?;
        if !self.is_current(generation) {
            return Err(SearchStop::Superseded);
        }

        let documents = self.fetch_documents(generation, &response.results).await?;

        let slots = response
            .results
            .iter()
            .zip(documents)
            .enumerate()
            .map(|(i, (&id, document))| ResultSlot {
                id,
                score: response.scores.get(i).copied(),
                document,
            })
            .collect();

        Ok(SearchOutcome {
            query: request.query,
            dataset_id: request.dataset_id,
            slots,
            total_found: response.total_found,
        })
    }

    /// Fetch every id concurrently. Each result lands in its own slot, so the
    /// returned order matches `ids` whatever order the fetches finish in.
    async fn fetch_documents(
        &self,
        generation: u64,
        ids: &[DocumentId],
    ) -> Result<Vec<Option<Document>>, SearchStop> {
        let mut set = JoinSet::new();
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                return Err(SearchStop::Superseded);
            }
            for (index, &id) in ids.iter().enumerate() {
                let service = Arc::clone(&self.service);
                let handle = set.spawn(async move { (index, fetch_document(service, id).await) });
                inner.fanout.push(handle);
            }
        }

        let mut documents: Vec<Option<Document>> = vec![None; ids.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, document)) => documents[index] = document,
                Err(e) if e.is_cancelled() => return Err(SearchStop::Superseded),
                Err(e) => tracing::warn!(error = %e, "document fetch task panicked"),
            }
        }

        Ok(documents)
    }

    // ============ Datasets ============

    /// Reload the dataset catalog. Failures are logged and leave the
    /// previous list in place. Returns whether the list was replaced.
    pub async fn refresh_datasets(&self) -> bool {
        self.lock().view.catalog.refresh = OpState::Pending;

        match self.service.list_datasets().await {
            Ok(datasets) => {
                let mut inner = self.lock();
                let count = datasets.len();
                if let Some(dropped) = inner.view.catalog.replace(datasets) {
                    tracing::info!(
                        dataset_id = dropped,
                        "selected dataset no longer listed, using default"
                    );
                }
                inner.view.catalog.refresh = OpState::Succeeded(count);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh dataset list");
                self.lock().view.catalog.refresh = OpState::Failed(e.to_string());
                false
            }
        }
    }

    /// Choose the dataset to search, or `None` for the default dataset.
    pub fn select_dataset(&self, id: Option<DatasetId>) -> Result<(), SelectError> {
        self.lock().view.catalog.select(id)
    }

    pub fn selected_dataset(&self) -> Option<DatasetId> {
        self.lock().view.catalog.selected
    }

    // ============ Upload ============

    pub fn toggle_upload_panel(&self) -> bool {
        let mut inner = self.lock();
        inner.view.upload.panel_open = !inner.view.upload.panel_open;
        inner.view.upload.panel_open
    }

    pub fn set_upload_panel(&self, open: bool) {
        self.lock().view.upload.panel_open = open;
    }

    pub fn set_dataset_name(&self, name: impl Into<String>) {
        self.lock().view.upload.form.dataset_name = name.into();
    }

    pub fn set_upload_mode(&self, mode: UploadMode) {
        self.lock().view.upload.form.set_mode(mode);
    }

    /// Choose the file to upload. Switches the form to file mode.
    pub fn select_file(&self, path: impl AsRef<Path>) {
        self.lock()
            .view
            .upload
            .form
            .select_file(FileSelection::new(path));
    }

    /// Set the text to upload. Switches the form to text mode.
    pub fn set_upload_text(&self, text: impl Into<String>) {
        self.lock().view.upload.form.set_text(text);
    }

    /// Clear every piece of upload state and close the panel.
    pub fn reset_upload(&self) {
        self.lock().view.upload.reset();
    }

    /// Validate and send the upload form.
    ///
    /// Returns `None` if an upload is already pending. On success the form is
    /// cleared and the dataset catalog is refreshed once; on failure the form
    /// is kept so the user can fix it and resubmit.
    pub async fn submit_upload(&self) -> Option<Result<UploadResult, UploadError>> {
        let valid = {
            let mut inner = self.lock();
            if inner.view.upload.state.is_pending() {
                return None;
            }
            match inner.view.upload.form.validate() {
                Ok(valid) => {
                    inner.view.upload.state = OpState::Pending;
                    valid
                }
                Err(e) => {
                    inner.view.upload.state = OpState::Failed(e.clone());
                    return Some(Err(e));
                }
            }
        };

        let mut guard = PendingUpload {
            client: self,
            armed: true,
        };

        let result = match valid.into_request().await {
            Ok(request) => self.service.upload(request).await,
            Err(e) => Err(e),
        };

        let settled = {
            let mut inner = self.lock();
            guard.armed = false;
            match result {
                Ok(result) => {
                    inner.view.upload.form.clear_fields();
                    inner.view.upload.state = OpState::Succeeded(result.clone());
                    Ok(result)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "upload failed");
                    let err = upload_failure(&e);
                    inner.view.upload.state = OpState::Failed(err.clone());
                    Err(err)
                }
            }
        };

        if settled.is_ok() {
            self.refresh_datasets().await;
        }
        Some(settled)
    }
}

async fn fetch_document(service: Arc<dyn SearchService>, id: DocumentId) -> Option<Document> {
    match service.get_document(id).await {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(document_id = id, error = %e, "document unavailable, skipping");
            None
        }
    }
}

/// The message shown for a failed upload request.
fn upload_failure(err: &ClientError) -> UploadError {
    let message = match err {
        ClientError::Status { body, .. } => serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message()),
        ClientError::Io { .. } => Some(err.to_string()),
        _ => None,
    };
    UploadError::Failed(message.unwrap_or_else(|| UploadError::GENERIC.to_string()))
}

/// Returns the search state to idle if the submitting future is dropped
/// before it settles.
struct PendingSearch<'a> {
    client: &'a SearchClient,
    generation: u64,
    armed: bool,
}

impl Drop for PendingSearch<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.client.lock();
        if inner.generation == self.generation && inner.view.search.is_pending() {
            inner.abort_fanout();
            inner.view.search = OpState::Idle;
        }
    }
}

/// Same as [`PendingSearch`] for the upload operation.
struct PendingUpload<'a> {
    client: &'a SearchClient,
    armed: bool,
}

impl Drop for PendingUpload<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.client.lock();
        if inner.view.upload.state.is_pending() {
            inner.view.upload.state = OpState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(body: &str) -> ClientError {
        ClientError::Status {
            url: "http://localhost:8000/upload".into(),
            status: 400,
            body: body.into(),
        }
    }

    #[test]
    fn test_upload_failure_uses_detail() {
        let err = upload_failure(&status_error(r#"{"detail": "Unsupported file type"}"#));
        assert_eq!(err, UploadError::Failed("Unsupported file type".into()));
    }

    #[test]
    fn test_upload_failure_falls_back_to_generic() {
        for body in ["", "<html>502</html>", r#"{"error": "x"}"#, r#"{"detail": ""}"#] {
            assert_eq!(
                upload_failure(&status_error(body)),
                UploadError::Failed("Upload failed".into()),
                "body: {body}"
            );
        }
    }

    #[test]
    fn test_upload_failure_reports_unreadable_file() {
        let err = ClientError::Io {
            path: "/missing.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        match upload_failure(&err) {
            UploadError::Failed(msg) => assert!(msg.contains("/missing.csv")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
