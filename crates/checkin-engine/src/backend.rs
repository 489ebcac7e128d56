use async_trait::async_trait;
pub use checkin_common::error::backend_error::BackendError;
use checkin_common::protocol::ResponseSnapshot;
use checkin_common::session::SessionState;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// URL after any redirects.
    pub url: String,
    pub title: String,
}

/// A located element, valid for the page it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
}

/// The browser capability the sign-in core drives.
///
/// Implementations report an unusable automation runtime as
/// [`BackendError::Unavailable`] from [`Backend::launch`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the browser (loading the stored session when configured to).
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Release every browser resource. Safe to call when not launched.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Whether the stored session artifact exists.
    fn session_artifact_exists(&self) -> bool;

    /// Start collecting responses whose URL contains `url_contains`.
    /// Must be called before the navigation that triggers them.
    async fn watch_responses(&mut self, url_contains: &str) -> Result<ResponseWatch, BackendError>;

    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Number of elements currently matching `selector`.
    async fn count(&mut self, selector: &str) -> Result<usize, BackendError>;

    /// Wait until `selector` matches a visible element.
    async fn wait_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BackendError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError>;

    /// Rendered text content of the current page.
    async fn page_text(&mut self) -> Result<String, BackendError>;

    /// Export cookies and storage of the live browser session.
    async fn export_session(&mut self) -> Result<SessionState, BackendError> {
        Err(BackendError::NotSupported("export_session".into()))
    }
}

/// Attempt-side end of a response watch.
///
/// The watcher keeps the latest matching response privately and hands it
/// over exactly once, when [`ResponseWatch::finish`] signals the end of the
/// waiting phase.
#[derive(Debug)]
pub struct ResponseWatch {
    stop: Option<oneshot::Sender<()>>,
    delivered: oneshot::Receiver<Option<ResponseSnapshot>>,
}

/// Watcher-side end of a response watch.
#[derive(Debug)]
pub struct ResponseSlot {
    stop: oneshot::Receiver<()>,
    deliver: oneshot::Sender<Option<ResponseSnapshot>>,
}

impl ResponseWatch {
    pub fn pair() -> (ResponseSlot, ResponseWatch) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (deliver_tx, deliver_rx) = oneshot::channel();
        (
            ResponseSlot {
                stop: stop_rx,
                deliver: deliver_tx,
            },
            ResponseWatch {
                stop: Some(stop_tx),
                delivered: deliver_rx,
            },
        )
    }

    /// A watch whose result is already known.
    pub fn resolved(snapshot: Option<ResponseSnapshot>) -> Self {
        let (slot, watch) = Self::pair();
        slot.fill(snapshot);
        watch
    }

    /// Stop watching and take the captured response, if any.
    pub async fn finish(mut self) -> Option<ResponseSnapshot> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.delivered.await.ok().flatten()
    }
}

impl ResponseSlot {
    /// Resolves once the attempt stops watching (or drops the watch).
    pub async fn stopped(&mut self) {
        let _ = (&mut self.stop).await;
    }

    pub fn fill(self, snapshot: Option<ResponseSnapshot>) {
        let _ = self.deliver.send(snapshot);
    }
}
