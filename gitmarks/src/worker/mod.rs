//! Background work.
//!
//! The UI loop owns all state and never blocks. It queues [`Request`]s on
//! `AppState`; the main loop drains them into [`Workers`], and each worker
//! reports back through the event channel:
//!
//! - network calls run as tokio tasks, one abortable task per request slot
//! - syntax highlighting runs on a dedicated thread fed by crossbeam
//! - the draft store runs as one sequential tokio task so saves stay ordered

pub mod api;
pub mod drafts;
pub mod highlight;

use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;

pub use api::{ApiEvent, ApiRequest, ApiWorker};
pub use drafts::{DraftEvent, DraftRequest, DraftWorker};
pub use highlight::{HighlightRequest, HighlightResult};

/// Work the UI wants done off the event loop.
#[derive(Debug)]
pub enum Request {
    Api(ApiRequest),
    Highlight(HighlightRequest),
    Drafts(DraftRequest),
}

impl From<ApiRequest> for Request {
    fn from(r: ApiRequest) -> Self {
        Request::Api(r)
    }
}

impl From<DraftRequest> for Request {
    fn from(r: DraftRequest) -> Self {
        Request::Drafts(r)
    }
}

impl From<HighlightRequest> for Request {
    fn from(r: HighlightRequest) -> Self {
        Request::Highlight(r)
    }
}

/// Handles to every background worker.
pub struct Workers {
    api: ApiWorker,
    highlight: crossbeam_channel::Sender<HighlightRequest>,
    drafts: DraftWorker,
}

impl Workers {
    pub fn new(api: ApiWorker, drafts: DraftWorker, event_tx: UnboundedSender<AppEvent>) -> Self {
        Self {
            api,
            highlight: highlight::spawn(event_tx),
            drafts,
        }
    }

    pub fn dispatch(&mut self, request: Request) {
        match request {
            Request::Api(req) => self.api.dispatch(req),
            Request::Highlight(req) => {
                if self.highlight.send(req).is_err() {
                    tracing::error!("highlight thread is gone");
                }
            }
            Request::Drafts(req) => self.drafts.dispatch(req),
        }
    }
}
