//! Draft persistence task.
//!
//! Requests are handled one at a time in arrival order so a later save can
//! never be overtaken by an earlier one. Without a database (it failed to
//! open) loads answer with an empty map, writes are dropped, and drafts live
//! only in memory.

use gitmarks_core::db;
use gitmarks_core::error::DraftError;
use gitmarks_core::types::FeedbackMap;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_rusqlite::Connection;

use crate::event::AppEvent;

#[derive(Debug)]
pub enum DraftRequest {
    Load { key: String },
    Save { key: String, staged: FeedbackMap },
    /// Removes submitted entries from a draft that is no longer on screen.
    Forget { key: String, ids: Vec<u64> },
    SetPreference { key: &'static str, value: String },
}

#[derive(Debug)]
pub enum DraftEvent {
    Loaded { key: String, result: Result<FeedbackMap, DraftError> },
    Failed(DraftError),
}

pub struct DraftWorker {
    tx: Option<mpsc::UnboundedSender<DraftRequest>>,
    events: UnboundedSender<AppEvent>,
}

impl DraftWorker {
    /// Starts the task over `conn`. `None` yields an in-memory-only worker.
    pub fn spawn(conn: Option<Connection>, events: UnboundedSender<AppEvent>) -> Self {
        let Some(conn) = conn else {
            return Self { tx: None, events };
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task_events = events.clone();
        tokio::spawn(async move {
            let events = task_events;
            while let Some(request) = rx.recv().await {
                if let Some(event) = handle(&conn, request).await {
                    if events.send(AppEvent::Drafts(Box::new(event))).is_err() {
                        break;
                    }
                }
            }
        });
        Self { tx: Some(tx), events }
    }

    pub fn dispatch(&self, request: DraftRequest) {
        match (&self.tx, request) {
            (Some(tx), request) => {
                let _ = tx.send(request);
            }
            (None, DraftRequest::Load { key }) => {
                let event = DraftEvent::Loaded { key, result: Ok(FeedbackMap::new()) };
                let _ = self.events.send(AppEvent::Drafts(Box::new(event)));
            }
            (None, request) => tracing::trace!(?request, "no draft store; request dropped"),
        }
    }
}

async fn handle(conn: &Connection, request: DraftRequest) -> Option<DraftEvent> {
    match request {
        DraftRequest::Load { key } => {
            let result = db::load_staged_feedback(conn, &key).await;
            Some(DraftEvent::Loaded { key, result })
        }
        DraftRequest::Save { key, staged } => {
            tracing::debug!(%key, entries = staged.len(), "saving drafts");
            db::save_staged_feedback(conn, &key, &staged).await.err().map(DraftEvent::Failed)
        }
        DraftRequest::Forget { key, ids } => {
            let result = async {
                let mut staged = db::load_staged_feedback(conn, &key).await?;
                for id in &ids {
                    staged.remove(id);
                }
                db::save_staged_feedback(conn, &key, &staged).await
            }
            .await;
            result.err().map(DraftEvent::Failed)
        }
        DraftRequest::SetPreference { key, value } => {
            db::set_preference(conn, key, &value).await.err().map(DraftEvent::Failed)
        }
    }
}
