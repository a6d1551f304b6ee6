//! Event bus.
//!
//! Terminal input, timer ticks and background results all arrive as
//! [`AppEvent`]s on one tokio unbounded channel. The main loop owns the
//! receiver and is the only place application state is mutated; workers
//! never touch [`AppState`](crate::app::AppState) directly, they send a
//! result event and the loop folds it in.
//!
//! Two independent intervals drive the loop:
//! - **Render** every 33 ms (about 30 FPS) asks for a `terminal.draw()`.
//! - **Tick** every 250 ms (4 Hz) expires toasts and other timed state.
//!
//! Render frequency can change without touching tick-driven behaviour.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::worker::{ApiEvent, DraftEvent, HighlightResult};

/// Everything the main loop can receive.
///
/// Worker payloads are boxed so the enum stays a few words wide; a highlight
/// result carries a whole file of styled lines.
#[derive(Debug)]
#[non_exhaustive]
pub enum AppEvent {
    /// A key press (`KeyEventKind::Press` only).
    ///
    /// Release and repeat events are dropped in [`spawn_event_task`]; some
    /// platforms report both a press and a release for every keystroke.
    Key(KeyEvent),
    /// Click, wheel or drag inside the terminal.
    Mouse(MouseEvent),
    /// The terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// The terminal window regained focus; stale-sensitive data is revalidated.
    FocusGained,
    /// Logic tick, 250 ms.
    Tick,
    /// Draw request, 33 ms.
    Render,
    /// A network request finished.
    Api(Box<ApiEvent>),
    /// The highlight thread finished a file.
    Highlighted(Box<HighlightResult>),
    /// The draft store finished a load or save.
    Drafts(Box<DraftEvent>),
}

/// Both ends of the event channel.
///
/// `tx` is cloned into the input task and every worker; `rx` is moved into
/// the main loop.
pub struct EventHandler {
    /// Send half, one clone per producer.
    pub tx: mpsc::UnboundedSender<AppEvent>,
    /// Receive half, drained by the main loop.
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    /// Creates a fresh unbounded channel.
    ///
    /// Terminal input and timers produce at a bounded rate and worker results
    /// are one per request, so the queue stays short while the loop keeps up.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task feeding terminal input and both timers into `tx`.
///
/// The task runs until the runtime shuts down. `reader.next().fuse()` keeps
/// `select!` from polling a finished stream, and a failed send only means the
/// main loop has already exited, so send errors are ignored. Input errors are
/// logged and the task keeps reading.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            tokio::select! {
                _ = tick_tick => {
                    let _ = tx.send(AppEvent::Tick);
                }
                _ = render_tick => {
                    let _ = tx.send(AppEvent::Render);
                }
                maybe_event = crossterm_event => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            let _ = tx.send(AppEvent::Key(key));
                        }
                        Some(Ok(Event::Resize(w, h))) => {
                            let _ = tx.send(AppEvent::Resize(w, h));
                        }
                        Some(Ok(Event::Mouse(mouse))) => {
                            let _ = tx.send(AppEvent::Mouse(mouse));
                        }
                        Some(Ok(Event::FocusGained)) => {
                            let _ = tx.send(AppEvent::FocusGained);
                        }
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "terminal input error");
                        }
                        _ => {}
                    }
                }
            }
        }
    });
}
