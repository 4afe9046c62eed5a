//! Observer session: keeps a local view consistent with the change feed.
//!
//! The session runs as a small state machine:
//!
//! ```text
//! Connecting ──ok──▶ Connected ──feed lost──▶ Backoff ──delay──▶ Connecting
//!     │                                          ▲
//!     └──────────────connect/resync failed───────┘
//! ```
//!
//! Every (re)connection subscribes first and then fetches the full list, so
//! no event committed in between is lost. Shutdown is signalled through a
//! watch channel and is honoured in every state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::view::{LocalView, MergeOutcome};
use crate::error::ChannelError;
use crate::feed::{FeedMessage, Frame, Subscription};
use crate::lifecycle::Transmutation;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Backoff,
    Stopped,
}

/// An open change-feed connection. `next_frame` yields `None` once it is lost.
#[derive(Debug)]
pub struct FeedConnection {
    frames: mpsc::Receiver<Frame>,
}

impl FeedConnection {
    pub fn new(frames: mpsc::Receiver<Frame>) -> Self {
        Self { frames }
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }
}

impl From<Subscription> for FeedConnection {
    fn from(sub: Subscription) -> Self {
        Self::new(sub.into_receiver())
    }
}

/// Where a session gets its live feed and its full-list snapshots from.
pub trait FeedConnector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<FeedConnection, ChannelError>> + Send;

    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Transmutation>, ChannelError>> + Send;
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

#[derive(Debug, Default)]
struct SessionStats {
    resyncs: AtomicU64,
    discarded_frames: AtomicU64,
}

/// State shared between the session task and its handle.
struct Shared {
    view: RwLock<LocalView>,
    state: watch::Sender<SessionState>,
    version: watch::Sender<u64>,
    stats: SessionStats,
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    fn write_view(&self, update: impl FnOnce(&mut LocalView)) {
        update(&mut self.view.write().unwrap_or_else(PoisonError::into_inner));
        self.version.send_modify(|v| *v += 1);
    }

    fn apply_frame(&self, frame: &str) {
        match FeedMessage::decode(frame) {
            Ok(FeedMessage::Change(event)) => {
                let id = event.data().id;
                let kind = event.kind();
                let mut outcome = MergeOutcome::Stale;
                self.write_view(|view| outcome = view.merge(event.into_data()));
                tracing::trace!(id = id.0, %kind, ?outcome, "change merged");
            }
            Ok(FeedMessage::Unknown { kind }) => {
                tracing::debug!(?kind, "ignoring unrecognised feed message");
            }
            Err(err) => {
                self.stats.discarded_frames.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %err, "discarding malformed feed frame");
            }
        }
    }
}

/// Owner's handle on a running session. Dropping it without calling
/// [`shutdown`](Self::shutdown) also stops the session.
pub struct ObserverHandle {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct ObserverSession;

impl ObserverSession {
    /// Spawns a session that keeps reconnecting until shut down.
    pub fn spawn<C: FeedConnector>(connector: Arc<C>, config: SessionConfig) -> ObserverHandle {
        let (state, _) = watch::channel(SessionState::Connecting);
        let (version, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            view: RwLock::new(LocalView::new()),
            state,
            version,
            stats: SessionStats::default(),
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(connector, config, Arc::clone(&shared), shutdown_rx));
        ObserverHandle {
            shared,
            shutdown,
            task,
        }
    }
}

async fn run<C: FeedConnector>(
    connector: Arc<C>,
    config: SessionConfig,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    'session: loop {
        shared.set_state(SessionState::Connecting);
        let attempt = tokio::select! {
            _ = stopped(&mut shutdown) => break 'session,
            res = connect_and_resync(connector.as_ref(), &shared) => res,
        };

        match attempt {
            Ok(mut conn) => {
                shared.set_state(SessionState::Connected);
                loop {
                    tokio::select! {
                        _ = stopped(&mut shutdown) => break 'session,
                        frame = conn.next_frame() => match frame {
                            Some(frame) => shared.apply_frame(&frame),
                            None => {
                                tracing::warn!(error = %ChannelError::Disconnected, "observer lost change feed");
                                break;
                            }
                        },
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "observer could not connect"),
        }

        shared.set_state(SessionState::Backoff);
        tokio::select! {
            _ = stopped(&mut shutdown) => break 'session,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    shared.set_state(SessionState::Stopped);
    tracing::debug!("observer session stopped");
}

async fn connect_and_resync<C: FeedConnector>(
    connector: &C,
    shared: &Shared,
) -> Result<FeedConnection, ChannelError> {
    let conn = connector.connect().await?;
    let list = connector.fetch_all().await?;
    let count = list.len();
    let resyncs = shared.stats.resyncs.fetch_add(1, Ordering::Relaxed) + 1;
    shared.write_view(|view| view.reset(list));
    tracing::info!(count, resyncs, "observer resynced");
    Ok(conn)
}

/// Resolves once shutdown is requested or the handle is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

impl ObserverHandle {
    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    pub fn view(&self) -> RwLockReadGuard<'_, LocalView> {
        self.shared.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<Transmutation> {
        self.view().entries().to_vec()
    }

    /// Completed full-list resyncs, including the first one.
    pub fn resync_count(&self) -> u64 {
        self.shared.stats.resyncs.load(Ordering::Relaxed)
    }

    pub fn discarded_frames(&self) -> u64 {
        self.shared.stats.discarded_frames.load(Ordering::Relaxed)
    }

    /// Waits until `predicate` holds for the view, or `timeout` passes.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(&LocalView) -> bool,
    ) -> bool {
        let mut version = self.shared.version.subscribe();
        let wait = async {
            loop {
                version.borrow_and_update();
                if predicate(&self.view()) {
                    return true;
                }
                if version.changed().await.is_err() {
                    return false;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }

    /// Waits until the session reaches `state`, or `timeout` passes.
    pub async fn wait_for_state(&self, state: SessionState, timeout: Duration) -> bool {
        let mut rx = self.shared.state.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|s| *s == state))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    /// Stops the session and waits for its task to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "observer session task failed");
        }
    }
}
