//! Client side of the change feed: a local view kept in sync by a
//! reconnecting session.

mod local;
mod session;
mod view;

pub use local::LocalFeed;
pub use session::{
    DEFAULT_RECONNECT_DELAY, FeedConnection, FeedConnector, ObserverHandle, ObserverSession,
    SessionConfig, SessionState,
};
pub use view::{LocalView, MergeOutcome};
