use std::sync::Arc;

use super::session::{FeedConnection, FeedConnector};
use crate::error::ChannelError;
use crate::feed::ChangeNotifier;
use crate::lifecycle::{LifecycleStore, Transmutation};

/// In-process connector: subscribes straight to the notifier and reads the
/// full list from the store.
#[derive(Clone)]
pub struct LocalFeed {
    notifier: Arc<ChangeNotifier>,
    store: Arc<LifecycleStore>,
}

impl LocalFeed {
    pub fn new(notifier: Arc<ChangeNotifier>, store: Arc<LifecycleStore>) -> Self {
        Self { notifier, store }
    }
}

impl FeedConnector for LocalFeed {
    async fn connect(&self) -> Result<FeedConnection, ChannelError> {
        Ok(self.notifier.subscribe().into())
    }

    async fn fetch_all(&self) -> Result<Vec<Transmutation>, ChannelError> {
        Ok(self.store.list())
    }
}
