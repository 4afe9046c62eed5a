mod event;
mod notifier;

pub use event::{ChangeEvent, EventKind, FeedMessage};
pub use notifier::{ChangeNotifier, Frame, Subscription};
