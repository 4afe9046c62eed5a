mod actor;
mod locks;
mod status;
mod store;
mod transmutation;

pub use actor::{Actor, ActorRole};
pub use status::{StateMachine, Transition, TransmutationStatus};
pub use store::LifecycleStore;
pub use transmutation::Transmutation;
