pub mod error;
pub mod events;
pub mod store;
pub mod reconciler;
pub mod coordinator;
mod shared;

pub use error::{Result, SessionError, SessionInitError, StreamError};
pub use events::{SessionEvent, SessionState};
pub use store::{MessageStore, Upserted};
pub use reconciler::{Applied, StreamHandle, StreamReconciler};
pub use coordinator::SessionCoordinator;
