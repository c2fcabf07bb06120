pub mod api;
pub mod autosave;
pub mod cache;
pub mod cancellation;
pub mod clock;
pub mod draft_store;
pub mod error;
pub mod generation;
pub mod notifier;
pub mod review;
pub mod session;

pub use api::{AuthoringApi, HttpApiOptions, HttpAuthoringApi};
pub use autosave::{DraftAutosaver, DEFAULT_AUTOSAVE_INTERVAL};
pub use cache::{CacheInvalidator, CacheKey, NoopInvalidator, ViewCache};
pub use cancellation::{CancellationCoordinator, Channel, OperationToken};
pub use clock::{Clock, SystemClock};
pub use draft_store::{DraftStore, DEFAULT_DRAFT_TTL_DAYS, DRAFT_STORAGE_KEY};
pub use error::{ClientError, RemoteError};
pub use generation::{GenerationController, GenerationSnapshot};
pub use notifier::{BroadcastNotifier, Notification, Notifier, Severity, TracingNotifier};
pub use review::{OperationStatus, ReviewController};
pub use session::AuthoringSession;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
