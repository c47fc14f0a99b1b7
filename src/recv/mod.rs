//! The receive-frame distribution engine: heard-station metadata, the
//! trust policy gate, and the fixed-order fan-out dispatcher.

mod dispatch;
mod metadata;
mod trust;

pub use dispatch::{Dispatcher, SinkRegistry};
pub use metadata::{resolve_heard, retry_display, Heard};
pub use trust::TrustDecision;
