// --- File: crates/slotkeeper_common/src/lib.rs ---

pub mod clock; // Injectable time source
pub mod error; // Error handling
pub mod http; // Error responses, client construction and retrying transport
pub mod logging; // Logging utilities
pub mod memory; // In-process calendar and metadata store
pub mod models; // Shared domain types
pub mod services; // Collaborator traits

// Re-export error types and utilities for easier access
pub use error::{
    config_error, conflict, external_service_error, internal_error, not_found, validation_error,
    Context, GatewayError, HttpStatusCode, NotifyError, SlotkeeperError, StoreError,
    TransportError,
};

// Re-export HTTP utilities for easier access
pub use http::{
    client::{create_client, DEFAULT_TIMEOUT_SECS},
    retry::{log_target, HttpTransport, RetryPolicy, RetryTransport},
    IntoHttpResponse,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{init, init_with_level, log_error, log_result};
pub use services::{CalendarGateway, MetadataStore, NotificationSink};
