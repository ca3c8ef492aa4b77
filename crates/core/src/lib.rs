pub mod auth;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod preview;
pub mod progress;
pub mod queue;
pub mod scheduler;
pub mod testing;
pub mod transport;
pub mod validator;

pub use auth::{
    create_credential_provider, AuthError, Credential, CredentialProvider, NoCredential,
    StaticBearer,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use orchestrator::{BatchConfig, EnqueueOutcome, OrchestratorError, UploadOrchestrator};
pub use preview::{
    LocalPreviewGenerator, PreviewError, PreviewGenerator, PreviewHandle, PreviewRegistry,
    PreviewStats,
};
pub use progress::{ProgressSnapshot, UploadEvent, UploadEventCallback};
pub use queue::{ItemSnapshot, ItemStatus};
pub use scheduler::{SessionSummary, UploadSession};
pub use transport::{HttpUploadTransport, TransportError, UploadTransport};
pub use validator::{FileDescriptor, MediaSource, RejectReason};
