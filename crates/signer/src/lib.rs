pub mod digest;
pub mod error;
pub mod capability;
pub mod orchestrator;
pub mod session;
pub mod bridge;
pub mod config;

pub use digest::{Digest, DigestTicket, DigestTracker, display_digest};
pub use error::SignError;
pub use capability::{KEY_SLOT, SignRequest, SignResponse, SignResult, SigningCapability};
pub use orchestrator::SignOrchestrator;
pub use session::Session;
pub use bridge::BridgeClient;
