pub mod error;
pub mod constants;
pub mod config;
pub mod llm;
pub mod context;
pub mod decode;
pub mod ingest;
pub mod voice;
pub mod session;

// Re-export key types
pub use error::DataSightError;
pub use config::Settings;
pub use llm::{ChatOptions, ContentPart, LlmClient, LlmResponse, Message, Role};
pub use context::{ConversationState, DatasetFingerprint, DatasetMemory, FileStore, InMemoryStore, KeyValueStore};
pub use ingest::FileRecord;
pub use session::{DisplayMessage, Session, SessionConfig, SessionEvent, TurnOutcome};
