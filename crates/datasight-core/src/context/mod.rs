mod history;
pub mod memory;
pub mod system_prompt;
pub mod persistence;

pub use history::ConversationState;
pub use memory::{DatasetFingerprint, DatasetMemory};
pub use system_prompt::{analysis_request, build_system_prompt, SystemPromptBuilder};
pub use persistence::{FileStore, InMemoryStore, KeyValueStore};
