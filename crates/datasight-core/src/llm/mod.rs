mod traits;
mod openai;
mod guarded;
pub mod provider;

pub use traits::*;
pub use openai::OpenAIClient;
pub use guarded::GuardedClient;
pub use provider::{ProviderConfig, ProviderId, UsageTracker};
