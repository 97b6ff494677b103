/// DataSight - centralized constants.
/// All magic numbers, strings, and limits live here.
/// Never hardcode these values elsewhere.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
    pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o";
    pub const DEFAULT_OLLAMA_MODEL: &str = "llava";
    pub const DEFAULT_LMSTUDIO_MODEL: &str = "local-model";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
    pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
    pub const LMSTUDIO_BASE_URL: &str = "http://localhost:1234";
    pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
}

// ─── Default Settings ─────────────────────────────────────────────────────────

pub mod defaults {
    pub const MAX_TOKENS: u32 = 4096;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const MAX_RETRIES: u32 = 0;
    pub const RETRY_BACKOFF_MS: u64 = 500;
    pub const PREDICTION_HORIZON: u32 = 3;
    pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

    pub const CHART_PALETTE: &[&str] = &[
        "#4285F4", "#34A853", "#FBBC05", "#EA4335", "#8AB4F8", "#81C995", "#FDE293", "#F28B82",
    ];

    pub const FILLER_WORDS: &[&str] = &["um", "uh", "like", "so", "you know", "actually"];
}

// ─── Resource Limits ──────────────────────────────────────────────────────────

pub mod limits {
    /// Conversation length that triggers truncation.
    pub const MAX_CONVERSATION_MESSAGES: usize = 12;
    /// Non-system messages kept after truncation.
    pub const KEEP_RECENT_MESSAGES: usize = 10;
    /// Dataset fingerprints retained in the memory store.
    pub const DATASET_MEMORY_CAPACITY: usize = 10;
    /// Non-system messages handed to the visualization request.
    pub const VISUALIZATION_CONTEXT_MESSAGES: usize = 5;
    pub const MAX_SUGGESTIONS: usize = 3;
    pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    pub const ALLOWED_FILE_TYPES: &[&str] = &[
        "image/png",
        "image/jpeg",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "text/csv",
        "application/pdf",
    ];
}

// ─── Storage ──────────────────────────────────────────────────────────────────

pub mod storage {
    pub const CONVERSATION_KEY: &str = "conversationHistory";
    pub const CURRENT_DATA_KEY: &str = "currentData";
    pub const DATASET_MEMORY_KEY: &str = "datasetMemory";
}

// ─── Config Paths ─────────────────────────────────────────────────────────────

pub mod paths {
    pub const CONFIG_DIR: &str = "datasight";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const DATA_DIR: &str = "datasight";
}

// ─── User-visible messages ────────────────────────────────────────────────────

pub mod messages {
    pub const ANALYSIS_ERROR: &str =
        "I'm sorry, I encountered an error analyzing your data. Please try again.";
    pub const CHAT_ERROR: &str = "I'm sorry, I encountered an error. Please try again.";
    pub const BUSY: &str = "Please wait for the current response to finish.";
    pub const RESTARTED: &str = "Chat restarted. Upload new data to begin analysis with adaptive AI commentary based on previously analyzed datasets.";
    pub const RECOMMENDATIONS_UNAVAILABLE: &str =
        "Unable to generate recommendations. Please try again.";
    pub const VISUALIZATION_UNAVAILABLE: &str = "Unable to generate visualization for this data";
    pub const COMMENTARY_UNAVAILABLE: &str =
        "Unable to generate commentary at this time. Please try again.";
    pub const WELCOME: &str = "Welcome! Upload your data files to begin analysis.";
    pub const PROCESSING: &str = "Processing your data. This may take a moment...";
}
