use crate::context::memory::DatasetMemory;
use crate::ingest::FileRecord;

const CORE_IDENTITY: &str =
    "You are an expert data analyst AI assistant with continuous learning capabilities. ";

const FRESH_INSTRUCTIONS: &str = "Analyze the provided data and explain insights clearly and professionally. \
Your commentary should be thorough and highlight the most important patterns and anomalies in the data.";

const ADAPTIVE_INSTRUCTIONS: &str = ". Provide comprehensive, adaptive analysis that builds upon previous insights if patterns are similar. \
Compare new data to previously seen patterns when relevant. \
Your commentary should be insightful, focusing on unique aspects of this dataset while referencing broader trends \
you've observed across multiple datasets when applicable.";

/// Builds the system message that seeds a new conversation.
///
/// With no dataset history this is a generic analyst persona. Once the
/// memory holds fingerprints, the prompt lists how many files of each type
/// were analyzed before (in first-seen order) and asks the model to build
/// on that history.
#[derive(Debug, Clone, Default)]
pub struct SystemPromptBuilder {
    type_counts: Vec<(String, usize)>,
}

impl SystemPromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, memory: &DatasetMemory) -> Self {
        self.type_counts = memory.type_counts();
        self
    }

    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(512);
        prompt.push_str(CORE_IDENTITY);

        if self.type_counts.is_empty() {
            prompt.push_str(FRESH_INSTRUCTIONS);
            return prompt;
        }

        prompt.push_str("Based on my analysis history, I've previously analyzed: ");
        let history = self
            .type_counts
            .iter()
            .map(|(file_type, count)| format!("{} {} files", count, file_type))
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&history);
        prompt.push_str(ADAPTIVE_INSTRUCTIONS);
        prompt
    }
}

/// System message for a conversation, derived only from the dataset memory.
pub fn build_system_prompt(memory: &DatasetMemory) -> String {
    SystemPromptBuilder::new().with_memory(memory).build()
}

/// The text part of the user message that opens an analysis.
pub fn analysis_request(files: &[FileRecord]) -> String {
    let names = files
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "I've uploaded {} file(s) for analysis: {}. \
Please provide a comprehensive analysis of the data, key trends, and important insights.",
        files.len(),
        names
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::memory::DatasetFingerprint;

    fn record(memory: &mut DatasetMemory, ts: &str, types: &[&str]) {
        memory.record(DatasetFingerprint {
            timestamp: ts.to_string(),
            file_count: types.len(),
            file_names: types.iter().map(|_| "f".to_string()).collect(),
            file_types: types.iter().map(|t| t.to_string()).collect(),
        });
    }

    #[test]
    fn test_empty_memory_gives_generic_persona() {
        let prompt = build_system_prompt(&DatasetMemory::new());
        assert!(prompt.starts_with("You are an expert data analyst"));
        assert!(prompt.contains("patterns and anomalies"));
        assert!(!prompt.contains("previously analyzed"));
    }

    #[test]
    fn test_history_lists_counts_in_first_seen_order() {
        let mut memory = DatasetMemory::new();
        record(&mut memory, "t1", &["text/csv", "image/png"]);
        record(&mut memory, "t2", &["image/png", "text/csv", "text/csv"]);

        let prompt = build_system_prompt(&memory);
        assert!(prompt.contains(
            "I've previously analyzed: 3 text/csv files, 2 image/png files. Provide comprehensive, adaptive analysis"
        ));
        assert!(prompt.contains("builds upon previous insights"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let mut a = DatasetMemory::new();
        let mut b = DatasetMemory::with_capacity(10);
        for memory in [&mut a, &mut b] {
            record(memory, "t1", &["application/pdf"]);
            record(memory, "t2", &["text/csv"]);
        }
        assert_eq!(build_system_prompt(&a), build_system_prompt(&a));
        assert_eq!(build_system_prompt(&a), build_system_prompt(&b));
    }

    #[test]
    fn test_analysis_request_names_files() {
        let files = vec![
            FileRecord::new("sales.csv", "text/csv", 1000, "data:text/csv;base64,"),
            FileRecord::new("chart.png", "image/png", 10, "data:image/png;base64,"),
        ];
        let text = analysis_request(&files);
        assert!(text.starts_with("I've uploaded 2 file(s) for analysis: sales.csv, chart.png."));
    }
}
