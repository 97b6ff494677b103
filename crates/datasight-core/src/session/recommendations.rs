use crate::error::DataSightError;
use crate::llm::{ChatOptions, LlmClient, Message};

fn recommendations_prompt(previous_datasets: usize) -> String {
    format!(
        "Based on the data analysis and drawing from patterns observed in {} previous datasets, \
provide future predictions and 3-5 actionable recommendations with detailed commentary. \
Your analysis should adapt to previously seen patterns and highlight both similarities and unique aspects. \
Format your response with clear sections for 'Adaptive Commentary', 'Future Predictions' and 'Recommendations'.",
        previous_datasets
    )
}

/// Predictions and recommendations for the current analysis, using every
/// non-system message as context.
pub async fn generate_recommendations(
    llm: &dyn LlmClient,
    conversation: &[Message],
    previous_datasets: usize,
) -> Result<String, DataSightError> {
    let mut request = vec![Message::system(recommendations_prompt(previous_datasets))];
    request.extend(conversation.iter().filter(|m| !m.is_system()).cloned());

    let response = llm.chat(&request, ChatOptions::default()).await?;
    Ok(response.message.text().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_dataset_count_and_sections() {
        let prompt = recommendations_prompt(4);
        assert!(prompt.contains("observed in 4 previous datasets"));
        assert!(prompt.contains("'Future Predictions'"));
    }
}
