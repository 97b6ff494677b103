//! Normalization of speech-recognition output before it enters the chat.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One recognition hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptAlternative {
    pub transcript: String,
    pub confidence: f32,
}

/// Pick the most confident alternative strictly above `threshold`.
/// If none qualifies, join every transcript with spaces.
pub fn select_transcript(alternatives: &[TranscriptAlternative], threshold: f32) -> String {
    let best = alternatives
        .iter()
        .filter(|a| a.confidence > threshold)
        .fold(None::<&TranscriptAlternative>, |best, a| match best {
            Some(b) if b.confidence >= a.confidence => Some(b),
            _ => Some(a),
        });

    match best {
        Some(alt) if !alt.transcript.is_empty() => alt.transcript.clone(),
        _ => alternatives
            .iter()
            .map(|a| a.transcript.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Strips filler words and collapses whitespace.
pub struct TranscriptCleaner {
    fillers: Option<Regex>,
    whitespace: Regex,
}

impl TranscriptCleaner {
    pub fn new<S: AsRef<str>>(filler_words: &[S]) -> Result<Self, regex::Error> {
        let alternation = filler_words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");

        let fillers = if alternation.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(Self {
            fillers,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn clean(&self, transcript: &str) -> String {
        let without_fillers = match self.fillers {
            Some(ref re) => re.replace_all(transcript, ""),
            None => transcript.into(),
        };
        self.whitespace
            .replace_all(&without_fillers, " ")
            .trim()
            .to_string()
    }
}

/// Convenience wrapper building a cleaner for one call.
pub fn clean_transcript<S: AsRef<str>>(transcript: &str, filler_words: &[S]) -> String {
    match TranscriptCleaner::new(filler_words) {
        Ok(cleaner) => cleaner.clean(transcript),
        Err(e) => {
            tracing::warn!("invalid filler word list, skipping cleanup: {}", e);
            transcript.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}
