use datasight_core::constants::messages;
use datasight_core::session::visualization::Dataset;
use datasight_core::session::{ChartKind, ChartSet, ChartSpec, Suggestion};
use datasight_core::{DisplayMessage, Role, SessionEvent};

/// Plain-text form of a session event, or `None` if it has nothing to show.
///
/// `echo_user` controls whether user messages are printed; the REPL leaves
/// them out since the terminal already shows what was typed.
pub fn render_event(event: &SessionEvent, echo_user: bool) -> Option<String> {
    match event {
        SessionEvent::Message(message) => render_message(message, echo_user),
        SessionEvent::Loading(true) => Some(messages::PROCESSING.to_string()),
        SessionEvent::Loading(false) => None,
        SessionEvent::Visualization(charts) => Some(render_charts(charts)),
        SessionEvent::VisualizationUnavailable => Some(messages::VISUALIZATION_UNAVAILABLE.to_string()),
        SessionEvent::Recommendations(text) => Some(format!("── Recommendations ──\n{}", text)),
        SessionEvent::Suggestions(suggestions) => Some(render_suggestions(suggestions)),
    }
}

fn render_message(message: &DisplayMessage, echo_user: bool) -> Option<String> {
    match message.role {
        Role::User if echo_user => Some(format!("you> {}", message.text)),
        Role::User | Role::System => None,
        Role::Assistant => Some(format!("datasight> {}", message.text)),
    }
}

pub fn render_suggestions(suggestions: &[Suggestion]) -> String {
    let mut out = String::from("── Suggested next steps ──");
    for (i, suggestion) in suggestions.iter().enumerate() {
        out.push_str(&format!(
            "\n  {}. [{}] {}: {}",
            i + 1,
            suggestion.icon.tag(),
            suggestion.title,
            suggestion.description
        ));
    }
    out
}

pub fn render_charts(charts: &ChartSet) -> String {
    ChartKind::all()
        .iter()
        .map(|kind| render_chart(*kind, charts.get(*kind)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_chart(kind: ChartKind, chart: &ChartSpec) -> String {
    let mut out = format!("── {} chart: {} ──", kind.name(), chart.title);
    if !chart.description.is_empty() {
        out.push_str(&format!("\n  {}", chart.description));
    }
    if !chart.labels.is_empty() {
        out.push_str(&format!("\n  labels: {}", chart.labels.join(", ")));
    }
    for dataset in &chart.datasets {
        out.push_str(&format!("\n  {}", render_dataset(dataset)));
    }
    if !chart.adaptive_commentary.is_empty() {
        out.push_str(&format!("\n  {}", chart.adaptive_commentary));
    }
    out
}

fn render_dataset(dataset: &Dataset) -> String {
    let values = dataset
        .data
        .iter()
        .map(|v| match v {
            Some(v) => format!("{}", v),
            None => "-".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let marker = if dataset.predicted_data { " (predicted)" } else { "" };
    format!("{}{}: [{}]", dataset.label, marker, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datasight_core::session::visualization::fallback_charts;
    use datasight_core::session::SuggestionIcon;

    #[test]
    fn test_user_messages_only_when_echoed() {
        let event = SessionEvent::Message(DisplayMessage::user("hi"));
        assert_eq!(render_event(&event, false), None);
        assert_eq!(render_event(&event, true).as_deref(), Some("you> hi"));
    }

    #[test]
    fn test_loading_done_renders_nothing() {
        assert!(render_event(&SessionEvent::Loading(false), false).is_none());
        assert_eq!(
            render_event(&SessionEvent::Loading(true), false).as_deref(),
            Some(messages::PROCESSING)
        );
    }

    #[test]
    fn test_prediction_gaps_render_as_dashes() {
        let charts = fallback_charts(&[]);
        let text = render_chart(ChartKind::Line, &charts.line_chart);
        assert!(text.contains("Predicted Data (predicted): [-, -, -, 32, 40, 45, 52]"));
        assert!(text.starts_with("── line chart: Trend Analysis ──"));
    }

    #[test]
    fn test_suggestions_are_numbered_with_tags() {
        let suggestions = vec![Suggestion {
            title: "Compare".into(),
            description: "Side by side".into(),
            icon: SuggestionIcon::Compare,
        }];
        assert_eq!(
            render_suggestions(&suggestions),
            "── Suggested next steps ──\n  1. [compare] Compare: Side by side"
        );
    }
}
