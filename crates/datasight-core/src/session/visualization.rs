use crate::constants::{defaults, limits, messages};
use crate::decode;
use crate::error::DataSightError;
use crate::llm::{ChatOptions, LlmClient, Message};
use serde::{Deserialize, Serialize};

fn visualization_prompt(prediction_horizon: u32) -> String {
    format!(
        r#"Based on the analyzed data and drawing from patterns in previously analyzed datasets,
predict future trends and generate visualization data with adaptive commentary.
Create three different chart visualizations: a pie chart, a line chart, and a bar chart.
Include both current data and future projections ({horizon} future time periods) in your response.
For each chart, provide adaptive commentary that highlights unique aspects and compares to past patterns when relevant.
Respond directly with JSON, following this schema:
{{
  "pieChart": {{
    "title": string, "description": string, "adaptiveCommentary": string,
    "labels": array of strings,
    "datasets": [{{ "label": string, "data": array of numbers, "backgroundColor": array of colors (optional) }}]
  }},
  "lineChart": {{
    "title": string, "description": string, "adaptiveCommentary": string,
    "labels": array of strings (include future time periods),
    "datasets": [{{ "label": string, "data": array of numbers, "borderColor": string (optional),
      "backgroundColor": string (optional), "borderDash": array (optional, for prediction lines),
      "predictedData": boolean (indicates if this dataset represents predictions) }}]
  }},
  "barChart": {{
    "title": string, "description": string, "adaptiveCommentary": string,
    "labels": array of strings,
    "datasets": [{{ "label": string, "data": array of numbers, "backgroundColor": array of colors or single color (optional) }}]
  }}
}}"#,
        horizon = prediction_horizon
    )
}

const COMMENTARY_PROMPT: &str = "Provide a comprehensive and insightful AI commentary for the {kind} chart. \
Explain the significance of the data, key trends, and unique observations. \
Be detailed but concise, focusing on the most important insights.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Line,
    Bar,
}

impl ChartKind {
    pub fn all() -> [ChartKind; 3] {
        [ChartKind::Pie, ChartKind::Line, ChartKind::Bar]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pie" => Some(ChartKind::Pie),
            "line" => Some(ChartKind::Line),
            "bar" => Some(ChartKind::Bar),
            _ => None,
        }
    }
}

/// A single colour or one colour per data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Single(String),
    PerPoint(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    /// `None` marks a gap, e.g. history slots in a prediction series.
    pub data: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<ColorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_dash: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(default)]
    pub predicted_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub adaptive_commentary: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSet {
    pub pie_chart: ChartSpec,
    pub line_chart: ChartSpec,
    pub bar_chart: ChartSpec,
    /// Milliseconds since the epoch at generation time.
    #[serde(default)]
    pub generated_at: i64,
}

impl ChartSet {
    pub fn get(&self, kind: ChartKind) -> &ChartSpec {
        match kind {
            ChartKind::Pie => &self.pie_chart,
            ChartKind::Line => &self.line_chart,
            ChartKind::Bar => &self.bar_chart,
        }
    }

    /// Fill in palette colours and prediction styling on every chart.
    pub fn apply_styles(&mut self, palette: &[String]) {
        self.pie_chart.apply_styles(ChartKind::Pie, palette);
        self.line_chart.apply_styles(ChartKind::Line, palette);
        self.bar_chart.apply_styles(ChartKind::Bar, palette);
    }
}

impl ChartSpec {
    /// Datasets without colours get palette colours by index (translucent
    /// fill for line charts); predicted series get a dashed border.
    pub fn apply_styles(&mut self, kind: ChartKind, palette: &[String]) {
        for (index, dataset) in self.datasets.iter_mut().enumerate() {
            let base = palette_color(palette, index);

            if dataset.background_color.is_none() {
                let color = if kind == ChartKind::Line {
                    add_transparency(&base, 0.2)
                } else {
                    base.clone()
                };
                dataset.background_color = Some(ColorSpec::Single(color));
            }

            if dataset.border_color.is_none() && kind == ChartKind::Line {
                dataset.border_color = Some(base);
            }

            if dataset.predicted_data && dataset.border_dash.is_none() {
                dataset.border_dash = Some(vec![5, 5]);
            }
        }
    }
}

fn palette_color(palette: &[String], index: usize) -> String {
    if palette.is_empty() {
        let fallback = defaults::CHART_PALETTE;
        return fallback[index % fallback.len()].to_string();
    }
    palette[index % palette.len()].clone()
}

/// Turn `#rrggbb` or `rgb(r, g, b)` into an `rgba(...)` colour. Anything
/// else is returned unchanged.
pub fn add_transparency(color: &str, alpha: f32) -> String {
    if let Some(inner) = color
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return format!("rgba({}, {})", inner, alpha);
    }

    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() >= 6 && hex.is_ascii() {
            let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
            if let (Ok(r), Ok(g), Ok(b)) = (channel(0..2), channel(2..4), channel(4..6)) {
                return format!("rgba({}, {}, {}, {})", r, g, b, alpha);
            }
        }
    }

    color.to_string()
}

/// Chart set used when the model's reply does not decode.
pub fn fallback_charts(palette: &[String]) -> ChartSet {
    let first_four: Vec<String> = (0..4).map(|i| palette_color(palette, i)).collect();
    let historical = palette_color(palette, 0);
    let predicted = palette_color(palette, 1);

    ChartSet {
        pie_chart: ChartSpec {
            title: "Data Distribution".to_string(),
            description: "Distribution of key categories in the data".to_string(),
            adaptive_commentary: "This is a standard distribution analysis of your data categories."
                .to_string(),
            labels: labels(&["Category A", "Category B", "Category C", "Category D"]),
            datasets: vec![Dataset {
                label: "Distribution".to_string(),
                data: values(&[25.0, 30.0, 15.0, 30.0]),
                background_color: Some(ColorSpec::PerPoint(first_four.clone())),
                border_color: None,
                border_dash: None,
                fill: None,
                predicted_data: false,
            }],
        },
        line_chart: ChartSpec {
            title: "Trend Analysis".to_string(),
            description: "Historical trend with future predictions".to_string(),
            adaptive_commentary:
                "This trend analysis shows both historical data and predicted future values."
                    .to_string(),
            labels: labels(&[
                "Past 3", "Past 2", "Past 1", "Present", "Future 1", "Future 2", "Future 3",
            ]),
            datasets: vec![
                Dataset {
                    label: "Historical Data".to_string(),
                    data: values(&[12.0, 19.0, 25.0, 32.0]),
                    background_color: Some(ColorSpec::Single(add_transparency(&historical, 0.2))),
                    border_color: Some(historical),
                    border_dash: None,
                    fill: Some(true),
                    predicted_data: false,
                },
                Dataset {
                    label: "Predicted Data".to_string(),
                    data: vec![None, None, None, Some(32.0), Some(40.0), Some(45.0), Some(52.0)],
                    background_color: Some(ColorSpec::Single(add_transparency(&predicted, 0.2))),
                    border_color: Some(predicted),
                    border_dash: Some(vec![5, 5]),
                    fill: Some(true),
                    predicted_data: true,
                },
            ],
        },
        bar_chart: ChartSpec {
            title: "Comparison Analysis".to_string(),
            description: "Comparison between key metrics".to_string(),
            adaptive_commentary:
                "This comparison shows the relative values of key metrics in your dataset."
                    .to_string(),
            labels: labels(&["Metric A", "Metric B", "Metric C", "Metric D"]),
            datasets: vec![Dataset {
                label: "Current Values".to_string(),
                data: values(&[65.0, 59.0, 80.0, 81.0]),
                background_color: Some(ColorSpec::PerPoint(first_four)),
                border_color: None,
                border_dash: None,
                fill: None,
                predicted_data: false,
            }],
        },
        generated_at: 0,
    }
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn values(items: &[f64]) -> Vec<Option<f64>> {
    items.iter().copied().map(Some).collect()
}

/// Decode a structured chart reply, falling back to the fixed chart set.
pub fn parse_charts(raw: &str, palette: &[String]) -> ChartSet {
    decode::decode_or(raw, "chart data", || fallback_charts(palette))
}

/// Ask the model for a pie/line/bar chart set based on the recent conversation.
pub async fn generate_visualization(
    llm: &dyn LlmClient,
    conversation: &[Message],
    palette: &[String],
    prediction_horizon: u32,
) -> Result<ChartSet, DataSightError> {
    let recent: Vec<Message> = conversation.iter().filter(|m| !m.is_system()).cloned().collect();
    let skip = recent.len().saturating_sub(limits::VISUALIZATION_CONTEXT_MESSAGES);

    let mut request = vec![Message::system(visualization_prompt(prediction_horizon))];
    request.extend(recent.into_iter().skip(skip));

    let response = llm.chat(&request, ChatOptions::structured()).await?;
    let mut charts = parse_charts(response.message.text().unwrap_or_default(), palette);
    charts.apply_styles(palette);
    charts.generated_at = chrono::Utc::now().timestamp_millis();
    Ok(charts)
}

/// Detailed commentary for one chart. Falls back to a fixed notice on failure.
pub async fn explain_chart(llm: &dyn LlmClient, kind: ChartKind, chart: &ChartSpec) -> String {
    let summary = serde_json::json!({
        "chartType": kind.name(),
        "title": chart.title,
        "description": chart.description,
        "labels": chart.labels,
        "data": chart.datasets.first().map(|d| d.data.clone()).unwrap_or_default(),
    });

    let request = vec![
        Message::system(COMMENTARY_PROMPT.replace("{kind}", kind.name())),
        Message::user(summary.to_string()),
    ];

    match llm.chat(&request, ChatOptions::default()).await {
        Ok(response) => response.message.text().unwrap_or_default().to_string(),
        Err(e) => {
            tracing::warn!(chart = kind.name(), "chart commentary failed: {}", e);
            messages::COMMENTARY_UNAVAILABLE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Vec<String> {
        defaults::CHART_PALETTE.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_transparency() {
        assert_eq!(add_transparency("#4285F4", 0.2), "rgba(66, 133, 244, 0.2)");
        assert_eq!(add_transparency("rgb(1, 2, 3)", 0.5), "rgba(1, 2, 3, 0.5)");
        assert_eq!(add_transparency("teal", 0.2), "teal");
        assert_eq!(add_transparency("#zzzzzz", 0.2), "#zzzzzz");
        assert_eq!(add_transparency("#1é2345", 0.2), "#1é2345");
        assert_eq!(add_transparency("#éééééé", 0.2), "#éééééé");
    }

    #[test]
    fn test_non_ascii_palette_entry_is_used_verbatim() {
        let palette = vec!["#1é2345".to_string()];
        let mut charts = fallback_charts(&palette);
        charts.line_chart.datasets[0].background_color = None;
        charts.apply_styles(&palette);
        assert_eq!(
            charts.line_chart.datasets[0].background_color,
            Some(ColorSpec::Single("#1é2345".into()))
        );
    }

    #[test]
    fn test_apply_styles_fills_colors_and_dashes() {
        let mut spec = ChartSpec {
            title: "t".into(),
            description: String::new(),
            adaptive_commentary: String::new(),
            labels: labels(&["a", "b"]),
            datasets: vec![
                Dataset {
                    label: "actual".into(),
                    data: values(&[1.0, 2.0]),
                    background_color: None,
                    border_color: None,
                    border_dash: None,
                    fill: None,
                    predicted_data: false,
                },
                Dataset {
                    label: "forecast".into(),
                    data: vec![None, Some(3.0)],
                    background_color: None,
                    border_color: None,
                    border_dash: None,
                    fill: None,
                    predicted_data: true,
                },
            ],
        };
        spec.apply_styles(ChartKind::Line, &palette());

        let first = &spec.datasets[0];
        assert_eq!(
            first.background_color,
            Some(ColorSpec::Single("rgba(66, 133, 244, 0.2)".into()))
        );
        assert_eq!(first.border_color.as_deref(), Some("#4285F4"));
        assert!(first.border_dash.is_none());

        let second = &spec.datasets[1];
        assert_eq!(second.border_color.as_deref(), Some("#34A853"));
        assert_eq!(second.border_dash, Some(vec![5, 5]));
    }

    #[test]
    fn test_parse_charts_accepts_model_shape() {
        let raw = r##"{
            "pieChart": {"title":"Share","description":"d","adaptiveCommentary":"c","labels":["x","y"],
                "datasets":[{"label":"s","data":[1,2],"backgroundColor":["#fff","#000"]}]},
            "lineChart": {"title":"Trend","labels":["q1","q2","q3"],
                "datasets":[{"label":"p","data":[null,2.5,3],"predictedData":true}]},
            "barChart": {"title":"Bars","labels":["a"],"datasets":[{"label":"b","data":[7],"backgroundColor":"#123456"}]}
        }"##;
        let charts = parse_charts(raw, &palette());
        assert_eq!(charts.pie_chart.title, "Share");
        assert_eq!(charts.line_chart.datasets[0].data, vec![None, Some(2.5), Some(3.0)]);
        assert!(charts.line_chart.datasets[0].predicted_data);
        assert_eq!(
            charts.bar_chart.datasets[0].background_color,
            Some(ColorSpec::Single("#123456".into()))
        );
    }

    #[test]
    fn test_parse_charts_falls_back_on_malformed() {
        let charts = parse_charts("{\"pieChart\": 3}", &palette());
        assert_eq!(charts, fallback_charts(&palette()));
        assert_eq!(charts.line_chart.labels.len(), 7);
        assert_eq!(charts.line_chart.datasets[1].data[3], Some(32.0));
    }

    #[test]
    fn test_chart_kind_parse() {
        assert_eq!(ChartKind::parse(" Line "), Some(ChartKind::Line));
        assert_eq!(ChartKind::parse("radar"), None);
    }
}
