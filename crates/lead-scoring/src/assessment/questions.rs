use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authored survey question. Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

fn default_required() -> bool {
    true
}

impl Question {
    pub fn weight(&self) -> f64 {
        self.weight.filter(|weight| weight.is_finite()).unwrap_or(1.0)
    }
}

/// The six supported question shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<ChoiceOption>,
        #[serde(default)]
        allow_multiple: bool,
    },
    Scale {
        min: i32,
        max: i32,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        labels: BTreeMap<String, String>,
    },
    Text {
        #[serde(default)]
        min_length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Ranking {
        items: Vec<String>,
    },
    Slider {
        min: f64,
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Matrix {
        rows: Vec<String>,
        columns: Vec<String>,
    },
}

impl QuestionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::Scale { .. } => "scale",
            QuestionKind::Text { .. } => "text",
            QuestionKind::Ranking { .. } => "ranking",
            QuestionKind::Slider { .. } => "slider",
            QuestionKind::Matrix { .. } => "matrix",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

/// Answer payload; its variant must match the question shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(Vec<String>),
    Number(f64),
    Text(String),
    Ranking(Vec<String>),
    Matrix(BTreeMap<String, String>),
}

impl Answer {
    pub const fn label(&self) -> &'static str {
        match self {
            Answer::Choice(_) => "choice",
            Answer::Number(_) => "number",
            Answer::Text(_) => "text",
            Answer::Ranking(_) => "ranking",
            Answer::Matrix(_) => "matrix",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Choice(selected) => selected.is_empty(),
            Answer::Number(value) => !value.is_finite(),
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Ranking(items) => items.is_empty(),
            Answer::Matrix(cells) => cells.is_empty(),
        }
    }
}

/// One answer to one question within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: String,
    pub answer: Answer,
    #[serde(default)]
    pub time_spent_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_json_uses_flat_type_tag() {
        let raw = json!({
            "id": "q1",
            "prompt": "How often do you set goals?",
            "type": "scale",
            "min": 1,
            "max": 5
        });

        let question: Question = serde_json::from_value(raw).expect("question parses");
        assert!(question.required);
        assert_eq!(question.weight(), 1.0);
        assert_eq!(question.kind.label(), "scale");
    }

    #[test]
    fn answers_are_tagged_with_value() {
        let answer: Answer =
            serde_json::from_value(json!({ "type": "choice", "value": ["a", "b"] }))
                .expect("answer parses");
        assert_eq!(answer, Answer::Choice(vec!["a".to_string(), "b".to_string()]));
        assert!(Answer::Text("  ".to_string()).is_empty());
    }
}
