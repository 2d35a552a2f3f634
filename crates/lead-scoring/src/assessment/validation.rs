use std::collections::BTreeSet;

use super::questions::{Answer, Question, QuestionKind};

const STEP_TOLERANCE: f64 = 1e-9;

/// Reasons a response is rejected before it is saved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("question `{0}` is not part of this assessment")]
    UnknownQuestion(String),
    #[error("question `{0}` requires an answer")]
    Required(String),
    #[error("question `{question}` expects a {expected} answer, got {found}")]
    AnswerMismatch {
        question: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("question `{question}` has no option `{option}`")]
    UnknownOption { question: String, option: String },
    #[error("question `{0}` accepts a single selection")]
    SingleSelection(String),
    #[error("question `{question}` selected option `{option}` more than once")]
    DuplicateSelection { question: String, option: String },
    #[error("answer {value} for question `{question}` is outside {min}..={max}")]
    OutOfRange {
        question: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("answer {value} for question `{question}` is not a multiple of step {step}")]
    OffStep {
        question: String,
        value: f64,
        step: f64,
    },
    #[error("scale answer {value} for question `{question}` must be a whole number")]
    Fractional { question: String, value: f64 },
    #[error("answer for question `{question}` must be {min}..={max} characters, got {length}")]
    TextLength {
        question: String,
        length: usize,
        min: usize,
        max: usize,
    },
    #[error("ranking for question `{0}` must order every item exactly once")]
    InvalidRanking(String),
    #[error("matrix question `{question}` has no row `{row}`")]
    UnknownRow { question: String, row: String },
    #[error("matrix question `{question}` has no column `{column}` (row `{row}`)")]
    UnknownColumn {
        question: String,
        row: String,
        column: String,
    },
    #[error("matrix question `{question}` is missing row `{row}`")]
    MissingRow { question: String, row: String },
}

/// Checks an answer against the question's required/format/range rules.
pub fn validate_answer(question: &Question, answer: &Answer) -> Result<(), ValidationError> {
    let id = || question.id.clone();

    if answer.is_empty() {
        if question.required {
            return Err(ValidationError::Required(id()));
        }
        return Ok(());
    }

    match (&question.kind, answer) {
        (
            QuestionKind::MultipleChoice {
                options,
                allow_multiple,
            },
            Answer::Choice(selected),
        ) => {
            if !allow_multiple && selected.len() > 1 {
                return Err(ValidationError::SingleSelection(id()));
            }
            let mut seen = BTreeSet::new();
            for option in selected {
                if !options.iter().any(|candidate| &candidate.id == option) {
                    return Err(ValidationError::UnknownOption {
                        question: id(),
                        option: option.clone(),
                    });
                }
                if !seen.insert(option.as_str()) {
                    return Err(ValidationError::DuplicateSelection {
                        question: id(),
                        option: option.clone(),
                    });
                }
            }
            Ok(())
        }
        (QuestionKind::Scale { min, max, .. }, Answer::Number(value)) => {
            check_range(question, *value, f64::from(*min), f64::from(*max))?;
            if value.fract().abs() > STEP_TOLERANCE {
                return Err(ValidationError::Fractional {
                    question: id(),
                    value: *value,
                });
            }
            Ok(())
        }
        (QuestionKind::Slider { min, max, step }, Answer::Number(value)) => {
            check_range(question, *value, *min, *max)?;
            if let Some(step) = step.filter(|step| *step > 0.0) {
                let steps = (value - min) / step;
                if (steps - steps.round()).abs() > 1e-6 {
                    return Err(ValidationError::OffStep {
                        question: id(),
                        value: *value,
                        step,
                    });
                }
            }
            Ok(())
        }
        (
            QuestionKind::Text {
                min_length,
                max_length,
            },
            Answer::Text(text),
        ) => {
            let length = text.trim().chars().count();
            let max = max_length.unwrap_or(usize::MAX);
            if length < *min_length || length > max {
                return Err(ValidationError::TextLength {
                    question: id(),
                    length,
                    min: *min_length,
                    max,
                });
            }
            Ok(())
        }
        (QuestionKind::Ranking { items }, Answer::Ranking(order)) => {
            let expected: BTreeSet<&str> = items.iter().map(String::as_str).collect();
            let provided: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            if order.len() != items.len() || provided != expected {
                return Err(ValidationError::InvalidRanking(id()));
            }
            Ok(())
        }
        (QuestionKind::Matrix { rows, columns }, Answer::Matrix(cells)) => {
            for (row, column) in cells {
                if !rows.contains(row) {
                    return Err(ValidationError::UnknownRow {
                        question: id(),
                        row: row.clone(),
                    });
                }
                if !columns.contains(column) {
                    return Err(ValidationError::UnknownColumn {
                        question: id(),
                        row: row.clone(),
                        column: column.clone(),
                    });
                }
            }
            if question.required {
                if let Some(row) = rows.iter().find(|row| !cells.contains_key(*row)) {
                    return Err(ValidationError::MissingRow {
                        question: id(),
                        row: row.clone(),
                    });
                }
            }
            Ok(())
        }
        (kind, answer) => Err(ValidationError::AnswerMismatch {
            question: id(),
            expected: expected_answer(kind),
            found: answer.label(),
        }),
    }
}

fn check_range(question: &Question, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            question: question.id.clone(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn expected_answer(kind: &QuestionKind) -> &'static str {
    match kind {
        QuestionKind::MultipleChoice { .. } => "choice",
        QuestionKind::Scale { .. } | QuestionKind::Slider { .. } => "number",
        QuestionKind::Text { .. } => "text",
        QuestionKind::Ranking { .. } => "ranking",
        QuestionKind::Matrix { .. } => "matrix",
    }
}
