use crate::models::question::{Question, QuestionType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedQuestion {
    pub question_id: i64,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
    pub score: i64,
    pub details: Vec<GradedQuestion>,
}

pub struct GradingService;

impl GradingService {
    /// Grades every question in the given order. Answers keyed by ids that
    /// are not among `questions` are ignored.
    pub fn grade(questions: &[Question], answers: &HashMap<i64, String>) -> GradingResult {
        let mut score = 0;
        let mut details = Vec::with_capacity(questions.len());

        for q in questions {
            let submitted = answers.get(&q.id).map(String::as_str);
            let graded = match q.kind() {
                Some(QuestionType::Mcq) => grade_mcq(q, submitted),
                Some(QuestionType::Short) | Some(QuestionType::Code) => grade_text(q, submitted),
                None => {
                    tracing::warn!(
                        question_id = q.id,
                        question_type = %q.question_type,
                        "cannot grade question of unknown type"
                    );
                    GradedQuestion {
                        question_id: q.id,
                        correct: false,
                        expected: None,
                    }
                }
            };

            if graded.correct {
                score += 1;
            }
            details.push(graded);
        }

        GradingResult { score, details }
    }
}

/// Trim, lowercase, and collapse whitespace runs into single spaces.
pub fn normalize_answer(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Resolves a stored MCQ key to an option index. A numeric key is taken as
/// the index itself and must land inside `options`; anything else is matched
/// against the option texts after normalization.
pub fn resolve_mcq_index(key: Option<&str>, options: &[String]) -> Option<usize> {
    let key = key?;
    let normalized_key = normalize_answer(key);
    if normalized_key.is_empty() {
        return None;
    }

    match parse_number(key) {
        Some(n) => {
            if n.fract() == 0.0 && n >= 0.0 && (n as usize) < options.len() {
                Some(n as usize)
            } else {
                None
            }
        }
        None => options
            .iter()
            .position(|opt| normalize_answer(opt) == normalized_key),
    }
}

/// A numeric submission is read as an option index and never as option text.
fn grade_mcq(q: &Question, submitted: Option<&str>) -> GradedQuestion {
    let options = q.options().unwrap_or_default();
    let correct_idx = resolve_mcq_index(q.correct_answer.as_deref(), &options);
    let expected = correct_idx.map(|i| options[i].clone());

    let correct = match (submitted, correct_idx) {
        (Some(raw), Some(idx)) if !normalize_answer(raw).is_empty() => match parse_number(raw) {
            Some(n) => n == idx as f64,
            None => normalize_answer(raw) == normalize_answer(&options[idx]),
        },
        _ => false,
    };

    GradedQuestion {
        question_id: q.id,
        correct,
        expected,
    }
}

fn grade_text(q: &Question, submitted: Option<&str>) -> GradedQuestion {
    let expected = q.correct_answer.clone();
    let correct = match (submitted, expected.as_deref()) {
        (Some(raw), Some(key)) => {
            let key = normalize_answer(key);
            !key.is_empty() && normalize_answer(raw) == key
        }
        _ => false,
    };

    GradedQuestion {
        question_id: q.id,
        correct,
        expected,
    }
}
