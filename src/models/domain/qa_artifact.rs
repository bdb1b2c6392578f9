use std::collections::BTreeMap;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "Short-Answer")]
    ShortAnswer,
    #[serde(rename = "Fill-in-the-Blank")]
    FillInTheBlank,
    #[serde(rename = "Open-Ended")]
    OpenEnded,
    #[serde(rename = "Anki")]
    Anki, // resolves to MCQ or Fill-in-the-Blank per call
}

/// How long an answer of a given type is expected to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthClass {
    LongForm,
    ShortForm,
}

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        QuestionType::Mcq,
        QuestionType::ShortAnswer,
        QuestionType::FillInTheBlank,
        QuestionType::OpenEnded,
        QuestionType::Anki,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::ShortAnswer => "Short-Answer",
            QuestionType::FillInTheBlank => "Fill-in-the-Blank",
            QuestionType::OpenEnded => "Open-Ended",
            QuestionType::Anki => "Anki",
        }
    }

    pub fn requires_options(&self) -> bool {
        matches!(self, QuestionType::Mcq)
    }

    pub fn length_class(&self) -> LengthClass {
        match self {
            QuestionType::Mcq | QuestionType::OpenEnded => LengthClass::LongForm,
            QuestionType::ShortAnswer | QuestionType::FillInTheBlank | QuestionType::Anki => {
                LengthClass::ShortForm
            }
        }
    }

    /// Picks the concrete type to generate. Only `Anki` is composite.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> QuestionType {
        match self {
            QuestionType::Anki => {
                if rng.gen_bool(0.5) {
                    QuestionType::Mcq
                } else {
                    QuestionType::FillInTheBlank
                }
            }
            other => other,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "short-answer" => Ok(QuestionType::ShortAnswer),
            "fill-in-the-blank" | "fill-in-the-blanks" => Ok(QuestionType::FillInTheBlank),
            "open-ended" | "long-answer" => Ok(QuestionType::OpenEnded),
            "anki" => Ok(QuestionType::Anki),
            _ => Err(AppError::ValidationError(format!(
                "Unknown question type '{}'",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct QaArtifact {
    pub question_type: QuestionType,
    #[validate(length(min = 1))]
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>, // label -> text, MCQ only
    #[validate(length(min = 1))]
    pub answer: String,
}

impl QaArtifact {
    /// Builds an artifact and enforces its schema: non-empty question and answer,
    /// options present iff the type is MCQ, and no empty option label or text.
    pub fn new(
        question_type: QuestionType,
        question: &str,
        options: Option<BTreeMap<String, String>>,
        answer: &str,
    ) -> AppResult<Self> {
        let options = options.map(|opts| {
            opts.into_iter()
                .map(|(label, text)| (label.trim().to_string(), text.trim().to_string()))
                .collect::<BTreeMap<_, _>>()
        });
        let artifact = QaArtifact {
            question_type,
            question: question.trim().to_string(),
            options,
            answer: answer.trim().to_string(),
        };
        artifact.check_schema()?;
        Ok(artifact)
    }

    pub fn check_schema(&self) -> AppResult<()> {
        if self.question_type == QuestionType::Anki {
            return Err(AppError::ValidationError(
                "Anki must be resolved to a concrete question type".to_string(),
            ));
        }
        self.validate()?;

        match (&self.options, self.question_type.requires_options()) {
            (Some(options), true) => {
                if options.len() < 2 {
                    return Err(AppError::ValidationError(format!(
                        "MCQ needs at least two options, got {}",
                        options.len()
                    )));
                }
                if options
                    .iter()
                    .any(|(label, text)| label.is_empty() || text.is_empty())
                {
                    return Err(AppError::ValidationError(
                        "MCQ options must have non-empty labels and texts".to_string(),
                    ));
                }
                Ok(())
            }
            (None, true) => Err(AppError::ValidationError(
                "MCQ artifact is missing options".to_string(),
            )),
            (Some(_), false) => Err(AppError::ValidationError(format!(
                "{} artifact must not carry options",
                self.question_type
            ))),
            (None, false) => Ok(()),
        }
    }

    pub fn options_line(&self) -> Option<String> {
        self.options.as_ref().map(|options| {
            options
                .iter()
                .map(|(label, text)| format!("{}) {}", label, text))
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    /// The block shown to the validator and written to the conversation log.
    pub fn qa_string(&self) -> String {
        match self.options_line() {
            Some(options) => format!(
                "Question stem:\n{}\nOptions:\n{}\nAnswer:\n{}",
                self.question, options, self.answer
            ),
            None => format!("Question stem:\n{}\nAnswer:\n{}", self.question, self.answer),
        }
    }

    /// Display text: the stem followed by one option per line.
    pub fn render_question(&self) -> String {
        match &self.options {
            Some(options) => {
                let lines = options
                    .iter()
                    .map(|(label, text)| format!("{}) {}", label, text))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{}\n\n{}", self.question, lines)
            }
            None => self.question.clone(),
        }
    }
}
