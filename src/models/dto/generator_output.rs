use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::domain::{QaArtifact, QuestionType};

static INLINE_OPTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s,;])([A-J])\)").expect("INLINE_OPTION_MARKER is a valid regex pattern")
});

static LEADING_OPTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\(?([A-J])[\).:]\s*(.*)$")
        .expect("LEADING_OPTION_LABEL is a valid regex pattern")
});

/// A question/answer draft as produced by the generator (or the format role).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct QaDraftDto {
    #[serde(alias = "Question")]
    pub question: String,
    #[serde(alias = "Options", default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionsDto>,
    #[serde(alias = "Answer")]
    pub answer: String,
}

/// MCQ options: a label-to-text object, a list, or a single "A) ... B) ..." string.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum OptionsDto {
    Labeled(BTreeMap<String, String>),
    Listed(Vec<String>),
    Inline(String),
}

impl OptionsDto {
    pub fn into_labeled(self) -> AppResult<BTreeMap<String, String>> {
        let options = match self {
            OptionsDto::Labeled(map) => map
                .into_iter()
                .map(|(label, text)| (normalize_label(&label), text.trim().to_string()))
                .collect::<BTreeMap<_, _>>(),
            OptionsDto::Listed(items) => listed_options(&items)?,
            OptionsDto::Inline(text) => parse_inline_options(&text),
        };

        if options.len() < 2 {
            return Err(AppError::ValidationError(format!(
                "Could not read at least two options, found {}",
                options.len()
            )));
        }
        Ok(options)
    }
}

impl QaDraftDto {
    /// Converts the draft into an artifact of the given (already resolved) type.
    pub fn into_artifact(self, question_type: QuestionType) -> AppResult<QaArtifact> {
        let options = match (self.options, question_type.requires_options()) {
            (Some(options), true) => Some(options.into_labeled()?),
            (None, true) => None,
            (Some(_), false) => {
                log::warn!(
                    "Discarding options returned for a {} question",
                    question_type
                );
                None
            }
            (None, false) => None,
        };

        QaArtifact::new(question_type, &self.question, options, &self.answer)
    }
}

impl From<&QaArtifact> for QaDraftDto {
    fn from(artifact: &QaArtifact) -> Self {
        QaDraftDto {
            question: artifact.question.clone(),
            options: artifact.options.clone().map(OptionsDto::Labeled),
            answer: artifact.answer.clone(),
        }
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_start_matches('(')
        .trim_end_matches([')', '.', ':'])
        .trim()
        .to_ascii_uppercase()
}

const MAX_LISTED_OPTIONS: usize = 26;

fn fallback_label(position: usize) -> String {
    let letter = (b'A' + position as u8) as char;
    letter.to_string()
}

fn listed_options(items: &[String]) -> AppResult<BTreeMap<String, String>> {
    if items.len() > MAX_LISTED_OPTIONS {
        return Err(AppError::ValidationError(format!(
            "Too many options: {} listed, at most {} can be labelled",
            items.len(),
            MAX_LISTED_OPTIONS
        )));
    }

    let mut options = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        let (label, text) = split_leading_label(item, i);
        if options.contains_key(&label) {
            return Err(AppError::ValidationError(format!(
                "Option label '{}' appears more than once",
                label
            )));
        }
        options.insert(label, text);
    }
    Ok(options)
}

fn split_leading_label(item: &str, position: usize) -> (String, String) {
    match LEADING_OPTION_LABEL.captures(item) {
        Some(caps) => {
            let label = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let text = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            (label.to_string(), text.trim().to_string())
        }
        None => (fallback_label(position), item.trim().to_string()),
    }
}

fn parse_inline_options(text: &str) -> BTreeMap<String, String> {
    let markers: Vec<(String, usize, usize)> = INLINE_OPTION_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?;
            Some((label.as_str().to_string(), label.start(), whole.end()))
        })
        .collect();

    let mut options = BTreeMap::new();
    for (i, (label, _, body_start)) in markers.iter().enumerate() {
        let body_end = markers
            .get(i + 1)
            .map(|(_, next_label_start, _)| *next_label_start)
            .unwrap_or(text.len());
        let body = text[*body_start..body_end]
            .trim()
            .trim_end_matches([',', ';'])
            .trim();
        if !body.is_empty() {
            options.insert(label.clone(), body.to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_options_are_split_by_label() {
        let options = OptionsDto::Inline(
            "A) Small bowel obstruction B) Foreign body perforation, C) Acute mesenteric ischemia"
                .to_string(),
        )
        .into_labeled()
        .expect("inline options should parse");

        assert_eq!(options.len(), 3);
        assert_eq!(options["A"], "Small bowel obstruction");
        assert_eq!(options["B"], "Foreign body perforation");
        assert_eq!(options["C"], "Acute mesenteric ischemia");
    }

    #[test]
    fn listed_options_keep_or_assign_labels() {
        let labeled = OptionsDto::Listed(vec!["A) Lipoma".into(), "B) Liposarcoma".into()])
            .into_labeled()
            .expect("listed options should parse");
        assert_eq!(labeled["B"], "Liposarcoma");

        let bare = OptionsDto::Listed(vec!["Lipoma".into(), "Liposarcoma".into()])
            .into_labeled()
            .expect("bare options should parse");
        assert_eq!(bare["A"], "Lipoma");
        assert_eq!(bare["B"], "Liposarcoma");
    }

    #[test]
    fn object_labels_are_normalized() {
        let draft: QaDraftDto = serde_json::from_str(
            r#"{"question":"Q?","options":{"a)":"One","b.":"Two"},"answer":"A) One, because..."}"#,
        )
        .expect("draft should parse");
        let artifact = draft
            .into_artifact(QuestionType::Mcq)
            .expect("draft should convert");

        let options = artifact.options.expect("MCQ keeps options");
        assert_eq!(
            options.keys().cloned().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn single_option_is_rejected() {
        let result = OptionsDto::Inline("A) Only one".to_string()).into_labeled();
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn listed_options_never_lose_entries_to_label_collisions() {
        let many = OptionsDto::Listed((0..27).map(|i| format!("Choice {}", i)).collect())
            .into_labeled();
        assert!(matches!(many, Err(AppError::ValidationError(_))));

        let all_letters = OptionsDto::Listed((0..26).map(|i| format!("Choice {}", i)).collect())
            .into_labeled()
            .expect("26 bare options fit the alphabet");
        assert_eq!(all_letters.len(), 26);
        assert_eq!(all_letters["Z"], "Choice 25");

        // "Liposarcoma" falls back to B, which the first entry already claimed
        let clash = OptionsDto::Listed(vec!["B) Lipoma".into(), "Liposarcoma".into()])
            .into_labeled();
        assert!(matches!(clash, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn options_for_non_mcq_are_discarded() {
        let draft: QaDraftDto = serde_json::from_str(
            r#"{"question":"Name the sign.","options":"A) x B) y","answer":"Target sign"}"#,
        )
        .expect("draft should parse");
        let artifact = draft
            .into_artifact(QuestionType::ShortAnswer)
            .expect("draft should convert");

        assert!(artifact.options.is_none());
    }

    #[test]
    fn mcq_without_options_is_rejected() {
        let draft: QaDraftDto =
            serde_json::from_str(r#"{"question":"Q?","answer":"A"}"#).expect("draft should parse");
        assert!(draft.into_artifact(QuestionType::Mcq).is_err());
    }
}
