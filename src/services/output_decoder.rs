use once_cell::sync::Lazy;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{QaArtifact, QuestionType, ValidatorVerdict},
        dto::{QaDraftDto, VerdictDto},
    },
};

static DRAFT_SCHEMA: Lazy<String> = Lazy::new(|| {
    let schema = schemars::schema_for!(QaDraftDto);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
});

/// JSON schema of the draft object, embedded in format-repair prompts.
pub fn draft_schema() -> &'static str {
    DRAFT_SCHEMA.as_str()
}

/// Returns the first balanced `{...}` in `text`, skipping braces inside strings.
/// Models wrap their JSON in prose or markdown fences often enough that a
/// direct parse is not sufficient.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

fn json_candidate(raw: &str) -> &str {
    extract_json_object(raw).unwrap_or(raw.trim())
}

/// Decodes generator (or format-role) output into an artifact of the resolved type.
pub fn decode_draft(raw: &str, question_type: QuestionType) -> AppResult<QaArtifact> {
    let draft: QaDraftDto = serde_json::from_str(json_candidate(raw))
        .map_err(|e| AppError::ValidationError(format!("Draft is not valid JSON: {}", e)))?;
    draft.into_artifact(question_type)
}

/// Decodes the validator's reply. Failure here is fatal for the item.
pub fn decode_verdict(raw: &str) -> AppResult<ValidatorVerdict> {
    serde_json::from_str::<VerdictDto>(json_candidate(raw))
        .map(ValidatorVerdict::from)
        .map_err(|e| {
            AppError::ProviderDecode(format!("Validator reply is not a verdict: {}", e))
        })
}
