use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum VerdictStatus {
    #[serde(alias = "pass", alias = "PASS")]
    Pass,
    #[serde(alias = "fail", alias = "FAIL")]
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictStatus::Pass => write!(f, "Pass"),
            VerdictStatus::Fail => write!(f, "Fail"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidatorVerdict {
    pub status: VerdictStatus,
    pub message: String,
}

impl ValidatorVerdict {
    pub fn pass(message: &str) -> Self {
        ValidatorVerdict {
            status: VerdictStatus::Pass,
            message: message.to_string(),
        }
    }

    pub fn fail(message: &str) -> Self {
        ValidatorVerdict {
            status: VerdictStatus::Fail,
            message: message.to_string(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == VerdictStatus::Pass
    }

    /// Forces the verdict to `Fail`. A passing verdict's message is replaced by the
    /// instruction; an existing failure message is kept and the instruction appended.
    pub fn force_fail(&mut self, instruction: &str) {
        match self.status {
            VerdictStatus::Pass => {
                self.status = VerdictStatus::Fail;
                self.message = instruction.to_string();
            }
            VerdictStatus::Fail => {
                let existing = self.message.trim_end();
                self.message = if existing.is_empty() {
                    instruction.to_string()
                } else {
                    format!("{} Also, {}", existing, lowercase_first(instruction))
                };
            }
        }
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
