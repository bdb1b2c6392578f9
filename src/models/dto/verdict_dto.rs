use serde::Deserialize;

use crate::models::domain::{ValidatorVerdict, VerdictStatus};

/// Validator output as the model writes it. Older prompts used capitalised keys.
#[derive(Debug, Clone, Deserialize)]
pub struct VerdictDto {
    #[serde(alias = "Status")]
    pub status: VerdictStatus,
    #[serde(alias = "Message", default)]
    pub message: String,
}

impl From<VerdictDto> for ValidatorVerdict {
    fn from(dto: VerdictDto) -> Self {
        ValidatorVerdict {
            status: dto.status,
            message: dto.message.trim().to_string(),
        }
    }
}
