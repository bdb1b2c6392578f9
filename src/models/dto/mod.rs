pub mod generator_output;
pub mod verdict_dto;

pub use generator_output::{OptionsDto, QaDraftDto};
pub use verdict_dto::VerdictDto;
