pub mod context_assembler;
pub mod generation_memory;
pub mod model_service;
pub mod output_decoder;
pub mod pricing;
pub mod question_bank_service;
pub mod refinement_engine;
pub mod sampler;
pub mod token_counter;
