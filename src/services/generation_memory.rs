use std::collections::HashMap;

use crate::{
    errors::{AppError, AppResult},
    services::sampler::IndexSampler,
};

/// How many questions each bank position has produced in the current session.
#[derive(Debug, Clone, Default)]
pub struct GenerationMemory {
    counts: HashMap<usize, u32>,
}

impl GenerationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, index: usize) -> u32 {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// True when every position in `0..universe` has reached `cap`.
    pub fn is_saturated(&self, universe: usize, cap: u32) -> bool {
        (0..universe).all(|index| self.count(index) >= cap)
    }

    /// Draws until a position under `cap` comes up, records it, and returns it.
    /// Does not return once every position is saturated; use
    /// [`GenerationMemory::select_next_bounded`] when that can happen.
    pub fn select_next<S: IndexSampler + ?Sized>(&mut self, sampler: &mut S, cap: u32) -> usize {
        loop {
            let index = sampler.next_index();
            if self.count(index) < cap {
                *self.counts.entry(index).or_insert(0) += 1;
                return index;
            }
        }
    }

    pub fn select_next_bounded<S: IndexSampler + ?Sized>(
        &mut self,
        sampler: &mut S,
        cap: u32,
        max_attempts: usize,
    ) -> AppResult<usize> {
        if cap == 0 {
            return Err(AppError::ValidationError(
                "Per-item question cap must be at least 1".to_string(),
            ));
        }
        if self.is_saturated(sampler.len(), cap) {
            return Err(AppError::SelectionExhausted { attempts: 0 });
        }

        for _ in 0..max_attempts {
            let index = sampler.next_index();
            if self.count(index) < cap {
                *self.counts.entry(index).or_insert(0) += 1;
                return Ok(index);
            }
        }

        log::warn!(
            "No selectable item after {} draws ({} questions recorded)",
            max_attempts,
            self.total()
        );
        Err(AppError::SelectionExhausted {
            attempts: max_attempts,
        })
    }
}
