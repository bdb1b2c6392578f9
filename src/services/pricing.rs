use std::collections::HashMap;

use serde::Serialize;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenDirection {
    Input,
    Output,
}

/// Dollar price per single token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPrice {
    pub input_per_token: f64,
    pub output_per_token: f64,
}

impl ModelPrice {
    pub fn per_thousand(input: f64, output: f64) -> Self {
        Self {
            input_per_token: input / 1000.0,
            output_per_token: output / 1000.0,
        }
    }

    pub fn cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        input_tokens as f64 * self.input_per_token + output_tokens as f64 * self.output_per_token
    }
}

#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, ModelPrice>,
}

impl PricingTable {
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();
        prices.insert("gpt-4".to_string(), ModelPrice::per_thousand(0.03, 0.06));
        prices.insert(
            "gpt-4-1106-preview".to_string(),
            ModelPrice::per_thousand(0.01, 0.03),
        );
        prices.insert(
            "gpt-3.5-turbo-1106".to_string(),
            ModelPrice::per_thousand(0.001, 0.002),
        );
        Self { prices }
    }

    pub fn register(&mut self, model: &str, price: ModelPrice) -> AppResult<()> {
        let valid = |p: f64| p.is_finite() && p > 0.0;
        if model.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Model name must not be empty".to_string(),
            ));
        }
        if !valid(price.input_per_token) || !valid(price.output_per_token) {
            return Err(AppError::ValidationError(format!(
                "Prices for {} must be positive",
                model
            )));
        }
        self.prices.insert(model.to_string(), price);
        Ok(())
    }

    pub fn model_price(&self, model: &str) -> AppResult<ModelPrice> {
        self.prices
            .get(model)
            .copied()
            .ok_or_else(|| AppError::UnknownPricingModel(model.to_string()))
    }

    pub fn price(&self, model: &str, direction: TokenDirection) -> AppResult<f64> {
        let price = self.model_price(model)?;
        Ok(match direction {
            TokenDirection::Input => price.input_per_token,
            TokenDirection::Output => price.output_per_token,
        })
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
