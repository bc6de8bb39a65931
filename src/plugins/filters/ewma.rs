use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::plugins::{Filter, parse_options};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    #[serde(default = "default_alpha")]
    alpha: f64,
}

fn default_alpha() -> f64 {
    0.5
}

/// Exponentially weighted moving average
///
/// `next = alpha * value + (1 - alpha) * previous`, the first value is taken
/// as is.
#[derive(Debug, Clone)]
pub struct EwmaFilter {
    alpha: f64,
    current: Option<f64>,
}

impl EwmaFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            current: None,
        }
    }
}

impl fmt::Display for EwmaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter:ewma:{}", self.alpha)
    }
}

impl Filter for EwmaFilter {
    fn init(&mut self) {
        self.current = None;
    }

    fn put(&mut self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }

        let next = match self.current {
            Some(previous) => self.alpha * value + (1.0 - self.alpha) * previous,
            None => value,
        };
        self.current = Some(next);
        next
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Filter>> {
    let Options { alpha } = parse_options("filter:ewma", params)?;
    if !(alpha > 0.0 && alpha <= 1.0) {
        anyhow::bail!("filter:ewma: alpha must be in (0, 1], got {alpha}");
    }
    Ok(Box::new(EwmaFilter::new(alpha)))
}
