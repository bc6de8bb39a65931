use std::collections::VecDeque;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::plugins::{Filter, parse_options};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    #[serde(default = "default_window")]
    window: usize,
}

fn default_window() -> usize {
    5
}

/// Moving average over the last `window` values
#[derive(Debug, Clone)]
pub struct AverageFilter {
    window: usize,
    samples: VecDeque<f64>,
}

impl AverageFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }
}

impl fmt::Display for AverageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter:average:{}", self.window)
    }
}

impl Filter for AverageFilter {
    fn init(&mut self) {
        self.samples.clear();
    }

    fn put(&mut self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }

        self.samples.push_back(value);

        // prune old samples
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }

        // depends on the current window only, no running total
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Filter>> {
    let Options { window } = parse_options("filter:average", params)?;
    if window == 0 {
        anyhow::bail!("filter:average: window must be at least 1");
    }
    Ok(Box::new(AverageFilter::new(window)))
}
