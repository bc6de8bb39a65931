use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::plugins::{Probe, ProbeContext, parse_options};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    #[serde(default)]
    value: f64,
}

/// Always reports the same value
#[derive(Debug, Clone)]
pub struct ConstantProbe {
    value: f64,
}

impl ConstantProbe {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl fmt::Display for ConstantProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe:constant:{}", self.value)
    }
}

#[async_trait]
impl Probe for ConstantProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> f64 {
        self.value
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Probe>> {
    let Options { value } = parse_options("probe:constant", params)?;
    Ok(Box::new(ConstantProbe::new(value)))
}
