//! Host metric probe backed by `sysinfo`
//!
//! `metric` selects what is reported:
//!
//! - `cpu`: average CPU usage over all cores in percent
//! - `memory`, `swap`: used share in percent
//! - `load1`, `load5`, `load15`: load averages
//! - `temperature`: average component temperature in °C

use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sysinfo::{Components, System};
use tracing::trace;

use crate::plugins::{Probe, ProbeContext, parse_options};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Memory,
    Swap,
    Load1,
    Load5,
    Load15,
    Temperature,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Swap => "swap",
            Metric::Load1 => "load1",
            Metric::Load5 => "load5",
            Metric::Load15 => "load15",
            Metric::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    metric: Metric,
}

pub struct SystemProbe {
    metric: Metric,
    system: Mutex<System>,
}

impl fmt::Display for SystemProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe:system:{}", self.metric)
    }
}

fn percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

impl SystemProbe {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            system: Mutex::new(System::new()),
        }
    }

    fn with_system<R>(&self, f: impl FnOnce(&mut System) -> R) -> R {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut system)
    }

    async fn cpu_usage(&self) -> f64 {
        // usage is computed between two refreshes
        self.with_system(|sys| sys.refresh_cpu_usage());
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

        self.with_system(|sys| {
            sys.refresh_cpu_usage();
            let cpus = sys.cpus();
            if cpus.is_empty() {
                return 0.0;
            }
            let cpu_usage_sum = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>();
            f64::from(cpu_usage_sum / cpus.len() as f32)
        })
    }

    fn average_temperature() -> f64 {
        let components = Components::new_with_refreshed_list();
        let temperatures: Vec<f32> = components
            .iter()
            .filter_map(|component| component.temperature())
            .collect();

        if temperatures.is_empty() {
            return 0.0;
        }
        f64::from(temperatures.iter().sum::<f32>() / temperatures.len() as f32)
    }

    async fn measure(&self) -> f64 {
        match self.metric {
            Metric::Cpu => self.cpu_usage().await,
            Metric::Memory => self.with_system(|sys| {
                sys.refresh_memory();
                percentage(sys.used_memory(), sys.total_memory())
            }),
            Metric::Swap => self.with_system(|sys| {
                sys.refresh_memory();
                percentage(sys.used_swap(), sys.total_swap())
            }),
            Metric::Load1 => System::load_average().one,
            Metric::Load5 => System::load_average().five,
            Metric::Load15 => System::load_average().fifteen,
            Metric::Temperature => Self::average_temperature(),
        }
    }
}

#[async_trait]
impl Probe for SystemProbe {
    async fn probe(&self, ctx: &ProbeContext) -> f64 {
        // NaN is never in range
        let value = ctx.run(self.measure(), f64::NAN).await;
        trace!("{}: {value}", self.metric);
        value
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Probe>> {
    let Options { metric } = parse_options("probe:system", params)?;
    Ok(Box::new(SystemProbe::new(metric)))
}
