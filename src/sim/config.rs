use std::path::PathBuf;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::*;

use crate::timeq::ServerConfig;

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Self {
        match section {
            Some(value) => value.clone().try_into().expect("cannot deserialize config"),
            None => {
                warn!("config section not found");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Placed application graph consumed by the mapper.
    pub application: PathBuf,
    pub log_level: u64,
    pub timeout: u64,
    /// Where to dump the JSON statistics summary, if anywhere.
    pub stats_path: Option<PathBuf>,
    /// Where to dump the mapped graph in Graphviz format, if anywhere.
    pub dot_path: Option<PathBuf>,
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            application: PathBuf::new(),
            log_level: 0,
            timeout: 10000000,
            stats_path: None,
            dot_path: None,
        }
    }
}

/// Per-array parameters: queue sizing, L/S port count and per-class latencies.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LlyrConfig {
    pub verbose: u64,
    pub queue_depth: usize,
    pub arith_latency: u32,
    pub int_latency: u32,
    pub int_div_latency: u32,
    pub fp_latency: u32,
    pub fp_mul_latency: u32,
    pub fp_div_latency: u32,
    pub complex_latency: u32,
    pub starting_addr: u64,
    pub ls_entries: usize,
}

impl Config for LlyrConfig {}

impl Default for LlyrConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            queue_depth: 256,
            arith_latency: 1,
            int_latency: 1,
            int_div_latency: 4,
            fp_latency: 4,
            fp_mul_latency: 4,
            fp_div_latency: 16,
            complex_latency: 12,
            starting_addr: 0,
            ls_entries: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemConfig {
    pub base_latency: u64,
    pub bytes_per_cycle: u32,
    pub queue_capacity: usize,
    /// 64-bit words written back-to-back from `LlyrConfig::starting_addr` before the run.
    pub init_words: Vec<u64>,
}

impl Config for MemConfig {}

impl Default for MemConfig {
    fn default() -> Self {
        Self {
            base_latency: 10,
            bytes_per_cycle: 8,
            queue_capacity: 16,
            init_words: Vec::new(),
        }
    }
}

impl MemConfig {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            base_latency: self.base_latency,
            bytes_per_cycle: self.bytes_per_cycle,
            queue_capacity: self.queue_capacity,
        }
    }
}
