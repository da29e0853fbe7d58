use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::Context;
use log::info;

use crate::llyr::engine::{LlyrEngine, LlyrStats};
use crate::llyr::mapper::{map, AppGraphDesc};
use crate::sim::config::{LlyrConfig, MemConfig, SimConfig};
use crate::sim::log::Logger;
use crate::sim::mem_iface::TimedMemory;

pub struct Sim {
    config: SimConfig,
    engine: LlyrEngine,
}

impl Sim {
    /// Load the application named by `sim_config` and map it onto a fresh array.
    pub fn new(
        sim_config: SimConfig,
        llyr_config: LlyrConfig,
        mem_config: MemConfig,
    ) -> Result<Sim, anyhow::Error> {
        let app = AppGraphDesc::load(&sim_config.application)?;
        Self::with_app(sim_config, llyr_config, mem_config, &app)
    }

    pub fn with_app(
        sim_config: SimConfig,
        llyr_config: LlyrConfig,
        mem_config: MemConfig,
        app: &AppGraphDesc,
    ) -> Result<Sim, anyhow::Error> {
        let logger = Arc::new(Logger::new(sim_config.log_level.max(llyr_config.verbose)));
        let mapped = map(app, &llyr_config)?;
        if let Some(path) = &sim_config.dot_path {
            mapped
                .labelled()
                .print_dot(path)
                .with_context(|| format!("cannot write {}", path.display()))?;
        }
        mapped.graph().print_graph();

        let mem = TimedMemory::from_config(&mem_config, llyr_config.starting_addr)?;
        let engine = LlyrEngine::new(Arc::new(llyr_config), mapped, Box::new(mem), &logger);
        Ok(Sim { config: sim_config, engine })
    }

    pub fn engine(&self) -> &LlyrEngine {
        &self.engine
    }

    pub fn simulate(&mut self) -> Result<LlyrStats, anyhow::Error> {
        let cycles = self.engine.run(self.config.timeout)?;
        info!("simulation halted after {} cycles", cycles);

        let stats = self.engine.stats();
        if let Some(path) = &self.config.stats_path {
            let out = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(out), &stats)?;
        }
        Ok(stats)
    }
}
