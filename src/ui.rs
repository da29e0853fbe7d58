use clap::Parser;
use crate::sim::config::{Config, LlyrConfig, MemConfig, SimConfig};
use crate::sim::top::Sim;
use std::path::PathBuf;
use toml::Table;

#[derive(Parser)]
#[command(version, about)]
pub struct LlyrArgs {
    #[arg(help = "Path to config.toml")]
    pub config_path: PathBuf,
    #[arg(long, help = "Override application graph path")]
    pub application: Option<PathBuf>,
    #[arg(long, help = "Override per-queue token capacity")]
    pub queue_depth: Option<usize>,
    #[arg(long, help = "Override LSQ entries retired per cycle")]
    pub ls_entries: Option<usize>,
    #[arg(long, help = "Enable log at level (0:none, 1:info, 2:debug)")]
    pub log: Option<u64>,
    #[arg(long, help = "Write statistics JSON to this path")]
    pub stats: Option<PathBuf>,
}

/// Make a Sim object from the TOML configuration.
/// If `cli_args` is given, override TOML options with CLI arguments.
pub fn make_sim(toml_string: &str, cli_args: Option<LlyrArgs>) -> Result<Sim, anyhow::Error> {
    let config_table: Table = toml::from_str(toml_string)?;
    let mut sim_config = SimConfig::from_section(config_table.get("sim"));
    let mut llyr_config = LlyrConfig::from_section(config_table.get("llyr"));
    let mem_config = MemConfig::from_section(config_table.get("mem"));

    // override toml configs with CLI args
    if let Some(args) = cli_args {
        sim_config.application = args.application.unwrap_or(sim_config.application);
        sim_config.log_level = args.log.unwrap_or(sim_config.log_level);
        sim_config.stats_path = args.stats.or(sim_config.stats_path);
        llyr_config.queue_depth = args.queue_depth.unwrap_or(llyr_config.queue_depth);
        llyr_config.ls_entries = args.ls_entries.unwrap_or(llyr_config.ls_entries);
    }

    Sim::new(sim_config, llyr_config, mem_config)
}
