use std::fs;
use clap::Parser;
use llyr::ui::{make_sim, LlyrArgs};

pub fn main() {
    env_logger::init();

    let argv = LlyrArgs::parse();
    let config = fs::read_to_string(&argv.config_path).unwrap_or_else(|err| {
        eprintln!("failed to read config file: {}", err);
        std::process::exit(1);
    });

    let result = make_sim(&config, Some(argv)).and_then(|mut sim| sim.simulate());
    match result {
        Ok(stats) => {
            println!(
                "halted after {} cycles ({} busy, {} waiting on memory)",
                stats.cycles, stats.busy_cycles, stats.idle_waiting_cycles
            );
        }
        Err(err) => {
            eprintln!("simulation failed: {:#}", err);
            std::process::exit(1);
        }
    }
}
