use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = minkowski_grid::config::Config::parse();
    if cfg.list_devices {
        minkowski_grid::audio::list_input_devices()?;
        return Ok(());
    }

    minkowski_grid::logging::init_tracing(cfg.log_file.as_deref())?;
    minkowski_grid::app::run(cfg)
}
