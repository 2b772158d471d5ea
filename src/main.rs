use anyhow::Context;
use clap::Parser;
use hmail::{init_logging, run, Cli, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _handle = init_logging(cli.log_level.into(), &cli.log_dir)?;
    let config = Config::load_from(&cli.get_config_path()).context("Failed to load config")?;
    run(cli, &config)?;
    Ok(())
}
