use agscreen::aggregate::{aggregate, write_joined};
use agscreen::cli::JoinArgs;
use agscreen::logging;
use clap::Parser;
use log::info;

fn main() -> anyhow::Result<()> {
    logging::init_console();
    let args = JoinArgs::parse();

    let table = aggregate(&args.library, &args.counts_dir)?;
    let path = write_joined(&table, &args.counts_dir)?;
    info!("Output written to: {}", path.display());
    Ok(())
}
