use agscreen::cli::IndexArgs;
use agscreen::command::exec::ProcessRunner;
use agscreen::config::Config;
use agscreen::context::{absolute, create_dir};
use agscreen::error::ConfigError;
use agscreen::index::{build_index, IndexLayout, IndexStatus};
use agscreen::logging::{self, RunLog};
use clap::Parser;
use log::info;

fn main() -> anyhow::Result<()> {
    logging::init_console();
    let args = IndexArgs::parse();

    if !args.library.is_file() {
        return Err(ConfigError::MissingInput(args.library).into());
    }
    let library = absolute(&args.library)?;
    let config = Config::load(args.config.as_deref())?;
    let (kind, backend) = config.backend(args.backend);

    let layout = IndexLayout::for_library(&library);
    create_dir(&layout.dir)?;
    let log = RunLog::open(&layout.log_path(&args.log))?;
    info!("Indexing {} with the {} backend", library.display(), kind);

    match build_index(&library, &layout, backend.as_ref(), &mut ProcessRunner, &log)? {
        IndexStatus::Present => info!("Index already present at {}", layout.prefix.display()),
        IndexStatus::Built => info!("Index built at {}", layout.prefix.display()),
    }
    Ok(())
}
