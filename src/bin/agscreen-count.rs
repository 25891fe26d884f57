use agscreen::cli::CountArgs;
use agscreen::command::exec::ProcessRunner;
use agscreen::config::Config;
use agscreen::context::RunContext;
use agscreen::logging;
use agscreen::pipeline::Orchestrator;
use clap::Parser;
use log::info;

fn main() -> anyhow::Result<()> {
    logging::init_console();
    let args = CountArgs::parse();

    let config = Config::load(args.config.as_deref())?;
    let (kind, backend) = config.backend(args.backend);
    let ctx = RunContext::create(args.run_options())?;
    ctx.log().info(&format!(
        "Sample {} ({} backend, {} threads)",
        ctx.sample, kind, ctx.threads
    ));

    let mut orchestrator = Orchestrator::new(&ctx, backend.as_ref(), ProcessRunner);
    let report = orchestrator.run()?;
    for (stage, status) in &report.stages {
        info!("{}: {:?}", stage, status);
    }
    Ok(())
}
