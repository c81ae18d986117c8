use capture_runner::addons::Addons;
use capture_runner::Cli;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    capture_runner::init_tracing()?;
    let cli = Cli::parse();
    capture_runner::execute(&cli, &mut Addons)?;
    Ok(())
}
