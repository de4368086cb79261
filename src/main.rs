mod config;
mod context;
mod endpoint;
mod error;
mod logging;
mod report;
mod role;
mod setup;
mod state;

use clap::Parser;
use error::SetupError;
use role::Role;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "k3up", about = "Bootstraps a k3s cluster node.")]
struct Cli {
	/// Cluster role of this node.
	#[arg(long, value_enum, default_value = "worker")]
	role: Role,
}

fn run(cli: &Cli) -> Result<(), SetupError> {
	config::init(cli.role)?;
	context::init()?;
	setup::setup()?;
	report::write()?;
	Ok(())
}

fn main() {
	let cli = Cli::parse();
	logging::init();
	info!("Node setup started.");
	if let Err(err) = run(&cli) {
		error!("Installer failed: {}", err);
		std::process::exit(1);
	}
	info!("Node setup finished successfully.");
}
