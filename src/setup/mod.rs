pub mod steps;
pub mod utils;

use crate::error::SetupError;
use crate::setup::steps::{Addons, Helm, K3s, Packages, Wireguard};
use tracing::info;

pub trait SetupStep {
	fn name(&self) -> &'static str;
	fn check(&self) -> Result<bool, SetupError>;
	fn set(&self) -> Result<(), SetupError>;
}

pub fn setup() -> Result<(), SetupError> {
	const SETUP_STEPS: &[&dyn SetupStep] = &[&Packages, &Helm, &Wireguard, &K3s, &Addons];
	for step in SETUP_STEPS {
		if step.check()? {
			info!("{} already set up, skipping.", step.name());
			continue;
		}
		step.set()?;
		if !step.check()? {
			return Err(SetupError::StepFailed { step: step.name() });
		}
	}
	Ok(())
}
