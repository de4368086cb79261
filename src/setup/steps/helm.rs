use crate::config;
use crate::error::SetupError;
use crate::role::Role;
use crate::setup::utils::pkg;
use crate::setup::SetupStep;
use std::{fs, process::Command};
use tracing::info;

pub struct Helm;

impl Helm {
	pub const PACKAGE_NAME: &str = "helm";
	pub const DEPENDENCIES: &[&str] = &["apt-transport-https"];
	pub const BASE_KEY_URL: &str = "https://packages.buildkite.com/helm-linux/helm-debian";
	pub const APT_KEY_PATH: &str = "/usr/share/keyrings/helm.gpg";
	pub const APT_CONFIG_PATH: &str = "/etc/apt/sources.list.d/helm-stable-debian.list";

	fn apt_source_entry() -> String {
		format!(
			"deb [signed-by={}] {}/any/ any main",
			Helm::APT_KEY_PATH,
			Helm::BASE_KEY_URL,
		)
	}
}

impl SetupStep for Helm {
	fn name(&self) -> &'static str {
		"Helm"
	}

	fn check(&self) -> Result<bool, SetupError> {
		if config::get().role == Role::Worker {
			info!("This node is a worker, helm is not required.");
			return Ok(true);
		}
		if pkg::is_installed(Helm::PACKAGE_NAME)? {
			info!("Helm is already installed.");
			Ok(true)
		} else {
			info!("Helm is not installed.");
			Ok(false)
		}
	}

	fn set(&self) -> Result<(), SetupError> {
		info!("Installing Helm.");
		pkg::install(Helm::DEPENDENCIES)?;
		let key_command = format!(
			"curl -fsSL {}/gpgkey | gpg --dearmor --yes -o {}",
			Helm::BASE_KEY_URL,
			Helm::APT_KEY_PATH,
		);
		let status = Command::new("sh")
			.arg("-c")
			.arg(&key_command)
			.status()
			.map_err(|source| SetupError::CommandLaunch {
				cmd: key_command.clone(),
				source,
			})?;
		if !status.success() {
			return Err(SetupError::CommandFailed {
				cmd: key_command,
				status,
				stderr: None,
			});
		}
		fs::write(Helm::APT_CONFIG_PATH, Helm::apt_source_entry())?;
		pkg::update()?;
		pkg::install(&[Helm::PACKAGE_NAME])?;
		info!("Helm has been installed.");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn apt_source_entry_points_at_the_signed_helm_repo() {
		assert_eq!(
			Helm::apt_source_entry(),
			"deb [signed-by=/usr/share/keyrings/helm.gpg] \
			 https://packages.buildkite.com/helm-linux/helm-debian/any/ any main"
		);
	}
}
