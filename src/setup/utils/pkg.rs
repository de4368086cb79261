use crate::error::SetupError;
use std::process::Command;

pub enum PkgManager {
	Apt,
}

fn get_pkg_manager() -> PkgManager {
	PkgManager::Apt
}

pub fn is_installed(package_name: &str) -> Result<bool, SetupError> {
	let installed;
	match get_pkg_manager() {
		PkgManager::Apt => {
			let output = Command::new("dpkg-query")
				.args(["-W", "-f=${Status}", package_name])
				.output()
				.map_err(|source| SetupError::CommandLaunch {
					cmd: format!("dpkg-query -W -f=${{Status}} {package_name}"),
					source,
				})?;
			if !output.status.success() {
				return Ok(false);
			}
			let stdout = String::from_utf8_lossy(&output.stdout);
			let status = stdout.trim();
			installed = status == "install ok installed" || status == "hold ok installed";
		}
	}
	Ok(installed)
}

pub fn update() -> Result<(), SetupError> {
	match get_pkg_manager() {
		PkgManager::Apt => {
			let status = Command::new("apt-get")
				.arg("update")
				.status()
				.map_err(|source| SetupError::CommandLaunch {
					cmd: "apt-get update".to_owned(),
					source,
				})?;
			if !status.success() {
				return Err(SetupError::CommandFailed {
					cmd: "apt-get update".to_owned(),
					status,
					stderr: None,
				});
			}
		}
	}
	Ok(())
}

pub fn install(package_names: &[&str]) -> Result<(), SetupError> {
	match get_pkg_manager() {
		PkgManager::Apt => {
			let args = ["install", "-y", "--no-install-recommends"];
			let cmd = format!(
				"apt-get install -y --no-install-recommends {}",
				package_names.join(" ")
			);
			let status = Command::new("apt-get")
				.args(args.iter().chain(package_names.iter()))
				.status()
				.map_err(|source| SetupError::CommandLaunch {
					cmd: cmd.clone(),
					source,
				})?;
			if !status.success() {
				return Err(SetupError::CommandFailed {
					cmd,
					status,
					stderr: None,
				});
			}
		}
	}
	Ok(())
}
