use crate::config;
use crate::error::SetupError;
use crate::setup::utils::pkg;
use crate::setup::SetupStep;
use tracing::info;

pub struct Packages;

impl Packages {
	// open-iscsi and nfs-common are Longhorn host prerequisites.
	pub const BASE_PACKAGES: &[&str] = &["curl", "open-iscsi", "nfs-common"];
	pub const VPN_PACKAGE: &str = "wireguard";

	fn required() -> Vec<&'static str> {
		let mut packages = Packages::BASE_PACKAGES.to_vec();
		if config::get().vpn_enabled {
			packages.push(Packages::VPN_PACKAGE);
		}
		packages
	}
}

impl SetupStep for Packages {
	fn name(&self) -> &'static str {
		"Packages"
	}

	fn check(&self) -> Result<bool, SetupError> {
		for package_name in Packages::required() {
			if !pkg::is_installed(package_name)? {
				info!("{package_name} is not installed.");
				return Ok(false);
			}
		}
		info!("Prerequisite packages are installed.");
		Ok(true)
	}

	fn set(&self) -> Result<(), SetupError> {
		info!("Installing prerequisite packages.");
		pkg::update()?;
		pkg::install(&Packages::required())?;
		info!("Prerequisite packages installed.");
		Ok(())
	}
}
