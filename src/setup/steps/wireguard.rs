use crate::config;
use crate::context;
use crate::error::SetupError;
use crate::setup::SetupStep;
use crate::state::{JoinState, STATE_PATH};
use sha2::{Digest, Sha256};
use std::{
	fs,
	io::Write as _,
	net::Ipv4Addr,
	path::Path,
	process::{Command, Stdio},
};
use tracing::info;

pub struct Wireguard;

impl Wireguard {
	pub const INTERFACE: &str = "wg0";
	pub const CONFIG_PATH: &str = "/etc/wireguard/wg0.conf";
	pub const SERVICE: &str = "wg-quick@wg0";
}

/// Deterministic default self-address: the first byte of SHA-256(hostname)
/// mapped into the host range 2..=254 of the mesh /24. Operators override it
/// with WG_SELF when two hostnames collide.
pub fn derive_self_address(hostname: &str, network_cidr: &str) -> Result<Ipv4Addr, SetupError> {
	let (network, prefix) = network_cidr
		.split_once('/')
		.ok_or_else(|| SetupError::Config(format!("Invalid VPN network: {network_cidr:?}")))?;
	let network = network
		.parse::<Ipv4Addr>()
		.map_err(|_| SetupError::Config(format!("Invalid VPN network: {network_cidr:?}")))?;
	if prefix != "24" {
		return Err(SetupError::Config(format!(
			"VPN network must be a /24 to derive addresses, got {network_cidr:?}. \
			 Set WG_SELF explicitly instead."
		)));
	}
	let host = 2 + Sha256::digest(hostname.as_bytes())[0] % 253;
	let octets = network.octets();
	Ok(Ipv4Addr::new(octets[0], octets[1], octets[2], host))
}

fn render_config(address: Ipv4Addr, private_key: &str, port: u16) -> String {
	format!(
		"[Interface]\nAddress = {address}/24\nPrivateKey = {private_key}\nListenPort = {port}\n"
	)
}

fn generate_private_key() -> Result<String, SetupError> {
	let output = Command::new("wg")
		.arg("genkey")
		.output()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: "wg genkey".to_owned(),
			source,
		})?;
	if !output.status.success() {
		return Err(SetupError::CommandFailed {
			cmd: "wg genkey".to_owned(),
			status: output.status,
			stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_owned()),
		});
	}
	Ok(String::from_utf8(output.stdout)?.trim().to_owned())
}

pub fn derive_public_key(private_key: &str) -> Result<String, SetupError> {
	let mut child = Command::new("wg")
		.arg("pubkey")
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: "wg pubkey".to_owned(),
			source,
		})?;
	let stdin = child
		.stdin
		.as_mut()
		.ok_or_else(|| SetupError::Config("Failed to open stdin for wg pubkey.".to_owned()))?;
	stdin.write_all(private_key.as_bytes())?;
	let output = child
		.wait_with_output()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: "wg pubkey".to_owned(),
			source,
		})?;
	if !output.status.success() {
		return Err(SetupError::CommandFailed {
			cmd: "wg pubkey".to_owned(),
			status: output.status,
			stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_owned()),
		});
	}
	Ok(String::from_utf8(output.stdout)?.trim().to_owned())
}

/// Public key of the active tunnel, for the operator's out-of-band peer
/// exchange. Absent when the tunnel is not up.
pub fn current_public_key() -> Option<String> {
	let output = Command::new("wg")
		.args(["show", Wireguard::INTERFACE, "public-key"])
		.output()
		.ok()?;
	if !output.status.success() {
		return None;
	}
	let key = String::from_utf8(output.stdout).ok()?.trim().to_owned();
	(!key.is_empty()).then_some(key)
}

/// Self-address precedence: WG_SELF env, then persisted state, then the
/// hostname-derived default.
pub fn self_address() -> Result<Ipv4Addr, SetupError> {
	let config = config::get();
	if let Some(addr) = config.vpn_self {
		return Ok(addr);
	}
	let persisted = JoinState::load(STATE_PATH)?;
	if let Some(addr) = persisted.vpn_self {
		return addr
			.parse()
			.map_err(|_| SetupError::Config(format!("Invalid persisted WG_SELF: {addr:?}")));
	}
	derive_self_address(&context::get().hostname, &config.vpn_network)
}

impl SetupStep for Wireguard {
	fn name(&self) -> &'static str {
		"Wireguard"
	}

	fn check(&self) -> Result<bool, SetupError> {
		if !config::get().vpn_enabled {
			info!("VPN is disabled, no WireGuard setup required.");
			return Ok(true);
		}
		if !Path::new(Wireguard::CONFIG_PATH).exists() {
			info!("WireGuard is not configured.");
			return Ok(false);
		}
		let is_active = Command::new("systemctl")
			.args(["is-active", "--quiet", Wireguard::SERVICE])
			.status()
			.is_ok_and(|status| status.success());
		if !is_active {
			info!("WireGuard tunnel is not active.");
			Ok(false)
		} else {
			info!("WireGuard tunnel is up.");
			Ok(true)
		}
	}

	fn set(&self) -> Result<(), SetupError> {
		let config = config::get();
		info!("Configuring the WireGuard mesh interface.");
		if !Path::new(Wireguard::CONFIG_PATH).exists() {
			let private_key = generate_private_key()?;
			let public_key = derive_public_key(&private_key)?;
			let address = self_address()?;
			info!("This node's mesh address is {address}, public key {public_key}.");
			fs::create_dir_all("/etc/wireguard")?;
			fs::write(
				Wireguard::CONFIG_PATH,
				render_config(address, &private_key, config.vpn_port),
			)?;
			// The config embeds the private key.
			let mut perms = fs::metadata(Wireguard::CONFIG_PATH)?.permissions();
			std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o600);
			fs::set_permissions(Wireguard::CONFIG_PATH, perms)?;
		} else {
			info!("WireGuard config already exists, keeping the existing key pair.");
		}
		let cmd = format!("systemctl enable --now {}", Wireguard::SERVICE);
		let status = Command::new("systemctl")
			.args(["enable", "--now", Wireguard::SERVICE])
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
		info!("WireGuard tunnel enabled.");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derived_address_is_stable_and_in_host_range() {
		let first = derive_self_address("node-a.example", "10.220.0.0/24").unwrap();
		let second = derive_self_address("node-a.example", "10.220.0.0/24").unwrap();
		assert_eq!(first, second);
		let host = first.octets()[3];
		assert!((2..=254).contains(&host));
		assert_eq!(first.octets()[..3], [10, 220, 0]);
	}

	#[test]
	fn derived_address_requires_a_slash_24() {
		assert!(derive_self_address("node-a", "10.220.0.0/16").is_err());
		assert!(derive_self_address("node-a", "not-a-network").is_err());
	}

	#[test]
	fn rendered_config_contains_interface_settings() {
		let rendered = render_config(Ipv4Addr::new(10, 220, 0, 7), "KEY", 51820);
		assert!(rendered.starts_with("[Interface]\n"));
		assert!(rendered.contains("Address = 10.220.0.7/24\n"));
		assert!(rendered.contains("PrivateKey = KEY\n"));
		assert!(rendered.contains("ListenPort = 51820\n"));
	}
}
