use crate::error::SetupError;
use crate::role::Role;
use std::{env, net::Ipv4Addr, sync::OnceLock};

pub const ENV_FILE_PATH: &str = "/etc/k3up/k3up.env";
pub const DEFAULT_WG_PORT: u16 = 51820;
pub const DEFAULT_WG_NETWORK: &str = "10.220.0.0/24";
// Conventional address of the first master on the LAN, used as the
// reachability probe target unless MASTER_PUBLIC_IP overrides it.
pub const DEFAULT_MASTER_LAN_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 81);

#[derive(Debug)]
pub struct Config {
	pub role: Role,
	pub vpn_enabled: bool,
	pub vpn_port: u16,
	pub vpn_network: String,
	pub vpn_self: Option<Ipv4Addr>,
	pub master_url: Option<String>,
	pub master_probe_ip: Ipv4Addr,
	pub join_token: Option<String>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

fn var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn parse_bool(val: &str) -> bool {
	matches!(val.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, SetupError> {
	match var(name) {
		None => Ok(None),
		Some(val) => val
			.trim()
			.parse::<T>()
			.map(Some)
			.map_err(|_| SetupError::Config(format!("Unparseable value for {name}: {val:?}"))),
	}
}

pub fn init(role: Role) -> Result<(), SetupError> {
	if let Err(err) = dotenvy::from_path(ENV_FILE_PATH) {
		if !err.not_found() {
			return Err(SetupError::Config(format!(
				"Failed to load {ENV_FILE_PATH}: {err}"
			)));
		}
	}
	let config = Config {
		role,
		vpn_enabled: var("WG_ENABLED").is_some_and(|val| parse_bool(&val)),
		vpn_port: parse_var::<u16>("WG_PORT")?.unwrap_or(DEFAULT_WG_PORT),
		vpn_network: var("WG_NETWORK").unwrap_or_else(|| DEFAULT_WG_NETWORK.to_owned()),
		vpn_self: parse_var("WG_SELF")?,
		master_url: var("MASTER_URL"),
		master_probe_ip: parse_var("MASTER_PUBLIC_IP")?.unwrap_or(DEFAULT_MASTER_LAN_IP),
		join_token: var("K3S_TOKEN"),
	};
	CONFIG.set(config).expect("Fatal config initialization.");
	Ok(())
}

pub fn get() -> &'static Config {
	CONFIG.get().expect("Fatal failure to get config.")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_bool_accepts_common_truthy_values() {
		for val in ["1", "true", "TRUE", "yes", "on"] {
			assert!(parse_bool(val), "{val} should be truthy");
		}
		for val in ["0", "false", "no", "off", ""] {
			assert!(!parse_bool(val), "{val} should be falsy");
		}
	}
}
