use crate::error::SetupError;
use std::{net::Ipv4Addr, process::Command, sync::OnceLock};

/// Network identity of this host, probed once at startup.
#[derive(Debug)]
pub struct Context {
	pub hostname: String,
	pub lan_interface: String,
	pub lan_ip: Ipv4Addr,
	pub subnet_cidr: String,
	pub gateway: Ipv4Addr,
}

static CONTEXT: OnceLock<Context> = OnceLock::new();

fn command_stdout(cmd: &str, args: &[&str]) -> Result<String, SetupError> {
	let full_cmd = format!("{cmd} {}", args.join(" "));
	let output = Command::new(cmd)
		.args(args)
		.output()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: full_cmd.clone(),
			source,
		})?;
	if !output.status.success() {
		let stderr = if output.stderr.is_empty() {
			None
		} else {
			Some(String::from_utf8_lossy(&output.stderr).trim().to_owned())
		};
		return Err(SetupError::CommandFailed {
			cmd: full_cmd,
			status: output.status,
			stderr,
		});
	}
	Ok(String::from_utf8(output.stdout)?)
}

/// Parses `ip -4 route show default` output into (gateway, interface).
fn parse_default_route(route_txt: &str) -> Option<(Ipv4Addr, String)> {
	let fields = route_txt
		.lines()
		.find(|line| line.starts_with("default"))?
		.split_whitespace()
		.collect::<Vec<&str>>();
	let gateway = fields
		.iter()
		.position(|field| *field == "via")
		.and_then(|pos| fields.get(pos + 1))
		.and_then(|addr| addr.parse::<Ipv4Addr>().ok())?;
	let interface = fields
		.iter()
		.position(|field| *field == "dev")
		.and_then(|pos| fields.get(pos + 1))
		.map(|dev| (*dev).to_owned())?;
	Some((gateway, interface))
}

/// Parses a single `ip -4 -o addr show` line into (address, prefix length).
fn parse_addr_line(addr_txt: &str) -> Option<(Ipv4Addr, u8)> {
	let fields = addr_txt.split_whitespace().collect::<Vec<&str>>();
	let cidr = fields
		.iter()
		.position(|field| *field == "inet")
		.and_then(|pos| fields.get(pos + 1))?;
	let (addr, prefix) = cidr.split_once('/')?;
	let prefix = prefix.parse::<u8>().ok().filter(|prefix| *prefix <= 32)?;
	Some((addr.parse().ok()?, prefix))
}

fn network_cidr(addr: Ipv4Addr, prefix: u8) -> String {
	let mask = if prefix == 0 {
		0
	} else {
		u32::MAX << (32 - u32::from(prefix))
	};
	let network = Ipv4Addr::from(u32::from(addr) & mask);
	format!("{network}/{prefix}")
}

pub fn init() -> Result<(), SetupError> {
	let hostname = command_stdout("hostname", &["-f"])?.trim().to_owned();
	if hostname.is_empty() {
		return Err(SetupError::Config("Could not resolve hostname.".to_owned()));
	}
	let route_txt = command_stdout("ip", &["-4", "route", "show", "default"])?;
	let (gateway, lan_interface) = parse_default_route(&route_txt)
		.ok_or_else(|| SetupError::Config(format!("No default route found in: {route_txt:?}")))?;
	let addr_txt = command_stdout("ip", &["-4", "-o", "addr", "show", "dev", &lan_interface])?;
	let (lan_ip, prefix) = parse_addr_line(&addr_txt).ok_or_else(|| {
		SetupError::Config(format!("No address found on interface {lan_interface}."))
	})?;
	let context = Context {
		hostname,
		lan_interface,
		lan_ip,
		subnet_cidr: network_cidr(lan_ip, prefix),
		gateway,
	};
	CONTEXT.set(context).expect("Fatal context initialization.");
	Ok(())
}

pub fn get() -> &'static Context {
	CONTEXT.get().expect("Fatal failure to get context.")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_default_route_extracts_gateway_and_device() {
		let route_txt = "default via 192.168.0.1 dev wlo1 proto dhcp src 192.168.0.81 metric 600";
		let (gateway, interface) = parse_default_route(route_txt).unwrap();
		assert_eq!(gateway, Ipv4Addr::new(192, 168, 0, 1));
		assert_eq!(interface, "wlo1");
	}

	#[test]
	fn parse_default_route_rejects_non_default_routes() {
		assert!(parse_default_route("192.168.0.0/24 dev wlo1 proto kernel scope link").is_none());
		assert!(parse_default_route("").is_none());
	}

	#[test]
	fn parse_addr_line_extracts_address_and_prefix() {
		let addr_txt =
			"3: wlo1    inet 192.168.0.81/24 brd 192.168.0.255 scope global dynamic wlo1";
		let (addr, prefix) = parse_addr_line(addr_txt).unwrap();
		assert_eq!(addr, Ipv4Addr::new(192, 168, 0, 81));
		assert_eq!(prefix, 24);
	}

	#[test]
	fn parse_addr_line_rejects_out_of_range_prefixes() {
		assert!(parse_addr_line("3: wlo1    inet 192.168.0.81/40 scope global").is_none());
		assert!(parse_addr_line("3: wlo1    inet 192.168.0.81/abc scope global").is_none());
	}

	#[test]
	fn network_cidr_masks_host_bits() {
		assert_eq!(
			network_cidr(Ipv4Addr::new(192, 168, 0, 81), 24),
			"192.168.0.0/24"
		);
		assert_eq!(
			network_cidr(Ipv4Addr::new(10, 1, 2, 3), 16),
			"10.1.0.0/16"
		);
	}
}
