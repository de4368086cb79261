use std::{
	net::{IpAddr, SocketAddr, TcpStream},
	time::Duration,
};
use tracing::info;

pub const API_PORT: u16 = 6443;
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Seam for the reachability check so the selection chain is testable
/// without a live network.
pub trait Reachability {
	fn is_reachable(&self, addr: SocketAddr) -> bool;
}

pub struct TcpProbe {
	pub timeout: Duration,
}

impl Default for TcpProbe {
	fn default() -> Self {
		TcpProbe {
			timeout: PROBE_TIMEOUT,
		}
	}
}

impl Reachability for TcpProbe {
	fn is_reachable(&self, addr: SocketAddr) -> bool {
		TcpStream::connect_timeout(&addr, self.timeout).is_ok()
	}
}

pub fn api_url(addr: IpAddr) -> String {
	format!("https://{addr}:{API_PORT}")
}

/// Picks the address used to reach the cluster API. First match wins:
/// explicit override, probed master LAN address, VPN self-address, then the
/// local LAN IP (only meaningful when this node is becoming the master).
/// No state is mutated; calling twice with the same inputs is safe.
pub fn select_master_endpoint(
	override_url: Option<&str>,
	probe_target: IpAddr,
	vpn_self: Option<IpAddr>,
	lan_ip: IpAddr,
	probe: &dyn Reachability,
) -> String {
	if let Some(url) = override_url {
		info!("Using explicit master URL: {url}");
		return url.to_owned();
	}
	if probe.is_reachable(SocketAddr::new(probe_target, API_PORT)) {
		info!("Master reachable on the LAN at {probe_target}.");
		return api_url(probe_target);
	}
	if let Some(vpn_addr) = vpn_self {
		info!("Falling back to the VPN address {vpn_addr}.");
		return api_url(vpn_addr);
	}
	info!("Falling back to the local LAN IP {lan_ip} (self-bootstrap).");
	api_url(lan_ip)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::Ipv4Addr;

	struct Always(bool);

	impl Reachability for Always {
		fn is_reachable(&self, _addr: SocketAddr) -> bool {
			self.0
		}
	}

	const PROBE_TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 81));
	const VPN_SELF: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 220, 0, 7));
	const LAN_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 81));

	#[test]
	fn explicit_override_beats_everything() {
		let url = select_master_endpoint(
			Some("https://1.2.3.4:6443"),
			PROBE_TARGET,
			Some(VPN_SELF),
			LAN_IP,
			&Always(true),
		);
		assert_eq!(url, "https://1.2.3.4:6443");
	}

	#[test]
	fn successful_probe_beats_vpn_and_lan() {
		let url = select_master_endpoint(None, PROBE_TARGET, Some(VPN_SELF), LAN_IP, &Always(true));
		assert_eq!(url, "https://10.0.0.81:6443");
	}

	#[test]
	fn vpn_address_beats_lan_fallback() {
		let url =
			select_master_endpoint(None, PROBE_TARGET, Some(VPN_SELF), LAN_IP, &Always(false));
		assert_eq!(url, "https://10.220.0.7:6443");
	}

	#[test]
	fn lan_ip_is_the_last_resort() {
		let url = select_master_endpoint(None, PROBE_TARGET, None, LAN_IP, &Always(false));
		assert_eq!(url, "https://192.168.0.81:6443");
	}

	#[test]
	fn selection_is_repeatable() {
		let first = select_master_endpoint(None, PROBE_TARGET, None, LAN_IP, &Always(false));
		let second = select_master_endpoint(None, PROBE_TARGET, None, LAN_IP, &Always(false));
		assert_eq!(first, second);
	}
}
