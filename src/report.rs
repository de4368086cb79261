use crate::config;
use crate::context;
use crate::error::SetupError;
use crate::role::Role;
use crate::setup::steps::wireguard;
use crate::state::{JoinState, STATE_PATH};
use std::fs;

pub const REPORT_PATH: &str = "/var/log/k3up-report.txt";

#[derive(Debug)]
pub struct Summary {
	pub hostname: String,
	pub role: Role,
	pub lan_interface: String,
	pub lan_ip: String,
	pub subnet_cidr: String,
	pub gateway: String,
	pub vpn_self: Option<String>,
	pub vpn_public_key: Option<String>,
	pub master_url: Option<String>,
}

impl Summary {
	pub fn collect() -> Result<Self, SetupError> {
		let config = config::get();
		let context = context::get();
		let state = JoinState::load(STATE_PATH)?;
		let vpn_self = config
			.vpn_enabled
			.then(wireguard::self_address)
			.transpose()?
			.map(|addr| addr.to_string());
		Ok(Summary {
			hostname: context.hostname.clone(),
			role: config.role,
			lan_interface: context.lan_interface.clone(),
			lan_ip: context.lan_ip.to_string(),
			subnet_cidr: context.subnet_cidr.clone(),
			gateway: context.gateway.to_string(),
			vpn_self,
			vpn_public_key: config.vpn_enabled.then(wireguard::current_public_key).flatten(),
			master_url: state.master_url,
		})
	}

	pub fn render(&self) -> String {
		let role = match self.role {
			Role::Master => "master",
			Role::Worker => "worker",
		};
		let mut lines = vec![
			"k3up node setup complete".to_owned(),
			format!("  hostname:   {}", self.hostname),
			format!("  role:       {role}"),
			format!("  lan ip:     {} ({})", self.lan_ip, self.lan_interface),
			format!("  subnet:     {} via {}", self.subnet_cidr, self.gateway),
		];
		if let Some(vpn_self) = &self.vpn_self {
			lines.push(format!("  mesh ip:    {vpn_self}"));
		}
		if let Some(vpn_public_key) = &self.vpn_public_key {
			lines.push(format!("  mesh key:   {vpn_public_key}"));
		}
		if let Some(master_url) = &self.master_url {
			lines.push(format!("  master url: {master_url}"));
			lines.push(format!("  join material: {STATE_PATH}"));
		}
		lines.join("\n") + "\n"
	}
}

pub fn write() -> Result<(), SetupError> {
	let rendered = Summary::collect()?.render();
	print!("{rendered}");
	fs::write(REPORT_PATH, rendered)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn render_includes_join_material_for_initialized_masters() {
		let summary = Summary {
			hostname: "node-a.example".to_owned(),
			role: Role::Master,
			lan_interface: "wlo1".to_owned(),
			lan_ip: "192.168.0.81".to_owned(),
			subnet_cidr: "192.168.0.0/24".to_owned(),
			gateway: "192.168.0.1".to_owned(),
			vpn_self: Some("10.220.0.7".to_owned()),
			vpn_public_key: Some("nodeAPublicKey=".to_owned()),
			master_url: Some("https://10.220.0.7:6443".to_owned()),
		};
		let rendered = summary.render();
		assert!(rendered.contains("role:       master"));
		assert!(rendered.contains("mesh ip:    10.220.0.7"));
		assert!(rendered.contains("mesh key:   nodeAPublicKey="));
		assert!(rendered.contains("master url: https://10.220.0.7:6443"));
		assert!(rendered.contains(STATE_PATH));
	}

	#[test]
	fn render_omits_absent_fields() {
		let summary = Summary {
			hostname: "node-b.example".to_owned(),
			role: Role::Worker,
			lan_interface: "eth0".to_owned(),
			lan_ip: "192.168.0.82".to_owned(),
			subnet_cidr: "192.168.0.0/24".to_owned(),
			gateway: "192.168.0.1".to_owned(),
			vpn_self: None,
			vpn_public_key: None,
			master_url: None,
		};
		let rendered = summary.render();
		assert!(rendered.contains("role:       worker"));
		assert!(!rendered.contains("mesh ip"));
		assert!(!rendered.contains("mesh key"));
		assert!(!rendered.contains("master url"));
	}
}
