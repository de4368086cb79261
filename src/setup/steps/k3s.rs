use crate::config;
use crate::context;
use crate::endpoint::{self, TcpProbe};
use crate::error::SetupError;
use crate::role::{self, Action};
use crate::setup::steps::wireguard;
use crate::setup::utils::kctl;
use crate::setup::SetupStep;
use crate::state::{JoinState, STATE_PATH};
use std::{
	fs,
	net::{IpAddr, Ipv4Addr},
	process::Command,
};
use tracing::info;

pub struct K3s;

impl K3s {
	pub const INSTALLER_URL: &str = "https://get.k3s.io";
	pub const SERVER_SERVICE: &str = "k3s";
	pub const AGENT_SERVICE: &str = "k3s-agent";
	pub const NODE_TOKEN_PATH: &str = "/var/lib/rancher/k3s/server/node-token";
}

fn service_active(service: &str) -> bool {
	Command::new("systemctl")
		.args(["is-active", "--quiet", service])
		.status()
		.is_ok_and(|status| status.success())
}

pub fn has_existing_installation() -> bool {
	service_active(K3s::SERVER_SERVICE) || service_active(K3s::AGENT_SERVICE)
}

/// Persisted join state with environment-supplied values layered on top.
fn effective_join_state() -> Result<JoinState, SetupError> {
	let config = config::get();
	let persisted = JoinState::load(STATE_PATH)?;
	let vpn_self = config.vpn_self.map(|addr| addr.to_string());
	Ok(persisted.overlaid(
		config.master_url.as_deref(),
		config.join_token.as_deref(),
		vpn_self.as_deref(),
	))
}

/// Address this node advertises to the cluster: the mesh address when the
/// VPN carries cluster traffic, the LAN IP otherwise.
fn advertise_ip() -> Result<Ipv4Addr, SetupError> {
	if config::get().vpn_enabled {
		wireguard::self_address()
	} else {
		Ok(context::get().lan_ip)
	}
}

fn run_installer(exec: Option<&str>, envs: &[(&str, String)]) -> Result<(), SetupError> {
	let cmd = format!("curl -sfL {} | sh -", K3s::INSTALLER_URL);
	let mut installer = Command::new("sh");
	installer.arg("-c").arg(&cmd);
	if let Some(exec) = exec {
		installer.env("INSTALL_K3S_EXEC", exec);
	}
	for (key, value) in envs {
		installer.env(key, value);
	}
	let status = installer
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
	Ok(())
}

fn node_flags() -> Result<String, SetupError> {
	if !config::get().vpn_enabled {
		return Ok(String::new());
	}
	let mesh_ip = wireguard::self_address()?;
	Ok(format!(
		" --node-ip {mesh_ip} --flannel-iface {}",
		wireguard::Wireguard::INTERFACE
	))
}

fn initialize_cluster() -> Result<(), SetupError> {
	info!("Initializing a new cluster; this node becomes the first control-plane member.");
	let exec = format!(
		"server --cluster-init --write-kubeconfig-mode 644{}",
		node_flags()?
	);
	run_installer(Some(&exec), &[])?;
	kctl::wait_for_api();
	let join_token = fs::read_to_string(K3s::NODE_TOKEN_PATH)?.trim().to_owned();
	if join_token.is_empty() {
		return Err(SetupError::Kube(format!(
			"k3s did not write a node token to {}.",
			K3s::NODE_TOKEN_PATH
		)));
	}
	let master_url = endpoint::api_url(IpAddr::V4(advertise_ip()?));
	let state = JoinState {
		master_url: Some(master_url.clone()),
		join_token: Some(join_token),
		vpn_self: config::get()
			.vpn_enabled
			.then(|| wireguard::self_address().map(|addr| addr.to_string()))
			.transpose()?,
	};
	state.save(STATE_PATH)?;
	info!("Cluster initialized at {master_url}; join material persisted to {STATE_PATH}.");
	Ok(())
}

fn join_cluster(action: Action, state: &JoinState) -> Result<(), SetupError> {
	// Validated before anything is installed; a missing token is an operator
	// error, not a retryable condition.
	let join_token = role::required_join_token(action, state)?.to_owned();
	let config = config::get();
	let vpn_self = if config.vpn_enabled {
		Some(IpAddr::V4(wireguard::self_address()?))
	} else {
		None
	};
	let master_url = endpoint::select_master_endpoint(
		state.master_url.as_deref(),
		IpAddr::V4(config.master_probe_ip),
		vpn_self,
		IpAddr::V4(context::get().lan_ip),
		&TcpProbe::default(),
	);
	let envs = [
		("K3S_URL", master_url.clone()),
		("K3S_TOKEN", join_token),
	];
	match action {
		Action::JoinAsControlPlane => {
			info!("Joining the control plane at {master_url}.");
			let exec = format!("server{}", node_flags()?);
			run_installer(Some(&exec), &envs)?;
			kctl::wait_for_api();
		}
		Action::JoinAsWorker => {
			info!("Joining as a worker via {master_url}.");
			let exec = format!("agent{}", node_flags()?);
			run_installer(Some(&exec), &envs)?;
		}
		Action::InitializeCluster | Action::SkipAlreadyInstalled => unreachable!(),
	}
	info!("Node joined the cluster.");
	Ok(())
}

impl SetupStep for K3s {
	fn name(&self) -> &'static str {
		"K3s"
	}

	fn check(&self) -> Result<bool, SetupError> {
		if has_existing_installation() {
			info!("k3s is already installed and running.");
			Ok(true)
		} else {
			info!("k3s is not installed.");
			Ok(false)
		}
	}

	fn set(&self) -> Result<(), SetupError> {
		let state = effective_join_state()?;
		match role::resolve(config::get().role, has_existing_installation(), &state) {
			Action::SkipAlreadyInstalled => {
				info!("k3s installation already present, nothing to do.");
				Ok(())
			}
			Action::InitializeCluster => initialize_cluster(),
			action @ (Action::JoinAsControlPlane | Action::JoinAsWorker) => {
				join_cluster(action, &state)
			}
		}
	}
}
