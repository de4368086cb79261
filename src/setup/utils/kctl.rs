use crate::error::SetupError;
use std::{
	io::Write,
	process::{Command, Stdio},
	thread::sleep,
	time::Duration,
};
use tracing::{info, warn};

// k3s writes its admin kubeconfig here.
pub const KUBECONFIG: &str = "/etc/rancher/k3s/k3s.yaml";

pub const READINESS_ATTEMPTS: u32 = 60;
pub const READINESS_INTERVAL: Duration = Duration::from_secs(2);

fn kubectl_status(args: &[&str]) -> Result<(), SetupError> {
	let full_cmd = format!("kubectl {}", args.join(" "));
	let status = Command::new("kubectl")
		.args(["--kubeconfig", KUBECONFIG])
		.args(args)
		.status()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: full_cmd.clone(),
			source,
		})?;
	if !status.success() {
		return Err(SetupError::CommandFailed {
			cmd: full_cmd,
			status,
			stderr: None,
		});
	}
	Ok(())
}

pub fn apply_url(manifest_url: &str) -> Result<(), SetupError> {
	kubectl_status(&["apply", "-f", manifest_url])
}

pub fn apply_yaml(yaml: &str) -> Result<(), SetupError> {
	let mut child = Command::new("kubectl")
		.args(["--kubeconfig", KUBECONFIG])
		.args(["apply", "-f", "-"])
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: "kubectl apply -f -".to_owned(),
			source,
		})?;
	let stdin = child
		.stdin
		.as_mut()
		.ok_or_else(|| SetupError::Kube("Failed to open stdin for kubectl apply.".to_owned()))?;
	stdin.write_all(yaml.as_bytes())?;
	let output = child
		.wait_with_output()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: "kubectl apply -f -".to_owned(),
			source,
		})?;
	if !output.status.success() {
		let stderr = Some(String::from_utf8_lossy(&output.stderr).trim().to_owned());
		return Err(SetupError::CommandFailed {
			cmd: "kubectl apply -f -".to_owned(),
			status: output.status,
			stderr,
		});
	}
	Ok(())
}

pub fn is_deployment_installed(name: &str, namespace: &str) -> Result<bool, SetupError> {
	let status = Command::new("kubectl")
		.args(["--kubeconfig", KUBECONFIG])
		.args(["get", "deployment", name])
		.args(["-n", namespace])
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: format!("kubectl get deployment {name} -n {namespace}"),
			source,
		})?;
	Ok(status.success())
}

fn api_responds() -> bool {
	Command::new("kubectl")
		.args(["--kubeconfig", KUBECONFIG])
		.args(["get", "nodes"])
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.is_ok_and(|status| status.success())
}

/// Best-effort wait for the cluster API. Exhausting the attempt budget is a
/// warning only; the add-on applies that follow fail loudly on their own if
/// the API is truly unreachable.
pub fn wait_for_api() {
	info!("Waiting for the cluster API to respond.");
	for attempt in 1..=READINESS_ATTEMPTS {
		if api_responds() {
			info!("Cluster API is responding (attempt {attempt}).");
			return;
		}
		sleep(READINESS_INTERVAL);
	}
	warn!(
		"Cluster API did not respond within {} attempts, proceeding anyway.",
		READINESS_ATTEMPTS
	);
}
