use crate::error::SetupError;
use crate::setup::utils::kctl;
use std::process::{Command, Stdio};

fn helm_status(args: &[&str]) -> Result<(), SetupError> {
	let full_cmd = format!("helm {}", args.join(" "));
	let status = Command::new("helm")
		.env("KUBECONFIG", kctl::KUBECONFIG)
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

pub fn repo_add(name: &str, url: &str) -> Result<(), SetupError> {
	helm_status(&["repo", "add", name, url, "--force-update"])?;
	helm_status(&["repo", "update", name])
}

pub fn upgrade_install(
	release: &str,
	chart: &str,
	namespace: &str,
	values_path: &str,
) -> Result<(), SetupError> {
	helm_status(&[
		"upgrade",
		"--install",
		release,
		chart,
		"--namespace",
		namespace,
		"--create-namespace",
		"--values",
		values_path,
	])
}

/// A missing or broken helm binary reads as "not available" rather than an
/// error, so presence checks can fall through to provisioning.
pub fn is_available() -> bool {
	Command::new("helm")
		.arg("version")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.is_ok_and(|status| status.success())
}

pub fn is_release_installed(release: &str, namespace: &str) -> Result<bool, SetupError> {
	let status = Command::new("helm")
		.env("KUBECONFIG", kctl::KUBECONFIG)
		.args(["status", release])
		.args(["--namespace", namespace])
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.map_err(|source| SetupError::CommandLaunch {
			cmd: format!("helm status {release} --namespace {namespace}"),
			source,
		})?;
	Ok(status.success())
}
