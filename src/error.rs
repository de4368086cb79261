use std::{io, process::ExitStatus, string::FromUtf8Error};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
	#[error("I/O error: {0}.")]
	Io(#[from] io::Error),

	#[error("Failed to execute command '{cmd}': {source}")]
	CommandLaunch {
		cmd: String,
		#[source]
		source: io::Error,
	},

	#[error("Command failed: {cmd}{}", stderr.as_deref().map(|err| format!(" ({err})")).unwrap_or_default())]
	CommandFailed {
		cmd: String,
		status: ExitStatus,
		stderr: Option<String>,
	},

	#[error("Step '{step}' failed after attempt to set it.")]
	StepFailed { step: &'static str },

	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("Kubernetes error: {0}")]
	Kube(String),

	#[error("String error: {0}.")]
	StringError(#[from] FromUtf8Error),
}
