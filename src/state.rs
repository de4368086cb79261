use crate::error::SetupError;
use std::{fs, io, path::Path};

pub const STATE_PATH: &str = "/etc/k3up/state.env";

const MASTER_URL_KEY: &str = "MASTER_URL";
const JOIN_TOKEN_KEY: &str = "K3S_TOKEN";
const VPN_SELF_KEY: &str = "WG_SELF";

/// Join material persisted by a successful cluster initialization and read
/// back on every subsequent run. Owned exclusively by this node; the operator
/// copies the token to other nodes out-of-band.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinState {
	pub master_url: Option<String>,
	pub join_token: Option<String>,
	pub vpn_self: Option<String>,
}

impl JoinState {
	pub fn parse(state_txt: &str) -> Self {
		let mut state = JoinState::default();
		for line in state_txt.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let Some((key, value)) = line.split_once('=') else {
				continue;
			};
			let value = value.trim();
			let slot = match key.trim() {
				MASTER_URL_KEY => &mut state.master_url,
				JOIN_TOKEN_KEY => &mut state.join_token,
				VPN_SELF_KEY => &mut state.vpn_self,
				_ => continue,
			};
			if !value.is_empty() {
				*slot = Some(value.to_owned());
			}
		}
		state
	}

	pub fn render(&self) -> String {
		let mut lines = Vec::new();
		for (key, value) in [
			(MASTER_URL_KEY, &self.master_url),
			(JOIN_TOKEN_KEY, &self.join_token),
			(VPN_SELF_KEY, &self.vpn_self),
		] {
			if let Some(value) = value {
				lines.push(format!("{key}={value}"));
			}
		}
		lines.join("\n") + "\n"
	}

	/// Missing file reads as empty state; a first run has nothing persisted.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
		match fs::read_to_string(path) {
			Ok(state_txt) => Ok(JoinState::parse(&state_txt)),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(JoinState::default()),
			Err(err) => Err(err.into()),
		}
	}

	pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SetupError> {
		if let Some(dir) = path.as_ref().parent() {
			fs::create_dir_all(dir)?;
		}
		fs::write(path, self.render())?;
		Ok(())
	}

	/// Environment-supplied values take precedence over persisted ones.
	pub fn overlaid(
		&self,
		master_url: Option<&str>,
		join_token: Option<&str>,
		vpn_self: Option<&str>,
	) -> Self {
		JoinState {
			master_url: master_url.map(str::to_owned).or_else(|| self.master_url.clone()),
			join_token: join_token.map(str::to_owned).or_else(|| self.join_token.clone()),
			vpn_self: vpn_self.map(str::to_owned).or_else(|| self.vpn_self.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_reads_known_keys() {
		let state = JoinState::parse(
			"MASTER_URL=https://10.0.0.81:6443\nK3S_TOKEN=abc123\nWG_SELF=10.220.0.7\n",
		);
		assert_eq!(state.master_url.as_deref(), Some("https://10.0.0.81:6443"));
		assert_eq!(state.join_token.as_deref(), Some("abc123"));
		assert_eq!(state.vpn_self.as_deref(), Some("10.220.0.7"));
	}

	#[test]
	fn parse_ignores_comments_blanks_and_unknown_keys() {
		let state = JoinState::parse("# comment\n\nOTHER=1\nK3S_TOKEN=tok\n");
		assert_eq!(state.master_url, None);
		assert_eq!(state.join_token.as_deref(), Some("tok"));
	}

	#[test]
	fn parse_treats_empty_values_as_absent() {
		let state = JoinState::parse("MASTER_URL=\nK3S_TOKEN=\n");
		assert_eq!(state, JoinState::default());
	}

	#[test]
	fn render_parse_round_trips() {
		let state = JoinState {
			master_url: Some("https://10.0.0.81:6443".to_owned()),
			join_token: Some("abc123".to_owned()),
			vpn_self: None,
		};
		assert_eq!(JoinState::parse(&state.render()), state);
	}

	#[test]
	fn overlaid_prefers_environment_values() {
		let persisted = JoinState {
			master_url: Some("https://10.0.0.81:6443".to_owned()),
			join_token: Some("old".to_owned()),
			vpn_self: Some("10.220.0.7".to_owned()),
		};
		let merged = persisted.overlaid(None, Some("new"), None);
		assert_eq!(merged.master_url.as_deref(), Some("https://10.0.0.81:6443"));
		assert_eq!(merged.join_token.as_deref(), Some("new"));
		assert_eq!(merged.vpn_self.as_deref(), Some("10.220.0.7"));
	}
}
