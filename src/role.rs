use crate::error::SetupError;
use crate::state::JoinState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
	Master,
	Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	InitializeCluster,
	JoinAsControlPlane,
	JoinAsWorker,
	SkipAlreadyInstalled,
}

/// Decides the bootstrap action for this node. Pure: identical inputs always
/// yield the identical action. A master with no known cluster becomes the
/// first control-plane member; a master with any join material joins an
/// existing control plane; everything else joins as a worker.
pub fn resolve(role: Role, has_existing_installation: bool, state: &JoinState) -> Action {
	if has_existing_installation {
		return Action::SkipAlreadyInstalled;
	}
	match role {
		Role::Master if state.master_url.is_none() && state.join_token.is_none() => {
			Action::InitializeCluster
		}
		Role::Master => Action::JoinAsControlPlane,
		Role::Worker => Action::JoinAsWorker,
	}
}

/// Join actions require the shared token the first master generated. Checked
/// before any external installer is invoked; a missing token is an operator
/// configuration error, never retried.
pub fn required_join_token<'a>(
	action: Action,
	state: &'a JoinState,
) -> Result<&'a str, SetupError> {
	debug_assert!(matches!(
		action,
		Action::JoinAsControlPlane | Action::JoinAsWorker
	));
	state
		.join_token
		.as_deref()
		.filter(|token| !token.trim().is_empty())
		.ok_or_else(|| {
			SetupError::Config(
				"Join token is not set. Copy K3S_TOKEN from the first master \
				 (/var/lib/rancher/k3s/server/node-token) before joining."
					.to_owned(),
			)
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn state(master_url: Option<&str>, join_token: Option<&str>) -> JoinState {
		JoinState {
			master_url: master_url.map(str::to_owned),
			join_token: join_token.map(str::to_owned),
			vpn_self: None,
		}
	}

	#[test]
	fn master_with_no_join_material_initializes() {
		let action = resolve(Role::Master, false, &state(None, None));
		assert_eq!(action, Action::InitializeCluster);
	}

	#[test]
	fn master_with_any_join_material_joins_control_plane() {
		for join_state in [
			state(Some("https://10.0.0.81:6443"), Some("abc")),
			state(Some("https://10.0.0.81:6443"), None),
			state(None, Some("abc")),
		] {
			let action = resolve(Role::Master, false, &join_state);
			assert_eq!(action, Action::JoinAsControlPlane);
		}
	}

	#[test]
	fn worker_joins_regardless_of_join_material() {
		for join_state in [
			state(None, None),
			state(Some("https://10.0.0.81:6443"), Some("abc")),
		] {
			let action = resolve(Role::Worker, false, &join_state);
			assert_eq!(action, Action::JoinAsWorker);
		}
	}

	#[test]
	fn existing_installation_always_skips() {
		for role in [Role::Master, Role::Worker] {
			let action = resolve(role, true, &state(None, None));
			assert_eq!(action, Action::SkipAlreadyInstalled);
		}
	}

	#[test]
	fn resolve_is_idempotent() {
		let join_state = state(Some("https://10.0.0.81:6443"), Some("abc"));
		let first = resolve(Role::Master, false, &join_state);
		let second = resolve(Role::Master, false, &join_state);
		assert_eq!(first, second);
	}

	#[test]
	fn required_join_token_rejects_absent_or_empty_token() {
		for join_state in [state(None, None), state(None, Some(""))] {
			let result = required_join_token(Action::JoinAsWorker, &join_state);
			assert!(matches!(result, Err(SetupError::Config(_))));
		}
	}

	#[test]
	fn required_join_token_returns_present_token() {
		let join_state = state(Some("https://10.0.0.81:6443"), Some("abc"));
		let token = required_join_token(Action::JoinAsControlPlane, &join_state).unwrap();
		assert_eq!(token, "abc");
	}
}
