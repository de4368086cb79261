use crate::config;
use crate::error::SetupError;
use crate::role::Role;
use crate::setup::utils::{helm, kctl};
use crate::setup::SetupStep;
use std::fs;
use tracing::info;

pub struct Addons;

impl Addons {
	pub const LONGHORN_MANIFEST_URL: &str =
		"https://raw.githubusercontent.com/longhorn/longhorn/v1.7.1/deploy/longhorn.yaml";
	pub const LONGHORN_NAMESPACE: &str = "longhorn-system";
	pub const LONGHORN_DEPLOYMENT: &str = "longhorn-driver-deployer";
	pub const PORTAINER_MANIFEST_URL: &str =
		"https://raw.githubusercontent.com/portainer/k8s/master/deploy/manifests/portainer/portainer.yaml";
	pub const PORTAINER_NAMESPACE: &str = "portainer";
	pub const PORTAINER_DEPLOYMENT: &str = "portainer";
	pub const MONITORING_REPO_NAME: &str = "prometheus-community";
	pub const MONITORING_REPO_URL: &str = "https://prometheus-community.github.io/helm-charts";
	pub const MONITORING_CHART: &str = "prometheus-community/kube-prometheus-stack";
	pub const MONITORING_RELEASE: &str = "monitoring";
	pub const MONITORING_NAMESPACE: &str = "monitoring";
	pub const MONITORING_VALUES_PATH: &str = "/etc/k3up/prometheus-values.yaml";
}

const STORAGE_CLASS_MANIFEST: &str = r#"apiVersion: storage.k8s.io/v1
kind: StorageClass
metadata:
  name: longhorn-default
  annotations:
    storageclass.kubernetes.io/is-default-class: "true"
provisioner: driver.longhorn.io
allowVolumeExpansion: true
reclaimPolicy: Delete
volumeBindingMode: Immediate
parameters:
  numberOfReplicas: "2"
  staleReplicaTimeout: "30"
"#;

const MONITORING_VALUES: &str = r#"grafana:
  persistence:
    enabled: true
    storageClassName: longhorn-default
prometheus:
  prometheusSpec:
    retention: 15d
    storageSpec:
      volumeClaimTemplate:
        spec:
          storageClassName: longhorn-default
          accessModes: ["ReadWriteOnce"]
          resources:
            requests:
              storage: 20Gi
"#;

impl SetupStep for Addons {
	fn name(&self) -> &'static str {
		"Addons"
	}

	fn check(&self) -> Result<bool, SetupError> {
		if config::get().role == Role::Worker {
			info!("This node is a worker, no add-on deployment required.");
			return Ok(true);
		}
		if !kctl::is_deployment_installed(Addons::LONGHORN_DEPLOYMENT, Addons::LONGHORN_NAMESPACE)?
		{
			info!("Longhorn is not installed.");
			return Ok(false);
		}
		if !kctl::is_deployment_installed(
			Addons::PORTAINER_DEPLOYMENT,
			Addons::PORTAINER_NAMESPACE,
		)? {
			info!("Portainer is not installed.");
			return Ok(false);
		}
		if !helm::is_available() {
			info!("Helm is not available, the monitoring stack cannot be installed yet.");
			return Ok(false);
		}
		if !helm::is_release_installed(Addons::MONITORING_RELEASE, Addons::MONITORING_NAMESPACE)? {
			info!("The monitoring stack is not installed.");
			return Ok(false);
		}
		info!("All add-ons are installed.");
		Ok(true)
	}

	// Fixed order, no rollback: each apply surfaces its own failure and the
	// underlying tools are idempotent on re-run.
	fn set(&self) -> Result<(), SetupError> {
		kctl::wait_for_api();
		info!("Deploying Longhorn.");
		kctl::apply_url(Addons::LONGHORN_MANIFEST_URL)?;
		info!("Applying the default storage class.");
		kctl::apply_yaml(STORAGE_CLASS_MANIFEST)?;
		info!("Deploying Portainer.");
		kctl::apply_url(Addons::PORTAINER_MANIFEST_URL)?;
		info!("Installing the monitoring stack.");
		fs::create_dir_all("/etc/k3up")?;
		fs::write(Addons::MONITORING_VALUES_PATH, MONITORING_VALUES)?;
		helm::repo_add(Addons::MONITORING_REPO_NAME, Addons::MONITORING_REPO_URL)?;
		helm::upgrade_install(
			Addons::MONITORING_RELEASE,
			Addons::MONITORING_CHART,
			Addons::MONITORING_NAMESPACE,
			Addons::MONITORING_VALUES_PATH,
		)?;
		info!("Add-on deployment finished.");
		Ok(())
	}
}
