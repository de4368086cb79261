pub mod addons;
pub mod helm;
pub mod k3s;
pub mod packages;
pub mod wireguard;

pub use addons::Addons;
pub use helm::Helm;
pub use k3s::K3s;
pub use packages::Packages;
pub use wireguard::Wireguard;
