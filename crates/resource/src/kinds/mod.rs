//! One reconciler per managed kind, in resource set order.

pub mod config_map;
pub mod deployment;
pub mod ingress;
pub mod namespace;
pub mod service;
pub mod service_account;
pub mod volume_claim;

pub use config_map::ConfigMapResource;
pub use deployment::DeploymentResource;
pub use ingress::IngressResource;
pub use namespace::NamespaceResource;
pub use service::ServiceResource;
pub use service_account::ServiceAccountResource;
pub use volume_claim::VolumeClaimResource;
