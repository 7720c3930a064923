//! kvmop resource: the reconciliation engine.
//!
//! Each managed kind implements [`CrudOps`]. Reconcilers are wrapped with the
//! [`Retry`] and [`Metered`] decorators, driven by [`CrudResource`] and
//! composed in a fixed order by a [`ResourceSet`]. A [`Registry`] routes a
//! cluster spec to the one set whose version bundle it records.

#![forbid(unsafe_code)]

pub mod crud;
pub mod desired;
pub mod diff;
pub mod gate;
pub mod kinds;
pub mod metered;
pub mod ops;
pub mod registry;
pub mod retry;
pub mod set;

pub use crud::{CrudResource, Reconciler};
pub use desired::DesiredStates;
pub use gate::{ReplicaCounts, Rollout, VERSION_ANNOTATION};
pub use metered::Metered;
pub use ops::CrudOps;
pub use registry::Registry;
pub use retry::{Retry, RetryConfig};
pub use set::{PassReport, ResourceSet, ResourceSetConfig, RESOURCE_RETRIES};

#[cfg(test)]
pub(crate) mod testing;
