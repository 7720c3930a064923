//! kvmop core types: cluster declarations, patches, version bundles and the
//! error taxonomy shared by every engine crate.

#![forbid(unsafe_code)]

pub mod bundle;
pub mod error;
pub mod pass;
pub mod patch;
pub mod spec;

pub use bundle::{Changelog, ChangelogKind, Component, VersionBundle};
pub use error::{Error, Result};
pub use pass::{Flow, Observed, PassContext};
pub use patch::Patch;
pub use spec::{ClusterSpec, Endpoint, EtcdStorage, Node, Role};

pub mod prelude {
    pub use super::{ClusterSpec, Error, Flow, Observed, PassContext, Patch, Result, VersionBundle};
}
