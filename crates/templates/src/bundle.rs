use kvmop_core::{Changelog, ChangelogKind, Component, VersionBundle};

pub const BUNDLE_NAME: &str = "kvm-operator";
pub const BUNDLE_VERSION: &str = "2.0.1";

fn component(name: &str, version: &str) -> Component {
    Component { name: name.into(), version: version.into() }
}

fn changelog(component: &str, description: &str, kind: ChangelogKind) -> Changelog {
    Changelog { component: component.into(), description: description.into(), kind }
}

/// The bundle of the generation these templates render.
pub fn version_bundle() -> VersionBundle {
    VersionBundle {
        name: BUNDLE_NAME.into(),
        version: BUNDLE_VERSION.into(),
        components: vec![
            component("calico", "3.0.2"),
            component("containerlinux", "1576.5.0"),
            component("docker", "17.09.0"),
            component("etcd", "3.3.1"),
            component("coredns", "1.0.5"),
            component("kubernetes", "1.9.2"),
            component("nginx-ingress-controller", "0.10.2"),
        ],
        changelogs: vec![
            changelog("kvm-node-controller", "Updated KVM node controller with pod status bugfix.", ChangelogKind::Changed),
            changelog("calico", "Updated to 3.0.2.", ChangelogKind::Changed),
            changelog(
                "kubelet",
                "Tune kubelet flags for protecting key units (kubelet and container runtime) from workload overloads.",
                ChangelogKind::Changed,
            ),
            changelog("etcd", "Updated to 3.3.1.", ChangelogKind::Changed),
            changelog("qemu", "Fixed formula for calculating qemu memory overhead.", ChangelogKind::Fixed),
            changelog("monitoring", "Added configuration for monitoring endpoint IP addresses.", ChangelogKind::Added),
        ],
    }
}
