//! Ingress routes and services exposing the guest cluster's API and etcd.

use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        core::v1::{Service, ServicePort, ServiceSpec},
        networking::v1::{
            HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend, IngressSpec,
            IngressTLS, ServiceBackendPort,
        },
    },
    apimachinery::pkg::{apis::meta::v1::ObjectMeta, util::intstr::IntOrString},
};
use kvmop_core::{ClusterSpec, Endpoint};

use crate::key;

/// TLS-passthrough route for `endpoint.domain` to the master service.
pub fn ingress(spec: &ClusterSpec, name: &str, endpoint: &Endpoint) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(key::app_labels(spec, key::MASTER_ID)),
            annotations: Some(BTreeMap::from([(key::SSL_PASSTHROUGH_ANNOTATION.to_string(), "true".to_string())])),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            tls: Some(vec![IngressTLS { hosts: Some(vec![endpoint.domain.clone()]), ..Default::default() }]),
            rules: Some(vec![IngressRule {
                host: Some(endpoint.domain.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".into()),
                        path_type: "ImplementationSpecific".into(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: key::MASTER_ID.into(),
                                port: Some(ServiceBackendPort { number: Some(endpoint.port), ..Default::default() }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn ingresses(spec: &ClusterSpec) -> Vec<Ingress> {
    vec![ingress(spec, key::API_ID, &spec.api), ingress(spec, key::ETCD_ID, &spec.etcd)]
}

fn port(name: &str, port: i32, node_port: Option<i32>) -> ServicePort {
    ServicePort {
        name: Some(name.into()),
        port,
        protocol: Some("TCP".into()),
        target_port: Some(IntOrString::Int(port)),
        node_port,
        ..Default::default()
    }
}

fn service(spec: &ClusterSpec, app: &str, type_: &str, ports: Vec<ServicePort>) -> Service {
    Service {
        metadata: ObjectMeta { name: Some(app.into()), labels: Some(key::app_labels(spec, app)), ..Default::default() },
        spec: Some(ServiceSpec {
            type_: Some(type_.into()),
            ports: Some(ports),
            selector: Some(key::app_labels(spec, app)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn services(spec: &ClusterSpec) -> Vec<Service> {
    vec![
        service(spec, key::MASTER_ID, "ClusterIP", vec![port(key::ETCD_ID, spec.etcd.port, None), port(key::API_ID, spec.api.port, None)]),
        service(
            spec,
            key::WORKER_ID,
            "NodePort",
            vec![
                port("http", key::WORKER_HTTP_PORT, Some(key::WORKER_HTTP_PORT)),
                port("https", key::WORKER_HTTPS_PORT, Some(key::WORKER_HTTPS_PORT)),
            ],
        ),
    ]
}
