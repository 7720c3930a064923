use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use kvmop_core::ClusterSpec;
use kvmop_kubehub::Clients;
use kvmop_resource::{DesiredStates, PassReport, Registry, ResourceSet, ResourceSetConfig, RetryConfig, RESOURCE_RETRIES};
use kvmop_templates::{version_bundle, KvmTemplates, BUNDLE_NAME, BUNDLE_VERSION};
use serde::Serialize;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kvmopctl", version, about = "Reconcile KVM guest clusters")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Allow the update gate to roll one deployment per pass
    #[arg(long = "guest-update-enabled", env = "KVMOP_GUEST_UPDATE_ENABLED", global = true, action = ArgAction::SetTrue)]
    guest_update_enabled: bool,

    /// Attempts per reconciler call for transient failures
    #[arg(
        long = "resource-retries",
        env = "KVMOP_RESOURCE_RETRIES",
        global = true,
        default_value_t = RESOURCE_RETRIES,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    resource_retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Kind {
    Namespace,
    ServiceAccount,
    ConfigData,
    Deployment,
    Ingress,
    VolumeClaim,
    NetworkService,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List compiled version bundles
    Bundles,
    /// Print the desired objects for a cluster spec (offline)
    Render {
        /// Cluster spec file (YAML or JSON)
        spec: PathBuf,
        /// Only render one kind
        #[arg(long = "kind", value_enum)]
        kind: Option<Kind>,
    },
    /// Run reconciliation passes against the current kube context
    Reconcile {
        /// Cluster spec files (YAML or JSON)
        #[arg(required = true)]
        specs: Vec<PathBuf>,
        /// Tear the clusters down instead of converging them
        #[arg(long = "delete", action = ArgAction::SetTrue)]
        delete: bool,
        /// Repeat every SECS seconds until Ctrl-C
        #[arg(long = "interval", value_name = "SECS")]
        interval: Option<u64>,
    },
}

fn init_tracing() {
    let env = std::env::var("KVMOP_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KVMOP_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid KVMOP_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_spec(path: &Path) -> Result<ClusterSpec> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let spec: ClusterSpec = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    };
    spec.validate().with_context(|| format!("invalid cluster spec in {}", path.display()))?;
    Ok(spec)
}

fn push_all<T: Serialize>(out: &mut Vec<serde_json::Value>, objects: Vec<T>) -> Result<()> {
    for o in objects {
        out.push(serde_json::to_value(o)?);
    }
    Ok(())
}

fn render(spec: &ClusterSpec, only: Option<Kind>) -> Result<Vec<serde_json::Value>> {
    let t = KvmTemplates;
    let wanted = |k: Kind| only.map_or(true, |o| o == k);
    let mut out = Vec::new();
    if wanted(Kind::Namespace) {
        push_all(&mut out, vec![t.namespace(spec)?])?;
    }
    if wanted(Kind::ServiceAccount) {
        push_all(&mut out, t.service_accounts(spec)?)?;
    }
    if wanted(Kind::ConfigData) {
        push_all(&mut out, t.config_maps(spec)?)?;
    }
    if wanted(Kind::Deployment) {
        push_all(&mut out, t.deployments(spec)?)?;
    }
    if wanted(Kind::Ingress) {
        push_all(&mut out, t.ingresses(spec)?)?;
    }
    if wanted(Kind::VolumeClaim) {
        push_all(&mut out, t.volume_claims(spec)?)?;
    }
    if wanted(Kind::NetworkService) {
        push_all(&mut out, t.services(spec)?)?;
    }
    Ok(out)
}

fn registry(clients: Clients, guest_update_enabled: bool, resource_retries: u32) -> Result<Registry> {
    let set = ResourceSet::new(ResourceSetConfig {
        name: format!("{}-{}", BUNDLE_NAME, BUNDLE_VERSION),
        bundle: version_bundle(),
        clients,
        templates: Arc::new(KvmTemplates),
        guest_update_enabled,
        retry: RetryConfig::with_max_attempts(resource_retries),
    })?;
    Ok(Registry::new(vec![set])?)
}

/// One pass per spec, run concurrently. Returns the number of failed passes.
async fn run_passes(registry: &Registry, specs: &[ClusterSpec], delete: bool, output: Output) -> Result<usize> {
    let passes = specs.iter().map(|spec| async move {
        let res = if delete { registry.reconcile_deletion(spec).await } else { registry.reconcile(spec).await };
        (spec, res)
    });
    let mut failed = 0;
    for (spec, res) in futures::future::join_all(passes).await {
        match res {
            Ok(Some(report)) => print_report(spec, &report, output)?,
            Ok(None) => warn!(cluster = %spec.id, version = %spec.version_bundle_version, "skipped: no resource set for version bundle"),
            Err(e) => {
                error!(cluster = %spec.id, error = %e, "reconciliation failed");
                failed += 1;
            }
        }
    }
    Ok(failed)
}

fn print_report(spec: &ClusterSpec, r: &PassReport, output: Output) -> Result<()> {
    match output {
        Output::Human => println!(
            "{:<10} {:<22} pass={} executed={} cancelled_by={}",
            spec.id,
            r.resource_set,
            r.pass_id,
            r.executed.join(","),
            r.cancelled_by.unwrap_or("-")
        ),
        Output::Json => {
            let v = serde_json::json!({
                "cluster": spec.id,
                "resourceSet": r.resource_set,
                "passId": r.pass_id.to_string(),
                "executed": r.executed.as_slice(),
                "cancelledBy": r.cancelled_by,
            });
            println!("{}", serde_json::to_string(&v)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Bundles => {
            let bundles = vec![version_bundle()];
            match cli.output {
                Output::Human => {
                    for b in &bundles {
                        println!("{} {}", b.name, b.version);
                        for c in &b.components {
                            println!("  {:<26} {}", c.name, c.version);
                        }
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&bundles)?),
            }
        }
        Commands::Render { spec, kind } => {
            let spec = load_spec(&spec)?;
            info!(cluster = %spec.id, kind = ?kind, "render invoked");
            let objects = render(&spec, kind)?;
            match cli.output {
                Output::Human => {
                    for o in &objects {
                        print!("---\n{}", serde_yaml::to_string(o)?);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&objects)?),
            }
        }
        Commands::Reconcile { specs, delete, interval } => {
            let specs = specs.iter().map(|p| load_spec(p)).collect::<Result<Vec<_>>>()?;
            let clients = Clients::try_default().await.context("connecting to the cluster")?;
            let registry = registry(clients, cli.guest_update_enabled, cli.resource_retries)?;
            info!(
                clusters = specs.len(),
                delete,
                guest_update_enabled = cli.guest_update_enabled,
                resource_retries = cli.resource_retries,
                "reconcile invoked"
            );

            let Some(secs) = interval else {
                let failed = run_passes(&registry, &specs, delete, cli.output).await?;
                if failed > 0 {
                    bail!("{} of {} passes failed", failed, specs.len());
                }
                return Ok(());
            };
            let every = Duration::from_secs(secs.max(1));
            loop {
                let failed = run_passes(&registry, &specs, delete, cli.output).await?;
                if failed > 0 {
                    warn!(failed, "some passes failed; retrying on the next interval");
                }
                tokio::select! {
                    _ = tokio::time::sleep(every) => {}
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; shutting down reconcile loop");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
