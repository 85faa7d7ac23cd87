use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use route_guard::{Gate, GateConfig, LoggingProvider, NavigateOptions, NavigationKind, RouteManifest};

#[derive(Parser, Debug)]
#[command(author, version, about = "route-guard manifest inspector", long_about = None)]
struct Cli {
    /// Route manifest (JSON with `routes` and `granted`)
    #[arg(short, long, default_value = "routes.json")]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every route with the current decision
    Routes,
    /// Check whether a single route is reachable
    Check { route: String },
    /// Queue a navigation before init, then init from the manifest and report the outcome
    Navigate {
        #[arg(short, long, value_enum, default_value_t = Kind::Forward)]
        kind: Kind,
        route: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Forward,
    Replace,
    SwitchTab,
}

impl From<Kind> for NavigationKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Forward => NavigationKind::Forward,
            Kind::Replace => NavigationKind::Replace,
            Kind::SwitchTab => NavigationKind::SwitchTab,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let config = GateConfig::from_env()?;
    let manifest = RouteManifest::load(&cli.manifest)
        .with_context(|| format!("failed to load manifest {}", cli.manifest.display()))?;

    let gate = Gate::with_config(Arc::new(LoggingProvider::new()), config);

    match cli.command {
        Commands::Routes => {
            let ids: Vec<String> = manifest.routes.iter().map(|route| route.id.clone()).collect();
            gate.init(manifest.routes, manifest.granted);

            println!("{:<8} {}", "Access", "Route");
            for id in ids {
                let access = if gate.authorize_route(&id) { "allow" } else { "deny" };
                println!("{:<8} {}", access, id);
            }
        }
        Commands::Check { route } => {
            gate.init(manifest.routes, manifest.granted);
            let allowed = gate.authorize_route(&route);
            println!("{}: {}", route, if allowed { "allow" } else { "deny" });
            if !allowed {
                std::process::exit(1);
            }
        }
        Commands::Navigate { kind, route } => {
            let pending = gate.navigate(kind.into(), NavigateOptions::new(route));
            gate.init(manifest.routes, manifest.granted);

            match pending.await {
                Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
                Err(err) => {
                    println!("{}", serde_json::to_string_pretty(&err.payload())?);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
