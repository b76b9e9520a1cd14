//! accessctl CLI - declare who may manage a resource before creating it

mod client;
mod editor;
mod render;

use accessctl::access_control::{AccessControlFormData, FormProps};
use accessctl::directory::fetch_directory;
use accessctl::models::{EnvironmentId, UserId};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "accessctl-cli")]
#[command(about = "Interactive client for declaring resource ownership")]
#[command(version)]
struct Cli {
    /// Server URL
    #[arg(short, long, env = "ACCESSCTL_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Id of the user acting in the console
    #[arg(short, long, env = "ACCESSCTL_ACTOR")]
    actor: u64,

    /// Environment the resource is created in
    #[arg(short, long)]
    environment: Option<u64>,

    /// Offer the public option
    #[arg(long)]
    public: bool,

    /// Prefix for the form field names
    #[arg(long)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit an ownership declaration interactively
    Edit,

    /// Print the ownership options offered to the actor
    Options,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accessctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let client = client::AccessClient::connect(&cli.server, UserId(cli.actor)).await?;
    let environment_id = cli.environment.map(EnvironmentId);

    match cli.command {
        Commands::Edit => {
            let props = FormProps {
                values: AccessControlFormData::default(),
                is_public_visible: cli.public,
                namespace: cli.namespace,
                environment_id,
                ..FormProps::default()
            };
            editor::run(client, props).await
        }
        Commands::Options => run_options(&client, environment_id, cli.public).await,
    }
}

async fn run_options(
    client: &client::AccessClient,
    environment_id: Option<EnvironmentId>,
    allow_public_option: bool,
) -> Result<()> {
    let directory = fetch_directory(client.directory(), environment_id).await?;
    let options = accessctl::access_control::compute_options(
        client.actor(),
        &directory.teams,
        allow_public_option,
    );
    print!("{}", render::render_options(&options, None));
    Ok(())
}
