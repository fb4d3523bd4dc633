mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kiln", about = "Build and deploy sandbox images from kiln.toml")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated Dockerfile
    Render {
        /// Include the sandbox runtime and default entrypoint
        #[arg(long)]
        sandbox: bool,
    },
    /// Print the image content hash
    Hash,
    /// Write the build context to a directory
    Write {
        /// Parent directory of the build context (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Build context directory name (default: image-<hash>)
        #[arg(long)]
        name: Option<String>,
    },
    /// Package the build context as a .tar.gz archive
    Package {
        /// Archive path (default: image-<hash>.tar.gz)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload the build context and wait for the sandbox to deploy
    Deploy {
        /// Sandbox name (overrides [deploy].name)
        #[arg(long)]
        name: Option<String>,
        /// Memory limit in MB
        #[arg(long)]
        memory: Option<u32>,
        /// Deployment deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Sandbox runtime version tag
        #[arg(long)]
        runtime_version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { sandbox } => commands::render(sandbox)?,
        Commands::Hash => commands::hash()?,
        Commands::Write { out, name } => commands::write(out, name.as_deref())?,
        Commands::Package { out } => commands::package(out)?,
        Commands::Deploy {
            name,
            memory,
            timeout_ms,
            runtime_version,
        } => {
            commands::deploy(commands::DeployArgs {
                name,
                memory,
                timeout_ms,
                runtime_version,
            })
            .await?
        }
    }

    Ok(())
}
