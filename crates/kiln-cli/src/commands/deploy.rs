use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use kiln_cloud::{DeployOptions, Deployer};
use secrecy::SecretString;

const API_URL_ENV: &str = "KILN_API_URL";
const API_TOKEN_ENV: &str = "KILN_API_TOKEN";

/// Command-line overrides for `[deploy]`.
pub struct DeployArgs {
    pub name: Option<String>,
    pub memory: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub runtime_version: Option<String>,
}

/// Execute the full deploy pipeline.
pub async fn deploy(args: DeployArgs) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    load_dotenv()?;

    let (mut config, image) = super::load_image(&project_dir)?;
    if let Some(url) = env_var(API_URL_ENV)? {
        config.control_plane.url = url;
    }
    let token = env_var(API_TOKEN_ENV)?.map(SecretString::from);

    let name = args
        .name
        .or_else(|| config.deploy.name.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("sandbox name not set: pass --name or set [deploy].name in kiln.toml")
        })?;

    let mut options = DeployOptions::from_config(&name, &config.deploy)
        .on_status_change(|status| println!("  status: {status}"));
    if let Some(memory) = args.memory {
        options = options.memory(memory);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        options = options.timeout(Duration::from_millis(timeout_ms));
    }
    if let Some(version) = args.runtime_version {
        options = options.runtime_version(version);
    }

    println!("Deploying sandbox '{name}' to {}...", config.control_plane.url);
    let deployer = Deployer::from_config(&config, token);
    let resource = deployer.build(&image, options).await?;

    println!();
    println!(
        "Deployed: {} ({})",
        resource.metadata.name,
        resource.status.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

fn load_dotenv() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded environment file");
            Ok(())
        }
        Err(e) if e.not_found() => {
            tracing::debug!("no .env file found");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn env_var(key: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        Ok(_) | Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow::anyhow!("{key}: {e}")),
    }
}
