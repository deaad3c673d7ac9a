//! Command-line client and smoke tester for Granary.

mod api_client;

use anyhow::{Context, Result};
use api_client::ApiClient;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "granaryctl")]
#[command(about = "Client for the Granary distributed file store")]
#[command(version)]
struct Cli {
    /// Server URL
    #[arg(
        long,
        env = "GRANARY_SERVER",
        default_value = "http://127.0.0.1:8080"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Put {
        /// Path of the local file to upload
        path: PathBuf,
        /// Name to store the file under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a file
    Get {
        /// Stored file name
        name: String,
        /// Write the file here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload a file under a generated name, download it back, and compare
    Check {
        /// Path of the local file to round-trip
        path: PathBuf,
    },
}

fn storage_name(path: &Path, name: Option<String>) -> Result<String> {
    match name {
        Some(name) => Ok(name),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("can't derive a name from the given path"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Put { path, name } => {
            let name = storage_name(&path, name)?;
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("can't read {}", path.display()))?;
            let len = data.len();

            client.put_file(&name, data).await?;
            println!("uploaded {} ({len} bytes) as '{name}'", path.display());
        }
        Commands::Get { name, out } => {
            let data = client.get_file(&name).await?;
            match out {
                Some(out) => {
                    tokio::fs::write(&out, &data)
                        .await
                        .with_context(|| format!("can't write {}", out.display()))?;
                    println!("downloaded '{name}' ({} bytes) to {}", data.len(), out.display());
                }
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&data)?;
                }
            }
        }
        Commands::Check { path } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("can't read {}", path.display()))?;
            let name = format!("check-{}", Uuid::new_v4());

            client.health().await?;
            client.put_file(&name, data.clone()).await?;
            let fetched = client.get_file(&name).await?;

            if fetched == data {
                println!("OK: '{name}' round-tripped {} bytes intact", data.len());
            } else {
                anyhow::bail!(
                    "MISMATCH: uploaded {} bytes but got {} back for '{name}'",
                    data.len(),
                    fetched.len()
                );
            }
        }
    }

    Ok(())
}
