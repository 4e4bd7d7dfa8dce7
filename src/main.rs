use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scene_fetch::inventory::EarthExplorer;
use scene_fetch::job::{DownloadJob, Mission};
use scene_fetch::landsat8::Landsat8;
use scene_fetch::sentinel2::{Sentinel2, S3_SENTINEL_REGION};
use scene_fetch::service::ServiceChain;
use scene_fetch::store::{HttpStore, S3Store};

#[derive(Parser)]
#[command(name = "scene-fetch", about = "Download satellite scenes by identifier")]
struct Cli {
    /// Path to the download job description
    #[arg(long, default_value = "job.toml")]
    job: PathBuf,

    /// Override the job's download directory
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let job = DownloadJob::read(&cli.job)?;
    let download_dir = cli.download_dir.unwrap_or_else(|| job.download_dir.clone());
    let bands = job.band_requests();

    let results = match job.mission {
        Mission::Landsat8 => {
            let chain = ServiceChain::from_designators(&job.services)?;
            let mut mission = Landsat8::new(&download_dir, HttpStore::new(), EarthExplorer::new())?;
            if let Some(login) = &job.usgs {
                mission = mission.with_credentials(&login.username, &login.password);
            }
            mission.download(&job.scenes, &bands, &chain).await?
        }
        Mission::Sentinel2 => {
            let store = S3Store::anonymous(S3_SENTINEL_REGION).await;
            let mission = Sentinel2::new(&download_dir, store)?;
            mission.download(&job.scenes, &bands).await?
        }
    };

    info!("downloaded {} scenes", results.len());
    for scene in &results {
        info!("{}: {} files", scene.name(), scene.files().len());
    }

    Ok(())
}
