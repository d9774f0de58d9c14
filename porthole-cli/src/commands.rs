//! CLI subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use porthole_core::PortholeConfig;
use porthole_core::media::{TranscodeCache, VideoAsset, is_browser_compatible};
use porthole_core::source::SessionManifest;
use porthole_web::{ServerRegistry, VideoPublisher};

#[derive(Subcommand)]
pub enum Commands {
    /// Serve every video in a session manifest and print their URLs
    Serve {
        /// JSON manifest listing video names with paths or URLs
        manifest: PathBuf,

        /// Print the published table as JSON
        #[arg(long)]
        json: bool,

        /// Fail on incompatible codecs instead of re-encoding them
        #[arg(long)]
        no_transcode: bool,
    },

    /// Print the detected container, codec, and browser verdict for a file
    Probe {
        /// Video file to inspect
        path: PathBuf,
    },
}

pub async fn handle_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve {
            manifest,
            json,
            no_transcode,
        } => serve(manifest, json, no_transcode).await,
        Commands::Probe { path } => Ok(probe(&path)?),
    }
}

async fn serve(
    manifest_path: PathBuf,
    json: bool,
    no_transcode: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(&manifest_path).await?;
    let manifest: SessionManifest = serde_json::from_str(&text)?;

    let mut config = PortholeConfig::default();
    config.media.transcode_incompatible = !no_transcode;

    let registry = Arc::new(ServerRegistry::new(config.server.clone()));
    let cache = Arc::new(TranscodeCache::new(config.cache.clone()));
    let publisher = VideoPublisher::new(registry, cache, config.media.clone());

    let published = publisher.publish_all(&manifest.videos).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&published)?);
    } else {
        for video in &published {
            println!("{} -> {}", video.name, video.url);
        }
    }

    if published.iter().any(|v| v.url.starts_with("http://127.")) {
        println!("Serving {} video(s); press Ctrl-C to stop.", published.len());
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

fn probe(path: &std::path::Path) -> porthole_core::Result<()> {
    let asset = VideoAsset::sniff(path)?;

    println!("file:      {}", asset.path.display());
    println!("size:      {} bytes", asset.size);
    println!("container: {:?}", asset.container);
    println!(
        "codec:     {}",
        asset.codec.as_deref().unwrap_or("(unrecognized)")
    );
    println!(
        "playable:  {}",
        if is_browser_compatible(asset.codec.as_deref()) {
            "yes"
        } else {
            "no (will be transcoded on serve)"
        }
    );
    Ok(())
}
