use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use env_logger::Env;
use futures::future::join_all;
use log::{error, info};

use image_resizer::{OutputShape, ResizeOutput, ResizeRequest, Resolver, ResizerConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Size {
    width: u32,
    height: Option<u32>,
}

impl FromStr for Size {
    type Err = String;

    // `400x300` or `400`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = match s.split_once(['x', 'X']) {
            Some((w, h)) => (w, Some(h)),
            None => (s, None),
        };
        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid width in '{}': {}", s, e))?;
        let height = height
            .map(|h| h.trim().parse::<u32>())
            .transpose()
            .map_err(|e| format!("invalid height in '{}': {}", s, e))?;
        Ok(Size { width, height })
    }
}

#[derive(Debug, Parser)]
#[command(name = "image-resizer", about = "Resize uploaded images through the derivative cache")]
struct Cli {
    /// URL of the source image under the upload base URL.
    url: String,

    /// Target size as WIDTHxHEIGHT or WIDTH; repeat for several derivatives.
    #[arg(long = "size", short = 's', required = true, value_name = "WxH")]
    sizes: Vec<Size>,

    /// Fit inside the box instead of cropping to it.
    #[arg(long)]
    no_crop: bool,

    /// Print `{url,width,height}` JSON records instead of bare URLs.
    #[arg(long)]
    record: bool,

    /// Configuration file; RESIZER_* environment variables override it.
    #[arg(long, default_value = "App.toml", value_name = "PATH")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    let config = match ResizerConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };
    info!(
        "Configuration loaded: uploads at {} served from {}",
        config.upload_dir.display(),
        config.upload_url
    );

    let resolver = Arc::new(Resolver::new(config));
    let shape = if cli.record { OutputShape::Record } else { OutputShape::Url };

    let tasks = cli.sizes.iter().map(|size| {
        let resolver = Arc::clone(&resolver);
        let url = cli.url.clone();
        let request = ResizeRequest::new(size.width, size.height)
            .with_crop(!cli.no_crop)
            .with_shape(shape);
        tokio::task::spawn_blocking(move || resolver.resize_image(&url, &request))
    });

    let mut failed = false;
    for result in join_all(tasks).await {
        match result {
            Ok(Some(ResizeOutput::Url(url))) => println!("{}", url),
            Ok(Some(record)) => match serde_json::to_string(&record) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!("Failed to serialize result: {}", e);
                    failed = true;
                }
            },
            Ok(None) => {
                println!("unavailable");
                failed = true;
            }
            Err(e) => {
                error!("Resize task failed: {}", e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!("400x300".parse::<Size>().unwrap(), Size { width: 400, height: Some(300) });
        assert_eq!("150".parse::<Size>().unwrap(), Size { width: 150, height: None });
        assert!("x300".parse::<Size>().is_err());
        assert!("400xabc".parse::<Size>().is_err());
    }
}
