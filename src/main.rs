use clap::{Parser, Subcommand};
use fluxgen::{
    logger::{self, LoggerConfig},
    AssetStorageManager, CallerIdentity, Capability, Config, ConfigStore, EnvConfigStore,
    GenerationHandler, ImageClient, RawInput,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fluxgen", version, about = "Generate images with Flux A.I.")]
struct Cli {
    /// Write JSON log lines and the audit file instead of colored output.
    #[arg(long, global = true)]
    production: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one image and store it as an asset.
    Generate {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        resolution: Option<String>,
        #[arg(long)]
        num_images: Option<String>,
        /// Save straight into this directory instead of the asset store.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Serve the generation endpoint over HTTP.
    #[cfg(feature = "server")]
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();
    let config = Config::from_env();

    let mut logger_config = if cli.production {
        LoggerConfig::production()
    } else {
        LoggerConfig::development()
    };
    if let Some(path) = &config.log_file {
        logger_config = logger_config.with_file_output(path);
    }
    logger::init_with_config(logger_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let config_store = Arc::new(EnvConfigStore::new());
    logger::log_config_info(&config, config_store.service_config().is_some());

    match cli.command {
        Command::Generate {
            prompt,
            style,
            resolution,
            num_images,
            output_dir,
        } => {
            let mut raw = RawInput::new().with("prompt", prompt);
            if let Some(style) = style {
                raw = raw.with("style", style);
            }
            if let Some(resolution) = resolution {
                raw = raw.with("resolution", resolution);
            }
            if let Some(num_images) = num_images {
                raw = raw.with("num_images", num_images);
            }

            match output_dir {
                Some(dir) => save_to_directory(config_store.as_ref(), &raw, &dir).await?,
                None => {
                    let storage = AssetStorageManager::from_config(&config.storage).await?;
                    let handler = GenerationHandler::new(config_store, Arc::new(storage));
                    let caller = CallerIdentity::new("cli").with_capability(Capability::Upload);

                    match handler.handle(&caller, &raw).await {
                        Ok(success) => {
                            log::info!(
                                "✅ Stored image {} at {}",
                                success.image_id,
                                success.image_url
                            );
                            println!("{}", serde_json::to_string_pretty(&success)?);
                        }
                        Err(e) => {
                            log::error!("❌ {}", e);
                            return Err(e.into());
                        }
                    }
                }
            }
        }
        #[cfg(feature = "server")]
        Command::Serve { port } => {
            let mut server = config.server;
            if let Some(port) = port {
                server = server.with_port(port);
            }
            let storage = AssetStorageManager::from_config(&config.storage).await?;
            let state = fluxgen::server::AppState {
                handler: GenerationHandler::new(config_store, Arc::new(storage)),
                server,
            };
            fluxgen::server::run(state).await?;
        }
    }

    Ok(())
}

async fn save_to_directory(
    config_store: &dyn ConfigStore,
    raw: &RawInput,
    dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = fluxgen::validate(raw)?;
    let service = config_store
        .service_config()
        .ok_or(fluxgen::HandlerError::NotConfigured)?;

    let path = ImageClient::new(service)
        .generate_to_file(&request, dir)
        .await?;
    println!("{}", path.display());
    Ok(())
}
