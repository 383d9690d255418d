use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wallpapers::action::{
    ActionExecutor, ActionStatus, DirectoryWallpaperSetter, DownloadsDir, HttpImageFetcher,
    WallpaperTarget,
};
use wallpapers::config::{Config, SourceKind, API_KEY_ENV};
use wallpapers::paging::{CategoryScreen, ImageQuery, ImageScreen, UiState};
use wallpapers::source::{DataSource, FixtureSource, PixabaySource};

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home))
}

/// Get the default config file path (~/.config/wallpapers/config.toml)
fn default_config_path(home: &Path) -> PathBuf {
    home.join(".config").join("wallpapers").join("config.toml")
}

#[derive(Parser, Debug)]
#[command(name = "wallpapers", about = "Browse, search and apply stock wallpapers")]
struct Args {
    /// Config file (defaults to ~/.config/wallpapers/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use the built-in sample catalog instead of the remote API
    #[arg(long)]
    fixture: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List wallpaper categories
    Categories {
        /// Case-insensitive name filter
        #[arg(long)]
        filter: Option<String>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// List images in a category or matching a search
    Images {
        #[arg(long, conflicts_with = "search", required_unless_present = "search")]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Save an image to the downloads directory
    Download { url: String },
    /// Install an image as the wallpaper
    Apply {
        url: String,

        #[arg(long, default_value = "both")]
        target: WallpaperTarget,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let home = home_dir()?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&home));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let client = reqwest::Client::builder()
        .user_agent(concat!("wallpapers/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    match args.command {
        Command::Download { url } => {
            let executor = executor(&config, &home, client);
            report(executor.download(&url).await)
        }
        Command::Apply { url, target } => {
            let executor = executor(&config, &home, client);
            report(executor.apply_wallpaper(&url, target).await)
        }
        command if args.fixture || config.source == SourceKind::Fixture => {
            browse(Arc::new(FixtureSource::new()), &config, command).await
        }
        command => {
            let api_key = config.api_key(std::env::var(API_KEY_ENV).ok());
            if api_key.is_none() {
                eprintln!("Warning: no API key set ({API_KEY_ENV} or pixabay_api_key); results will be empty.");
            }
            let mut source = PixabaySource::new(client, api_key.map(SecretString::from));
            if let Some(base_url) = &config.api_base_url {
                source = source
                    .with_base_url(base_url.as_str())
                    .context("Invalid api_base_url")?;
            }
            browse(Arc::new(source), &config, command).await
        }
    }
}

fn executor(
    config: &Config,
    home: &Path,
    client: reqwest::Client,
) -> ActionExecutor<HttpImageFetcher, DownloadsDir, DirectoryWallpaperSetter> {
    let mut setter = DirectoryWallpaperSetter::new(config.wallpaper_dir(home));
    if let Some(command) = &config.wallpaper_command {
        setter = setter.with_command(command.clone());
    }
    ActionExecutor::new(
        HttpImageFetcher::new(client),
        DownloadsDir::new(config.download_dir(home)),
        setter,
    )
}

fn report(status: ActionStatus) -> Result<()> {
    match status {
        ActionStatus::Success(msg) => {
            println!("{msg}");
            Ok(())
        }
        other => anyhow::bail!("{}", other.message()),
    }
}

async fn browse<S: DataSource>(source: Arc<S>, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Categories { filter, pages } => {
            let screen = CategoryScreen::new(source, config.category_page_size);
            screen.reset().await;
            for _ in 1..pages {
                if !screen.has_more() {
                    break;
                }
                screen.load_more().await;
            }
            if let Some(text) = filter {
                screen.set_filter(&text);
            }
            for category in loaded(screen.ui_state())? {
                println!("{}\t{}\t{}", category.id, category.name, category.thumbnail_url);
            }
        }
        Command::Images {
            category,
            search,
            pages,
        } => {
            let query = match (category, search) {
                (_, Some(text)) => ImageQuery::Search(text),
                (Some(id), None) => ImageQuery::Category(id),
                (None, None) => anyhow::bail!("either --category or --search is required"),
            };
            let screen = ImageScreen::new(source, query, config.image_page_size);
            screen.reset().await;
            for _ in 1..pages {
                if !screen.has_more() {
                    break;
                }
                screen.load_more().await;
            }
            for image in loaded(screen.ui_state())? {
                println!("{}\t{}", image.id, image.image_url);
            }
        }
        Command::Download { .. } | Command::Apply { .. } => {
            anyhow::bail!("not a browsing command")
        }
    }
    Ok(())
}

fn loaded<T>(state: UiState<T>) -> Result<T> {
    match state {
        UiState::Success(items) => Ok(items),
        UiState::Error(msg) => anyhow::bail!("{msg}"),
        UiState::Loading => anyhow::bail!("still loading"),
    }
}
