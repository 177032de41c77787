use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use librarian::api::{CatalogApi, HttpBackend, MemoryBackend, ROOT_DIR_ID};
use librarian::browser::{Library, Location, Mode, Pane};
use librarian::coordinator::ViewCoordinator;
use librarian::format::{format_size, format_time};
use librarian::settings::Settings;
use librarian::ui::App;

#[derive(Parser)]
#[command(name = "librarian")]
#[command(about = "Terminal browser for a media library server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to settings file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Server base URL, overrides the settings file
    #[arg(short, long)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive TUI
    Browse,
    /// Launch the TUI against a built-in demo library (no server needed)
    Demo,
    /// Print the auto library root reported by the server
    Root,
    /// List a folder of the auto tree
    Ls {
        /// Folder path, defaults to the root
        path: Option<String>,
    },
    /// List a folder of the manual tree
    Tree {
        /// Folder id, defaults to the top level
        dir_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = if let Some(config) = &cli.config {
        PathBuf::from(shellexpand::tilde(config).to_string())
    } else {
        Settings::default_path()
    };
    let first_run = !settings_path.exists();
    let mut settings = Settings::load(&settings_path).context("Failed to load settings")?;

    let _log_guard = librarian::logging::init(&Settings::data_dir().join("logs"))?;

    // Leave an editable file behind on first run, before any flag overrides
    if first_run {
        match settings.save(&settings_path) {
            Ok(()) => tracing::info!(path = %settings_path.display(), "wrote default settings"),
            Err(e) => tracing::warn!(error = %e, "could not write default settings"),
        }
    }
    if let Some(server) = &cli.server {
        settings.server.base_url = server.clone();
    }
    tracing::info!(config = %settings_path.display(), "starting");

    let command = cli.command.unwrap_or(Commands::Browse);
    let api: Arc<dyn CatalogApi> = match command {
        Commands::Demo => Arc::new(MemoryBackend::demo(&settings.library.fallback_auto_root)),
        _ => {
            let http = HttpBackend::new(&settings.server.base_url, settings.server.timeout())
                .context("Failed to build HTTP client")?;
            tracing::info!(server = %http.base_url(), "using library server");
            Arc::new(http)
        }
    };
    let mut library = Library::new(
        api,
        &settings.library.legacy_auto_root,
        &settings.library.fallback_auto_root,
    );

    match command {
        Commands::Browse | Commands::Demo => {
            let coord = ViewCoordinator::new(
                library,
                settings.ui.start_tab,
                settings.ui.upload_poll_interval(),
            );
            let mut app = App::new(coord);
            app.run().await?;
        }
        Commands::Root => {
            library.init_roots().await;
            println!("{}", library.paths().auto_root());
        }
        Commands::Ls { path } => {
            library.init_roots().await;
            let target = path.unwrap_or_else(|| library.paths().auto_root().to_string());
            library.navigate(&Location::Path(target)).await;
            println!("{}", library.paths().auto_path());
            print_pane(library.pane(Mode::Auto));
        }
        Commands::Tree { dir_id } => {
            let target = dir_id.unwrap_or_else(|| ROOT_DIR_ID.to_string());
            library.navigate(&Location::Dir(target)).await;
            let pane = library.pane(Mode::Manual);
            let trail: Vec<&str> = pane.crumbs.iter().map(|c| c.label.as_str()).collect();
            println!("{}", trail.join(" / "));
            print_pane(pane);
        }
    }

    Ok(())
}

fn print_pane(pane: &Pane) {
    if pane.entries.is_empty() {
        println!("(empty)");
    }
    for entry in &pane.entries {
        let type_icon = if entry.is_dir { "📁" } else { "📄" };
        let size_str = entry.size.map(format_size).unwrap_or_default();
        let modified = entry.modified.as_deref().map(format_time).unwrap_or_default();
        println!(
            "  {} {:<48} {:>10}  {}",
            type_icon, entry.name, size_str, modified
        );
    }
    println!("{}", pane.status);
}
