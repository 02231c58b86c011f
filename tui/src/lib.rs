//! Terminal front end for wallpick: a list of the remote images, a debounced
//! rasterized preview of the selected one, and a confirm key that downloads
//! it and sets it as the desktop background.

use std::sync::Arc;

use tokio::sync::mpsc::unbounded_channel;
use tracing::info;
use wallpick_core::Acquirer;
use wallpick_core::CatalogFetcher;
use wallpick_core::Config;
use wallpick_core::PreviewCache;
use wallpick_core::PreviewPipeline;
use wallpick_core::Rasterizer;
use wallpick_core::WallpaperApplier;
use wallpick_core::config::find_wallpick_home;
use wallpick_core::http::build_client;
use wallpick_core::rasterizer::ChafaBackend;

mod ansi;
mod app;
mod app_event;
mod app_event_sender;
mod cli;
mod logging;
mod navigation;
mod render;
mod tui;

pub use cli::Cli;

use crate::app::App;
use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::navigation::Navigator;

pub async fn run_main(cli: Cli) -> color_eyre::Result<()> {
    let wallpick_home = find_wallpick_home()?;
    let config = Config::load(wallpick_home, cli.config.as_deref())?;
    let _log_guard = logging::init(&config);
    info!(
        source = %config.source.display_name(),
        save_dir = %config.download.save_dir.display(),
        "starting wallpick"
    );

    let http = build_client(config.request_timeout)?;
    let (app_event_tx, app_event_rx) = unbounded_channel();
    let app_event_tx = AppEventSender::new(app_event_tx);

    let fetcher = CatalogFetcher::new(
        http.clone(),
        config.source.clone(),
        config.thumbnails.clone(),
        config.request_timeout,
    );
    let tx = app_event_tx.clone();
    tokio::spawn(async move {
        tx.send(AppEvent::CatalogLoaded(fetcher.list_images().await));
    });

    let cache = Arc::new(PreviewCache::for_session(
        http.clone(),
        &config.cache_root,
        config.request_timeout,
    )?);
    let rasterizer = Rasterizer::new(Arc::new(ChafaBackend::new(
        config.preview.rasterizer.clone(),
        config.preview.render_timeout,
    )));
    let navigator = Navigator::new(
        Arc::new(PreviewPipeline::new(cache, rasterizer)),
        config.preview.debounce,
        app_event_tx.clone(),
    );

    let applier = WallpaperApplier::for_platform(config.wallpaper_command.clone());
    info!(strategies = ?applier.strategy_names(), "wallpaper strategies");
    let acquirer = Arc::new(Acquirer::new(http, &config.download, Arc::new(applier)));

    let mut app = App::new(&config.source, navigator, acquirer, app_event_tx);
    let mut terminal = tui::init()?;
    let result = app.run(&mut terminal, app_event_rx).await;
    let restored = tui::restore();
    result?;
    restored?;
    Ok(())
}
