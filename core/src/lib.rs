//! Pipeline stages behind the wallpick terminal browser: listing the remote
//! collection, caching and rasterizing thumbnails, and downloading and
//! applying a chosen image as the desktop background.
//!
//! Nothing here touches the terminal; the TUI crate drives these stages and
//! turns their errors into status text.

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod preview;
pub mod preview_cache;
pub mod rasterizer;
pub mod wallpaper;

pub use acquire::Acquirer;
pub use acquire::ApplyResult;
pub use catalog::CatalogFetcher;
pub use catalog::RemoteImage;
pub use config::Config;
pub use error::Result;
pub use error::WallpickErr;
pub use preview::PreviewPipeline;
pub use preview::PreviewSource;
pub use preview_cache::PreviewCache;
pub use rasterizer::CellSize;
pub use rasterizer::Rasterizer;
pub use wallpaper::WallpaperApplier;
pub use wallpaper::WallpaperSetter;
