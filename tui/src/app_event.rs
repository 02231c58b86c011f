use wallpick_core::ApplyResult;
use wallpick_core::RemoteImage;

#[derive(Debug)]
pub(crate) enum AppEvent {
    /// Result of the one catalog fetch made at startup. An unreachable or
    /// malformed listing arrives here as an empty catalog.
    CatalogLoaded(Vec<RemoteImage>),

    /// The debounce delay for preview job `generation` elapsed and its
    /// thumbnail fetch and rasterization have started.
    PreviewRendering { generation: u64 },

    /// Preview job `generation` finished. `Err` holds the message to show in
    /// the preview pane. The app layer drops results from superseded jobs.
    PreviewFinished {
        generation: u64,
        result: Result<String, String>,
    },

    /// The apply pipeline for `name` finished. `Err` means the download
    /// itself failed and holds the status line message.
    ApplyFinished {
        name: String,
        result: Result<ApplyResult, String>,
    },

    /// Request to exit the application gracefully.
    ExitRequest,
}
