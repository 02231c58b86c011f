use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::error::Result;
use crate::error::WallpickErr;

const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";

/// Target size of a preview, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellSize {
    pub width: u16,
    pub height: u16,
}

impl CellSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// One way of invoking the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProfile {
    pub label: &'static str,
    pub symbols: &'static str,
    pub dither: &'static str,
    pub colors: &'static str,
}

/// Sub-cell color blocks, no dithering, 256 colors.
pub const HIGH_FIDELITY: RenderProfile = RenderProfile {
    label: "high-fidelity",
    symbols: "block",
    dither: "none",
    colors: "256",
};

/// Plain ASCII glyphs without color.
pub const MINIMAL: RenderProfile = RenderProfile {
    label: "minimal",
    symbols: "ascii",
    dither: "none",
    colors: "none",
};

/// Runs a single rasterization attempt. Errors are plain strings because the
/// caller only ever logs them or shows the last one.
#[async_trait]
pub trait RasterBackend: Send + Sync {
    async fn rasterize(
        &self,
        path: &Path,
        size: CellSize,
        profile: RenderProfile,
    ) -> std::result::Result<String, String>;
}

/// Shells out to `chafa` (or a compatible program).
#[derive(Debug, Clone)]
pub struct ChafaBackend {
    program: String,
    timeout: Duration,
}

impl ChafaBackend {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn resolve_program(&self) -> std::result::Result<PathBuf, String> {
        which::which(&self.program).map_err(|_| format!("{} not found on PATH", self.program))
    }
}

pub(crate) fn chafa_args(path: &Path, size: CellSize, profile: RenderProfile) -> Vec<String> {
    vec![
        "--format=symbols".to_string(),
        format!("--size={}x{}", size.width.max(1), size.height.max(1)),
        format!("--symbols={}", profile.symbols),
        format!("--dither={}", profile.dither),
        format!("--colors={}", profile.colors),
        path.to_string_lossy().into_owned(),
    ]
}

#[async_trait]
impl RasterBackend for ChafaBackend {
    async fn rasterize(
        &self,
        path: &Path,
        size: CellSize,
        profile: RenderProfile,
    ) -> std::result::Result<String, String> {
        let program = self.resolve_program()?;
        let mut command = Command::new(program);
        command
            .args(chafa_args(path, size, profile))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| format!("{} timed out after {:?}", self.program, self.timeout))?
            .map_err(|err| format!("failed to run {}: {err}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Renders cached thumbnails as terminal text, falling back to the minimal
/// profile when the high-fidelity one fails.
pub struct Rasterizer {
    backend: Arc<dyn RasterBackend>,
}

impl Rasterizer {
    pub fn new(backend: Arc<dyn RasterBackend>) -> Self {
        Self { backend }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn render(&self, path: &Path, size: CellSize) -> Result<String> {
        let mut last_error = String::new();
        for profile in [HIGH_FIDELITY, MINIMAL] {
            match self.backend.rasterize(path, size, profile).await {
                Ok(output) => {
                    debug!(profile = profile.label, path = %path.display(), "rendered preview");
                    return Ok(clean_output(&output));
                }
                Err(err) => {
                    warn!(profile = profile.label, "rasterizer failed: {err}");
                    last_error = err;
                }
            }
        }
        Err(WallpickErr::RenderFailed {
            path: path.to_path_buf(),
            reason: last_error,
        })
    }
}

/// Strips cursor show/hide sequences (the preview pane owns the cursor) and
/// trailing blank lines.
pub fn clean_output(output: &str) -> String {
    let stripped = output.replace(HIDE_CURSOR, "").replace(SHOW_CURSOR, "");
    stripped.trim_end_matches(['\n', '\r', ' ']).to_string()
}
