use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::error::Result;
use crate::error::WallpickErr;

/// Placeholder replaced by the absolute image path in command templates.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Placeholder replaced by the percent-encoded `file://` URI of the image.
pub const URI_PLACEHOLDER: &str = "{uri}";

/// Environment variable carrying the image path, for scripts that would
/// otherwise have to quote it.
pub const IMAGE_ENV_VAR: &str = "WALLPICK_IMAGE";

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Makes an image the desktop background.
#[async_trait]
pub trait WallpaperSetter: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this strategy can run here at all. Unavailable strategies are
    /// skipped without being attempted.
    fn is_available(&self) -> bool {
        true
    }

    async fn apply(&self, path: &Path) -> std::result::Result<(), String>;
}

/// Runs one external command, then any best-effort follow-ups whose failure
/// is only logged.
#[derive(Debug, Clone)]
pub struct CommandSetter {
    name: String,
    argv: Vec<String>,
    followups: Vec<Vec<String>>,
    timeout: Duration,
}

impl CommandSetter {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            name: name.into(),
            argv,
            followups: Vec::new(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_followup(mut self, argv: Vec<String>) -> Self {
        self.followups.push(argv);
        self
    }

    async fn run(&self, argv: &[String], path: &Path) -> std::result::Result<(), String> {
        let argv = expand_argv(argv, path);
        let Some((program, args)) = argv.split_first() else {
            return Err("empty command".to_string());
        };
        let mut command = Command::new(program);
        command
            .args(args)
            .env(IMAGE_ENV_VAR, path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| format!("{program} timed out"))?
            .map_err(|err| format!("failed to run {program}: {err}"))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(format!("{program} exited with {}", output.status))
        } else {
            Err(format!("{program} exited with {}: {stderr}", output.status))
        }
    }
}

#[async_trait]
impl WallpaperSetter for CommandSetter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.argv
            .first()
            .is_some_and(|program| which::which(program).is_ok())
    }

    async fn apply(&self, path: &Path) -> std::result::Result<(), String> {
        self.run(&self.argv, path).await?;
        for followup in &self.followups {
            if let Err(err) = self.run(followup, path).await {
                warn!(strategy = %self.name, "follow-up step failed: {err}");
            }
        }
        Ok(())
    }
}

pub(crate) fn expand_argv(argv: &[String], path: &Path) -> Vec<String> {
    let uri = file_uri(path);
    let path = path.to_string_lossy();
    argv.iter()
        .map(|arg| {
            arg.replace(URI_PLACEHOLDER, &uri)
                .replace(PATH_PLACEHOLDER, &path)
        })
        .collect()
}

/// `file://` URI for an absolute path. Relative paths have no URI form and
/// are passed through unchanged.
fn file_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(String::from)
        .unwrap_or_else(|()| path.to_string_lossy().into_owned())
}

/// Tries each strategy in order and stops at the first success.
#[derive(Clone)]
pub struct WallpaperApplier {
    setters: Vec<Arc<dyn WallpaperSetter>>,
}

impl WallpaperApplier {
    pub fn new(setters: Vec<Arc<dyn WallpaperSetter>>) -> Self {
        Self { setters }
    }

    /// The configured command (if any) followed by the strategies for the
    /// platform this binary was built for.
    pub fn for_platform(custom_command: Option<Vec<String>>) -> Self {
        let mut setters: Vec<Arc<dyn WallpaperSetter>> = Vec::new();
        if let Some(argv) = custom_command {
            setters.push(Arc::new(CommandSetter::new("configured command", argv)));
        }
        setters.extend(
            platform_setters()
                .into_iter()
                .map(|setter| Arc::new(setter) as Arc<dyn WallpaperSetter>),
        );
        Self::new(setters)
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.setters.iter().map(|s| s.name().to_string()).collect()
    }

    /// Returns the name of the strategy that succeeded.
    pub async fn apply_with_details(&self, path: &Path) -> Result<String> {
        let mut failures = Vec::new();
        for setter in &self.setters {
            if !setter.is_available() {
                failures.push(format!("{}: not installed", setter.name()));
                continue;
            }
            info!(strategy = setter.name(), path = %path.display(), "applying wallpaper");
            match setter.apply(path).await {
                Ok(()) => return Ok(setter.name().to_string()),
                Err(err) => {
                    warn!(strategy = setter.name(), "wallpaper strategy failed: {err}");
                    failures.push(format!("{}: {err}", setter.name()));
                }
            }
        }
        if failures.is_empty() {
            return Err(WallpickErr::WallpaperApplyFailed(
                "no wallpaper strategy for this platform".to_string(),
            ));
        }
        Err(WallpickErr::WallpaperApplyFailed(failures.join("; ")))
    }
}

#[async_trait]
impl WallpaperSetter for WallpaperApplier {
    fn name(&self) -> &str {
        "platform"
    }

    async fn apply(&self, path: &Path) -> std::result::Result<(), String> {
        match self.apply_with_details(path).await {
            Ok(_) => Ok(()),
            Err(WallpickErr::WallpaperApplyFailed(detail)) => Err(detail),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_string()).collect()
}

#[cfg(target_os = "windows")]
fn platform_setters() -> Vec<CommandSetter> {
    // Registry write plus SystemParametersInfo(SPI_SETDESKWALLPAPER) so the
    // desktop refreshes immediately.
    const SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
$image = $env:WALLPICK_IMAGE
Set-ItemProperty -Path 'HKCU:\Control Panel\Desktop' -Name Wallpaper -Value $image
Add-Type -TypeDefinition @'
using System.Runtime.InteropServices;
public static class WallpickDesktop {
    [DllImport("user32.dll", SetLastError = true, CharSet = CharSet.Unicode)]
    public static extern bool SystemParametersInfo(int action, int param, string value, int flags);
}
'@
if (-not [WallpickDesktop]::SystemParametersInfo(20, 0, $image, 3)) { exit 1 }
"#;
    vec![
        CommandSetter::new(
            "powershell",
            argv(&[
                "powershell",
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                SCRIPT,
            ]),
        ),
        CommandSetter::new(
            "registry",
            argv(&[
                "reg",
                "add",
                r"HKCU\Control Panel\Desktop",
                "/v",
                "Wallpaper",
                "/t",
                "REG_SZ",
                "/d",
                PATH_PLACEHOLDER,
                "/f",
            ]),
        )
        .with_followup(argv(&[
            "RUNDLL32.EXE",
            "user32.dll,UpdatePerUserSystemParameters",
            "1",
            "True",
        ])),
    ]
}

#[cfg(target_os = "macos")]
fn platform_setters() -> Vec<CommandSetter> {
    vec![CommandSetter::new(
        "osascript",
        argv(&[
            "osascript",
            "-e",
            "on run argv",
            "-e",
            "tell application \"System Events\" to tell every desktop to set picture to POSIX file (item 1 of argv)",
            "-e",
            "end run",
            PATH_PLACEHOLDER,
        ]),
    )]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_setters() -> Vec<CommandSetter> {
    vec![
        CommandSetter::new("swww", argv(&["swww", "img", PATH_PLACEHOLDER])),
        CommandSetter::new(
            "plasma",
            argv(&["plasma-apply-wallpaperimage", PATH_PLACEHOLDER]),
        ),
        CommandSetter::new(
            "gsettings",
            argv(&[
                "gsettings",
                "set",
                "org.gnome.desktop.background",
                "picture-uri",
                URI_PLACEHOLDER,
            ]),
        )
        .with_followup(argv(&[
            "gsettings",
            "set",
            "org.gnome.desktop.background",
            "picture-uri-dark",
            URI_PLACEHOLDER,
        ])),
        CommandSetter::new("feh", argv(&["feh", "--bg-fill", PATH_PLACEHOLDER])),
    ]
}
