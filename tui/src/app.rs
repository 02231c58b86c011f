use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tracing::info;
use tracing::warn;
use wallpick_core::Acquirer;
use wallpick_core::ApplyResult;
use wallpick_core::config::SourceConfig;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::navigation::Navigator;
use crate::render::AppLayout;
use crate::tui;
use crate::tui::TuiEvent;

const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CatalogState {
    Loading,
    /// Nothing to show. Navigation and confirmation are disabled for the rest
    /// of the session.
    Empty,
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StatusMessage {
    pub(crate) text: String,
    pub(crate) kind: StatusKind,
}

pub(crate) struct App {
    title: String,
    repo_label: String,
    catalog_state: CatalogState,
    navigator: Navigator,
    acquirer: Arc<Acquirer>,
    /// Name of the image whose apply pipeline is in flight.
    applying: Option<String>,
    status: Option<StatusMessage>,
    spinner_frame: usize,
    page_size: usize,
    app_event_tx: AppEventSender,
    should_exit: bool,
}

impl App {
    pub(crate) fn new(
        source: &SourceConfig,
        navigator: Navigator,
        acquirer: Arc<Acquirer>,
        app_event_tx: AppEventSender,
    ) -> Self {
        Self {
            title: source.display_name(),
            repo_label: format!("{}/{}", source.owner, source.repo),
            catalog_state: CatalogState::Loading,
            navigator,
            acquirer,
            applying: None,
            status: None,
            spinner_frame: 0,
            page_size: 10,
            app_event_tx,
            should_exit: false,
        }
    }

    pub(crate) async fn run(
        &mut self,
        terminal: &mut tui::Terminal,
        mut app_event_rx: UnboundedReceiver<AppEvent>,
    ) -> color_eyre::Result<()> {
        let mut tui_events = tui::event_stream();
        let mut ticker = tokio::time::interval(SPINNER_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let size = terminal.size()?;
        self.handle_resize(Rect::new(0, 0, size.width, size.height));

        let mut redraw = true;
        while !self.should_exit {
            if redraw {
                terminal.draw(|frame| frame.render_widget(&*self, frame.area()))?;
            }
            redraw = tokio::select! {
                Some(event) = app_event_rx.recv() => {
                    self.handle_app_event(event);
                    true
                }
                Some(event) = tui_events.next() => {
                    self.handle_tui_event(event);
                    true
                }
                _ = ticker.tick() => self.on_tick(),
            };
        }
        Ok(())
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn repo_label(&self) -> &str {
        &self.repo_label
    }

    pub(crate) fn catalog_state(&self) -> CatalogState {
        self.catalog_state
    }

    pub(crate) fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub(crate) fn applying(&self) -> Option<&str> {
        self.applying.as_deref()
    }

    pub(crate) fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub(crate) fn spinner_frame(&self) -> usize {
        self.spinner_frame
    }

    fn is_busy(&self) -> bool {
        self.catalog_state == CatalogState::Loading || self.applying.is_some()
    }

    /// Advances the spinner. Returns whether a redraw is needed.
    fn on_tick(&mut self) -> bool {
        if !self.is_busy() {
            return false;
        }
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        true
    }

    pub(crate) fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded(images) => {
                self.catalog_state = if images.is_empty() {
                    CatalogState::Empty
                } else {
                    CatalogState::Ready
                };
                self.navigator.set_catalog(images);
            }
            AppEvent::PreviewRendering { generation } => {
                self.navigator.on_render_started(generation);
            }
            AppEvent::PreviewFinished { generation, result } => {
                self.navigator.on_preview_finished(generation, result);
            }
            AppEvent::ApplyFinished { name, result } => {
                self.applying = None;
                self.status = Some(match result {
                    Ok(result) => apply_status(&result),
                    Err(message) => StatusMessage {
                        text: message,
                        kind: StatusKind::Error,
                    },
                });
                info!(name = %name, "apply pipeline finished");
            }
            AppEvent::ExitRequest => {
                self.should_exit = true;
            }
        }
    }

    fn handle_tui_event(&mut self, event: TuiEvent) {
        match event {
            TuiEvent::Key(key) => self.handle_key(key),
            TuiEvent::Resize(width, height) => {
                self.handle_resize(Rect::new(0, 0, width, height));
            }
        }
    }

    pub(crate) fn handle_resize(&mut self, area: Rect) {
        let layout = AppLayout::new(area);
        self.page_size = usize::from(layout.list_rows()).max(1);
        self.navigator.resize(layout.preview_cell_size());
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.app_event_tx.send(AppEvent::ExitRequest);
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.app_event_tx.send(AppEvent::ExitRequest);
            }
            _ if self.catalog_state != CatalogState::Ready => {}
            KeyCode::Up | KeyCode::Char('k') => self.navigator.move_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.navigator.move_by(1),
            KeyCode::PageUp => self.navigator.move_by(-page_delta(self.page_size)),
            KeyCode::PageDown => self.navigator.move_by(page_delta(self.page_size)),
            KeyCode::Home | KeyCode::Char('g') => self.navigator.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.navigator.select_last(),
            KeyCode::Enter => self.confirm(),
            _ => {}
        }
    }

    /// Starts the download and apply pipeline for the selected image unless
    /// one is already running.
    fn confirm(&mut self) {
        let Some(image) = self.navigator.selected().cloned() else {
            return;
        };
        if let Some(name) = &self.applying {
            warn!(requested = %image.name, running = %name, "rejecting overlapping apply");
            self.status = Some(StatusMessage {
                text: format!("already applying {name}"),
                kind: StatusKind::Error,
            });
            return;
        }

        self.applying = Some(image.name.clone());
        self.status = None;
        let acquirer = self.acquirer.clone();
        let tx = self.app_event_tx.clone();
        tokio::spawn(async move {
            let result = acquirer
                .acquire_and_apply(&image)
                .await
                .map_err(|err| {
                    warn!("{err}");
                    err.user_message()
                });
            tx.send(AppEvent::ApplyFinished {
                name: image.name,
                result,
            });
        });
    }
}

fn page_delta(page_size: usize) -> isize {
    isize::try_from(page_size).unwrap_or(isize::MAX)
}

fn apply_status(result: &ApplyResult) -> StatusMessage {
    StatusMessage {
        text: result.status_message(),
        kind: if result.wallpaper_applied {
            StatusKind::Info
        } else {
            StatusKind::Error
        },
    }
}
