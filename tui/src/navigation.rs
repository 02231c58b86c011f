//! Selection tracking and the debounced preview state machine.
//!
//! Every selection change supersedes the previous preview job: its debounce
//! timer is cancelled, and if it had already started rendering, its result is
//! dropped when it arrives. Only the newest generation may write to the
//! preview pane.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use wallpick_core::CellSize;
use wallpick_core::PreviewSource;
use wallpick_core::RemoteImage;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PreviewPhase {
    Idle,
    Debouncing,
    Rendering,
}

/// What the preview pane currently shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PreviewPane {
    /// Nothing selected yet.
    Empty,
    Loading,
    /// Rasterized text, possibly with ANSI color sequences.
    Content(String),
    Error(String),
}

#[derive(Debug)]
struct PreviewJob {
    generation: u64,
    cancel: CancellationToken,
}

/// The selected index plus the job working on its preview.
#[derive(Debug, Default)]
pub(crate) struct SelectionState {
    current_index: usize,
    pending: Option<PreviewJob>,
}

impl SelectionState {
    pub(crate) fn current_index(&self) -> usize {
        self.current_index
    }

    fn pending_generation(&self) -> Option<u64> {
        self.pending.as_ref().map(|job| job.generation)
    }
}

pub(crate) struct Navigator {
    catalog: Vec<RemoteImage>,
    selection: SelectionState,
    phase: PreviewPhase,
    pane: PreviewPane,
    size: CellSize,
    debounce: Duration,
    next_generation: u64,
    source: Arc<dyn PreviewSource>,
    app_event_tx: AppEventSender,
}

impl Navigator {
    pub(crate) fn new(
        source: Arc<dyn PreviewSource>,
        debounce: Duration,
        app_event_tx: AppEventSender,
    ) -> Self {
        Self {
            catalog: Vec::new(),
            selection: SelectionState::default(),
            phase: PreviewPhase::Idle,
            pane: PreviewPane::Empty,
            size: CellSize::new(0, 0),
            debounce,
            next_generation: 0,
            source,
            app_event_tx,
        }
    }

    /// Installs the session's catalog and previews the first entry.
    pub(crate) fn set_catalog(&mut self, catalog: Vec<RemoteImage>) {
        self.catalog = catalog;
        self.selection.current_index = 0;
        if !self.catalog.is_empty() {
            self.schedule_preview();
        }
    }

    pub(crate) fn catalog(&self) -> &[RemoteImage] {
        &self.catalog
    }

    pub(crate) fn selected_index(&self) -> Option<usize> {
        (!self.catalog.is_empty()).then_some(self.selection.current_index())
    }

    pub(crate) fn selected(&self) -> Option<&RemoteImage> {
        self.catalog.get(self.selection.current_index())
    }

    pub(crate) fn phase(&self) -> PreviewPhase {
        self.phase
    }

    pub(crate) fn pane(&self) -> &PreviewPane {
        &self.pane
    }

    /// Moves the selection by `delta` entries, clamped to the catalog.
    pub(crate) fn move_by(&mut self, delta: isize) {
        let current = self.selection.current_index();
        self.select(current.saturating_add_signed(delta));
    }

    pub(crate) fn select_first(&mut self) {
        self.select(0);
    }

    pub(crate) fn select_last(&mut self) {
        self.select(usize::MAX);
    }

    /// Selects `index` (clamped). Reselecting the current entry is a no-op.
    pub(crate) fn select(&mut self, index: usize) {
        let Some(last) = self.catalog.len().checked_sub(1) else {
            return;
        };
        let index = index.min(last);
        if index == self.selection.current_index() {
            return;
        }
        self.selection.current_index = index;
        self.schedule_preview();
    }

    /// Re-renders the current selection at the new pane size.
    pub(crate) fn resize(&mut self, size: CellSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        if !self.catalog.is_empty() {
            self.schedule_preview();
        }
    }

    pub(crate) fn on_render_started(&mut self, generation: u64) {
        if self.selection.pending_generation() == Some(generation) {
            self.phase = PreviewPhase::Rendering;
        }
    }

    /// Applies a finished job's result. Returns false when the job was
    /// superseded and its result was dropped.
    pub(crate) fn on_preview_finished(
        &mut self,
        generation: u64,
        result: Result<String, String>,
    ) -> bool {
        if self.selection.pending_generation() != Some(generation) {
            debug!(generation, "discarding stale preview result");
            return false;
        }
        self.selection.pending = None;
        self.phase = PreviewPhase::Idle;
        self.pane = match result {
            Ok(text) => PreviewPane::Content(text),
            Err(message) => PreviewPane::Error(message),
        };
        true
    }

    fn schedule_preview(&mut self) {
        if let Some(previous) = self.selection.pending.take() {
            previous.cancel.cancel();
        }
        let Some(image) = self.selected().cloned() else {
            return;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();
        self.selection.pending = Some(PreviewJob {
            generation,
            cancel: cancel.clone(),
        });
        self.phase = PreviewPhase::Debouncing;
        self.pane = PreviewPane::Loading;

        let source = self.source.clone();
        let tx = self.app_event_tx.clone();
        let debounce = self.debounce;
        let size = self.size;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
            // Past this point the job always runs to completion; the app
            // drops the result if a newer generation exists by then.
            tx.send(AppEvent::PreviewRendering { generation });
            let result = source
                .preview(&image, size)
                .await
                .map_err(|err| {
                    debug!(name = %image.name, "preview failed: {err}");
                    err.user_message()
                });
            tx.send(AppEvent::PreviewFinished { generation, result });
        });
    }
}
