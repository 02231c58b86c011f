use ratatui::buffer::Buffer;
use ratatui::layout::Alignment;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;
use ratatui::widgets::Paragraph;
use ratatui::widgets::StatefulWidget;
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;
use wallpick_core::CellSize;
use wallpick_core::RemoteImage;

use crate::ansi::ansi_text;
use crate::app::App;
use crate::app::CatalogState;
use crate::app::StatusKind;
use crate::navigation::PreviewPane;
use crate::navigation::PreviewPhase;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const HIGHLIGHT_SYMBOL: &str = "› ";
const KEY_HINTS: &str = "↑/↓ move · PgUp/PgDn page · Enter set wallpaper · q quit";

/// Screen regions. Shared with the resize handler so the preview is
/// rasterized at exactly the size it is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AppLayout {
    pub(crate) title: Rect,
    pub(crate) list: Rect,
    pub(crate) preview: Rect,
    pub(crate) status: Rect,
}

impl AppLayout {
    pub(crate) fn new(area: Rect) -> Self {
        let [title, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);
        let [list, preview] =
            Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
                .areas(body);
        Self {
            title,
            list,
            preview,
            status,
        }
    }

    pub(crate) fn body(&self) -> Rect {
        self.list.union(self.preview)
    }

    /// Rows available for list entries inside the border.
    pub(crate) fn list_rows(&self) -> u16 {
        self.list.height.saturating_sub(2)
    }

    pub(crate) fn preview_cell_size(&self) -> CellSize {
        CellSize::new(
            self.preview.width.saturating_sub(2),
            self.preview.height.saturating_sub(2),
        )
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = AppLayout::new(area);
        render_title(self, layout.title, buf);
        match self.catalog_state() {
            CatalogState::Loading => render_message("Loading catalog…", layout.body(), buf),
            CatalogState::Empty => render_message(
                &format!("No images found in {}", self.repo_label()),
                layout.body(),
                buf,
            ),
            CatalogState::Ready => {
                render_list(self, layout.list, buf);
                render_preview(self, layout.preview, buf);
            }
        }
        render_status(self, layout.status, buf);
    }
}

fn render_title(app: &App, area: Rect, buf: &mut Buffer) {
    let mut spans = vec!["wallpick".bold(), " · ".dim(), Span::from(app.title().to_string())];
    if app.catalog_state() == CatalogState::Ready {
        let count = app.navigator().catalog().len();
        let noun = if count == 1 { "image" } else { "images" };
        spans.push(" · ".dim());
        spans.push(format!("{count} {noun}").dim());
    }
    Line::from(spans).render(area, buf);
}

fn render_message(message: &str, area: Rect, buf: &mut Buffer) {
    let inner_height = area.height.saturating_sub(2);
    let top = Rect {
        y: area.y + 1 + inner_height / 2,
        height: inner_height.min(1),
        ..area
    };
    Block::bordered().render(area, buf);
    Paragraph::new(message.to_string().dim())
        .alignment(Alignment::Center)
        .render(top, buf);
}

fn render_list(app: &App, area: Rect, buf: &mut Buffer) {
    let navigator = app.navigator();
    let width = usize::from(area.width.saturating_sub(2))
        .saturating_sub(HIGHLIGHT_SYMBOL.width());
    let items: Vec<ListItem> = navigator
        .catalog()
        .iter()
        .map(|image| ListItem::new(list_line(image, width)))
        .collect();
    let list = List::new(items)
        .block(Block::bordered().title(" Images "))
        .highlight_style(Style::new().reversed())
        .highlight_symbol(HIGHLIGHT_SYMBOL);
    let mut state = ListState::default().with_selected(navigator.selected_index());
    StatefulWidget::render(list, area, buf, &mut state);
}

/// `name` on the left, size in MB right-aligned, truncating the name first.
fn list_line(image: &RemoteImage, width: usize) -> Line<'static> {
    let size = image.display_size();
    let size_width = size.width();
    let name = truncate_to_width(&image.name, width.saturating_sub(size_width + 1));
    let pad = width.saturating_sub(name.width() + size_width).max(1);
    Line::from(vec![
        Span::from(name),
        Span::from(" ".repeat(pad)),
        size.dim(),
    ])
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    if max_width > 0 {
        out.push('…');
    }
    out
}

fn render_preview(app: &App, area: Rect, buf: &mut Buffer) {
    let title = app
        .navigator()
        .selected()
        .map(|image| format!(" {} ", image.name))
        .unwrap_or_default();
    let block = Block::bordered().title(title);
    let inner = block.inner(area);
    block.render(area, buf);

    match app.navigator().pane() {
        PreviewPane::Empty => {}
        PreviewPane::Loading => {
            let label = match app.navigator().phase() {
                PreviewPhase::Rendering => "Rendering…",
                PreviewPhase::Idle | PreviewPhase::Debouncing => "Loading…",
            };
            Paragraph::new(label.dim()).render(inner, buf);
        }
        PreviewPane::Content(text) => Paragraph::new(ansi_text(text)).render(inner, buf),
        PreviewPane::Error(message) => {
            Paragraph::new(message.clone().red()).render(inner, buf);
        }
    }
}

fn render_status(app: &App, area: Rect, buf: &mut Buffer) {
    let line = if let Some(name) = app.applying() {
        let frame = SPINNER_FRAMES[app.spinner_frame() % SPINNER_FRAMES.len()];
        Line::from(vec![
            frame.cyan(),
            format!(" Applying {name}…").into(),
        ])
    } else if let Some(status) = app.status() {
        let text = status.text.clone();
        Line::from(match status.kind {
            StatusKind::Info => text.green(),
            StatusKind::Error => text.red(),
        })
    } else {
        Line::from(KEY_HINTS.dim())
    };
    line.render(area, buf);
}
