use ansi_to_tui::IntoText;
use ratatui::text::Line;
use ratatui::text::Text;
use tracing::debug;

/// Parses rasterizer output into styled text. Output the parser rejects is
/// shown as plain text with control characters removed, so a bad preview can
/// never garble the rest of the screen.
pub(crate) fn ansi_text(input: &str) -> Text<'static> {
    match input.as_bytes().into_text() {
        Ok(text) => text,
        Err(err) => {
            debug!("falling back to plain preview text: {err}");
            Text::from(
                input
                    .lines()
                    .map(|line| Line::from(strip_controls(line)))
                    .collect::<Vec<_>>(),
            )
        }
    }
}

fn strip_controls(line: &str) -> String {
    line.chars().filter(|c| !c.is_control()).collect()
}
