use std::io::Stdout;
use std::io::stdout;
use std::pin::Pin;

use crossterm::cursor::Hide;
use crossterm::cursor::Show;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyEvent;
use crossterm::execute;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use ratatui::backend::CrosstermBackend;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

pub(crate) type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Clone, Copy)]
pub(crate) enum TuiEvent {
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Switches to the alternate screen in raw mode. The panic hook restores the
/// terminal before the report is printed.
pub(crate) fn init() -> std::io::Result<Terminal> {
    set_panic_hook();
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, Hide)?;
    Terminal::new(CrosstermBackend::new(stdout()))
}

pub(crate) fn restore() -> std::io::Result<()> {
    execute!(stdout(), LeaveAlternateScreen, Show)?;
    disable_raw_mode()
}

fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        hook(panic_info);
    }));
}

/// Key presses and resizes from the terminal. Read errors end the stream
/// entry, not the session.
pub(crate) fn event_stream() -> Pin<Box<dyn Stream<Item = TuiEvent>>> {
    Box::pin(EventStream::new().filter_map(|event| match event {
        Ok(Event::Key(key)) => Some(TuiEvent::Key(key)),
        Ok(Event::Resize(width, height)) => Some(TuiEvent::Resize(width, height)),
        Ok(_) => None,
        Err(err) => {
            warn!("terminal event error: {err}");
            None
        }
    }))
}
