use crate::sim::Pointer;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    HelpToggle,
    /// Pointer moved over terminal cell (col, row).
    PointerAt(u16, u16),
    Resize(u16, u16),
}

/// Wait up to `timeout` for the first event, then drain whatever else is queued.
pub(crate) fn collect_input(timeout: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();
    let mut wait = timeout;
    while event::poll(wait)? {
        out.push(event::read()?);
        if out.len() >= 64 {
            break;
        }
        wait = Duration::ZERO;
    }
    Ok(out)
}

pub(crate) fn map_event(ev: Event) -> Option<Action> {
    match ev {
        Event::Key(k) => map_key(k),
        Event::Mouse(m) => map_mouse(m),
        Event::Resize(w, h) => Some(Action::Resize(w, h)),
        _ => None,
    }
}

fn map_key(k: KeyEvent) -> Option<Action> {
    if k.kind == KeyEventKind::Release {
        return None;
    }
    if k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c')) {
        return Some(Action::Quit);
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(Action::HelpToggle),
        _ => None,
    }
}

fn map_mouse(m: MouseEvent) -> Option<Action> {
    match m.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {
            Some(Action::PointerAt(m.column, m.row))
        }
        _ => None,
    }
}

/// Last pointer position in surface units. The surface covers the whole
/// terminal, so a cell maps straight to the middle of its 2×4 dot block.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PointerTracker {
    last: Pointer,
}

impl PointerTracker {
    pub(crate) fn move_to_cell(&mut self, col: u16, row: u16) {
        self.last = Pointer {
            x: col as f32 * 2.0 + 1.0,
            y: row as f32 * 4.0 + 2.0,
        };
    }

    pub(crate) fn position(&self) -> Pointer {
        self.last
    }
}
