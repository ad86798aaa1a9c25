//! Input handling.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::Command;

use super::app::App;

/// Handle a crossterm event.
/// Returns true if the event was handled.
pub fn handle_input(app: &mut App, event: Event) -> bool {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Resize(_, _) => {
            app.mark_dirty();
            true
        }
        _ => false,
    }
}

/// Handle a key event.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return true;
    }

    app.status = None;
    if app.list_visible() {
        return handle_list_key(app, key);
    }

    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            true
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_cursor(1);
            true
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_cursor(-1);
            true
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.move_cursor(app.page_size());
            true
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.move_cursor(-app.page_size());
            true
        }
        KeyCode::PageDown => {
            app.move_cursor(app.page_size() * 2);
            true
        }
        KeyCode::PageUp => {
            app.move_cursor(-app.page_size() * 2);
            true
        }
        KeyCode::Char('g') | KeyCode::Home => {
            app.cursor_to_top();
            true
        }
        KeyCode::Char('G') | KeyCode::End => {
            app.cursor_to_bottom();
            true
        }
        KeyCode::Char(']') | KeyCode::Char('n') => app.dispatch(Command::MoveToNextHunk),
        KeyCode::Char('[') | KeyCode::Char('N') | KeyCode::Char('p') => {
            app.dispatch(Command::MoveToPreviousHunk)
        }
        KeyCode::Char('l') => app.dispatch(Command::ToggleHunkList),
        KeyCode::Char('i') => {
            app.toggle_icons();
            true
        }
        KeyCode::Char('w') => {
            app.toggle_wrap();
            true
        }
        KeyCode::Char('#') => {
            app.toggle_line_numbers();
            true
        }
        KeyCode::Char('r') => {
            app.reload();
            true
        }
        _ => false,
    }
}

/// Handle keys while the hunk list is open.
fn handle_list_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.list_cancel();
            true
        }
        KeyCode::Enter => {
            app.list_confirm();
            true
        }
        KeyCode::Down => {
            app.list_select_next();
            true
        }
        KeyCode::Up => {
            app.list_select_prev();
            true
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.list_select_next();
            true
        }
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.list_select_prev();
            true
        }
        KeyCode::Backspace => {
            app.list_pop_char();
            true
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.list_push_char(c);
            true
        }
        _ => false,
    }
}
