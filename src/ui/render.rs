//! UI rendering with ratatui.
//!
//! Layout: top bar, text view with a change gutter, bottom bar. The hunk list
//! draws as a centered overlay.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::core::{DecorationClass, Editor};

use super::app::App;
use super::editor::{ListView, TerminalEditor};
use super::palette::{class_icon, Palette};

/// Main render function.
pub fn render(frame: &mut Frame, app: &mut App) {
    let _timer = crate::metrics::Timer::start("render_frame");

    let bg_block = Block::default().style(Style::default().bg(app.palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Top bar
            Constraint::Min(0),    // Text view
            Constraint::Length(1), // Bottom bar
        ])
        .split(frame.area());

    render_top_bar(frame, app, chunks[0]);
    render_text(frame, app, chunks[1]);
    render_bottom_bar(frame, app, chunks[2]);

    if let Some(view) = app.list().view() {
        render_hunk_list(frame, &app.palette, app.list_query(), &view);
    }
}

fn render_top_bar(frame: &mut Frame, app: &App, area: Rect) {
    let p = &app.palette;
    let bar = Style::default().bg(p.bg_elevated);

    let path = app
        .editor()
        .path()
        .map(|path| {
            path.strip_prefix(app.root())
                .unwrap_or(path.as_path())
                .display()
                .to_string()
        })
        .unwrap_or_else(|| "untitled".to_string());
    let state = if !app.is_bound() {
        ("resolving…", p.text_muted)
    } else if app.in_repository() {
        ("git", p.accent)
    } else {
        ("untracked", p.text_muted)
    };

    let hunks = app.hunks().len();
    let line = Line::from(vec![
        Span::styled("  ", bar),
        Span::styled(
            path,
            bar.fg(p.text_bright).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", bar),
        Span::styled(state.0, bar.fg(state.1)),
        Span::styled(
            format!("  {} {}", hunks, if hunks == 1 { "hunk" } else { "hunks" }),
            bar.fg(p.text_normal),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).style(bar), area);
}

fn render_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    let p = &app.palette;
    let bar = Style::default().bg(p.bg_elevated);

    let text = match &app.status {
        Some(msg) => Span::styled(format!(" {msg}"), bar.fg(p.text_bright)),
        None if app.list_visible() => Span::styled(
            " type to filter  ↑↓ select  enter jump  esc close",
            bar.fg(p.text_muted),
        ),
        None => Span::styled(
            " ]/[ next/prev diff  l list  i icons  w wrap  # numbers  r reload  q quit",
            bar.fg(p.text_muted),
        ),
    };

    let (row, col) = app.editor().cursor();
    let pos = Span::styled(format!("{}:{} ", row + 1, col + 1), bar.fg(p.text_normal));
    let pos_width = pos.width() as u16;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(pos_width)])
        .split(area);

    frame.render_widget(Paragraph::new(Line::from(text)).style(bar), chunks[0]);
    frame.render_widget(Paragraph::new(Line::from(pos)).style(bar), chunks[1]);
}

fn render_text(frame: &mut Frame, app: &mut App, area: Rect) {
    let height = area.height as usize;
    app.scroll_to_cursor(height);

    let settings = app.settings();
    let editor = app.editor();
    let p = &app.palette;
    let buffer = editor.buffer();
    let (cursor_row, _) = editor.cursor();
    let icons = editor.gutter_icons();
    let number_width = buffer.line_count().max(1).to_string().len();

    let mut lines = Vec::with_capacity(height);
    for row in app.scroll_y..(app.scroll_y + height).min(buffer.line_count()) {
        let class = editor.row_class(row);
        let bg = if row == cursor_row { p.bg_cursor } else { p.bg_dark };
        let base = Style::default().bg(bg);

        let mut spans = Vec::with_capacity(4);
        spans.push(gutter_span(class, icons, p, base));

        if settings.show_line_numbers {
            let fg = match class {
                Some(class) if !icons => p.class_color(class),
                _ => p.text_muted,
            };
            spans.push(Span::styled(
                format!("{:>width$} ", row + 1, width = number_width),
                base.fg(fg),
            ));
        }

        let text: String = buffer
            .line(row)
            .unwrap_or_default()
            .chars()
            .map(sanitize_char)
            .collect();
        spans.push(Span::styled(text, base.fg(p.text_normal)));
        lines.push(Line::from(spans).style(base));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn gutter_span(
    class: Option<DecorationClass>,
    icons: bool,
    p: &Palette,
    base: Style,
) -> Span<'static> {
    match class {
        Some(class) if icons => Span::styled(
            format!("{} ", class_icon(class)),
            base.fg(p.class_color(class)).add_modifier(Modifier::BOLD),
        ),
        Some(class) => Span::styled("▎ ", base.fg(p.class_color(class))),
        None => Span::styled("  ", base),
    }
}

/// Render the hunk list overlay.
fn render_hunk_list(frame: &mut Frame, p: &Palette, query: &str, view: &ListView) {
    let area = frame.area();

    let width = 60.min(area.width.saturating_sub(4));
    let rows = view.entries.len().clamp(1, 200) as u16;
    let height = (rows + 3).min(area.height.saturating_sub(4));

    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(p.accent))
        .title(Span::styled(
            " Diffs ",
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(p.bg_elevated));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let visible_height = (inner.height as usize).saturating_sub(1);
    if inner.height == 0 {
        return;
    }

    let mut lines: Vec<Line> = vec![Line::from(vec![
        Span::styled("> ", Style::default().fg(p.accent).bg(p.bg_elevated)),
        Span::styled(
            query.to_string(),
            Style::default().fg(p.text_bright).bg(p.bg_elevated),
        ),
    ])];

    if view.entries.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(" {}", view.empty_message),
            Style::default().fg(p.text_muted).bg(p.bg_elevated),
        )));
    }

    let selected = view.selected.unwrap_or(0);
    let scroll = selected.saturating_sub(visible_height.saturating_sub(1));
    let text_width = (inner.width as usize).saturating_sub(16);

    for (i, entry) in view
        .entries
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible_height)
    {
        let is_selected = view.selected == Some(i);
        let row_bg = if is_selected { p.bg_selected } else { p.bg_elevated };
        let text_color = if is_selected { p.text_bright } else { p.text_normal };
        let indicator = if is_selected { "▌" } else { " " };

        lines.push(Line::from(vec![
            Span::styled(indicator, Style::default().fg(p.accent).bg(row_bg)),
            Span::styled(
                format!(" {:<w$}", truncate_str(&entry.line_text, text_width), w = text_width),
                Style::default().fg(text_color).bg(row_bg),
            ),
            Span::styled(
                format!(" {:>13}", entry.label),
                Style::default().fg(p.text_muted).bg(row_bg),
            ),
        ]));
    }

    let para = Paragraph::new(lines).style(Style::default().bg(p.bg_elevated));
    frame.render_widget(para, inner);
}

/// Plain-text rendering of the file with its gutter, for non-interactive use.
///
/// Each row is prefixed with a change marker (`+` added, `~` modified, `_`
/// removed below, `‾` removed above) and optionally its line number.
pub fn annotate(editor: &TerminalEditor, show_line_numbers: bool) -> String {
    let buffer = editor.buffer();
    let number_width = buffer.line_count().max(1).to_string().len();
    let mut out = String::with_capacity(buffer.len() + buffer.line_count() * 8);

    for row in 0..buffer.line_count() {
        let marker = editor.row_class(row).map(class_icon).unwrap_or(' ');
        out.push(marker);
        out.push(' ');
        if show_line_numbers {
            out.push_str(&format!("{:>width$} ", row + 1, width = number_width));
        }
        out.push_str(buffer.line(row).unwrap_or_default());
        out.push('\n');
    }
    out
}

/// Sanitize control characters.
fn sanitize_char(c: char) -> char {
    match c {
        '\t' => ' ',
        '\x00'..='\x1f' | '\x7f' => '\u{FFFD}',
        _ => c,
    }
}

fn truncate_str(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len == 0 {
        String::new()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}…", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BufferId, RowRange};

    #[test]
    fn annotate_marks_decorated_rows() {
        let editor = TerminalEditor::from_text(BufferId(1), None, "one\ntwo\nthree\n");
        editor.mark_rows(RowRange::single(1), DecorationClass::Added);
        editor.mark_rows(RowRange::single(2), DecorationClass::Removed);

        assert_eq!(annotate(&editor, false), "  one\n+ two\n_ three\n");
        assert_eq!(annotate(&editor, true), "  1 one\n+ 2 two\n_ 3 three\n");
    }

    #[test]
    fn truncates_with_ellipsis() {
        assert_eq!(truncate_str("abcdef", 4), "abc…");
        assert_eq!(truncate_str("abc", 4), "abc");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn control_chars_are_replaced() {
        assert_eq!(sanitize_char('\x07'), '\u{FFFD}');
        assert_eq!(sanitize_char('\t'), ' ');
        assert_eq!(sanitize_char('x'), 'x');
    }
}
