//! Layout and drawing: playfield, ghost piece, sidebar, pause and game-over overlays.

use crate::game::{GameState, Status};
use crate::piece::Cell;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per grid cell; blocks are drawn as "██" to look square.
pub const CELL_WIDTH: u16 = 2;
/// Terminal rows per grid cell.
pub const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the line-clear flash in ms.
const LINE_CLEAR_FADE_MS: u32 = 350;

const BLOCK: &str = "██";
const GHOST: &str = "░░";
const EMPTY: &str = " ·";

/// Playfield size in terminal cells (border + grid) for given grid dimensions.
fn playfield_size(width: u16, height: u16) -> (u16, u16) {
    (width * CELL_WIDTH + 2, height * CELL_HEIGHT + 2)
}

fn board_dims(state: &GameState) -> (u16, u16) {
    let stack = state.stack();
    (stack.width() as u16, stack.height() as u16)
}

/// Playfield outer rect (with border), centred together with the sidebar.
fn playfield_outer_rect(area: Rect, state: &GameState) -> Rect {
    let (w, h) = board_dims(state);
    let (pw, ph) = playfield_size(w, h);
    let total_w = pw + SIDEBAR_WIDTH;
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(ph) / 2,
        width: pw.min(area.width),
        height: ph.min(area.height),
    }
}

/// Playfield inner rect (board only, no border); clipped to `area`.
pub fn playfield_board_rect(area: Rect, state: &GameState) -> Rect {
    let outer = playfield_outer_rect(area, state);
    let (w, h) = board_dims(state);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (w * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (h * CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

/// Top-left terminal position of a grid cell, if it is visible on the board.
fn cell_position(board: Rect, cell: Cell) -> Option<Position> {
    if cell.x < 0 || cell.y < 0 {
        return None;
    }
    let x = board.x.checked_add(u16::try_from(cell.x).ok()? * CELL_WIDTH)?;
    let y = board.y.checked_add(u16::try_from(cell.y).ok()? * CELL_HEIGHT)?;
    (x + CELL_WIDTH <= board.right() && y + CELL_HEIGHT <= board.bottom())
        .then_some(Position::new(x, y))
}

fn paint(buf: &mut Buffer, board: Rect, cell: Cell, symbol: &str, style: Style) {
    if let Some(pos) = cell_position(board, cell) {
        buf.set_string(pos.x, pos.y, symbol, style);
    }
}

/// Draw the board with a pause or game-over overlay, depending on state.
/// When `line_clear_flash` is set, runs the TachyonFX flash over the cleared rows and updates
/// `line_clear_effect` / `line_clear_process_time`.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    show_ghost: bool,
    line_clear_flash: bool,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    draw_game(frame, state, theme, area, show_ghost);
    if line_clear_flash {
        apply_line_clear_effect(
            frame,
            state,
            area,
            line_clear_effect,
            line_clear_process_time,
            now,
        );
    }
    match state.status() {
        Status::Running if paused => draw_pause_overlay(frame, theme, area),
        Status::Running => {}
        Status::GameOver => draw_game_over(frame, state, theme, area),
    }
}

/// Draw game: playfield + sidebar, centred.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, show_ghost: bool) {
    let playfield_area = playfield_outer_rect(area, state);
    let sidebar_area = Rect {
        x: playfield_area.right(),
        y: playfield_area.y,
        width: SIDEBAR_WIDTH.min(area.right().saturating_sub(playfield_area.right())),
        height: playfield_area.height,
    };
    draw_playfield(frame, state, theme, playfield_area, show_ghost);
    draw_sidebar(frame, state, theme, sidebar_area);
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, show_ghost: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Stacktui ", Style::default().fg(theme.title)));
    block.render(area, frame.buffer_mut());

    let board = playfield_board_rect(frame.area(), state);
    let buf = frame.buffer_mut();
    let (w, h) = board_dims(state);

    let empty_style = Style::default().fg(theme.div_line).bg(theme.bg);
    for y in 0..i32::from(h) {
        for x in 0..i32::from(w) {
            paint(buf, board, Cell::new(x, y), EMPTY, empty_style);
        }
    }

    for (cell, color) in state.stack().iter() {
        let c = theme.block_color(color);
        paint(buf, board, cell, BLOCK, Style::default().fg(c).bg(theme.bg));
    }

    let Some(piece) = state.piece() else {
        return;
    };
    let color = theme.block_color(piece.color);
    if show_ghost {
        if let Some(shadow) = state.shadow() {
            let style = Style::default().fg(theme.inactive_fg).bg(theme.bg);
            for cell in shadow {
                paint(buf, board, cell, GHOST, style);
            }
        }
    }
    for cell in piece.cells() {
        paint(buf, board, cell, BLOCK, Style::default().fg(color).bg(theme.bg));
    }
}

/// Terminal positions covered by the rows cleared last.
fn clearing_buffer_positions(board: Rect, state: &GameState) -> HashSet<(u16, u16)> {
    let (w, _) = board_dims(state);
    let mut set = HashSet::new();
    for &row in &state.last_cleared {
        for x in 0..i32::from(w) {
            if let Some(pos) = cell_position(board, Cell::new(x, row)) {
                for dx in 0..CELL_WIDTH {
                    set.insert((pos.x + dx, pos.y));
                }
            }
        }
    }
    set
}

/// Create or update the line-clear flash and process it (TachyonFX: cleared rows fade in from white).
fn apply_line_clear_effect(
    frame: &mut Frame,
    state: &GameState,
    area: Rect,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = playfield_board_rect(area, state);
    let delta = line_clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *line_clear_process_time = Some(now);

    if line_clear_effect.is_none() {
        let clearing_set = clearing_buffer_positions(board, state);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (LINE_CLEAR_FADE_MS, Interpolation::QuadOut),
        )
        .with_filter(filter)
        .with_area(board);
        *line_clear_effect = Some(effect);
    }

    if let Some(effect) = line_clear_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Status
            Constraint::Length(4), // Colours
            Constraint::Min(0),    // Controls
        ])
        .split(area);

    // --- Status ---
    let status_block = sidebar_block(theme);
    let status_inner = status_block.inner(chunks[0]);
    status_block.render(chunks[0], frame.buffer_mut());
    let status = match state.status() {
        Status::Running => "Running",
        Status::GameOver => "Game over",
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("State: ", title_style),
            Span::styled(status, fg_style),
        ]),
        Line::from(vec![
            Span::styled("Pieces: ", title_style),
            Span::styled(state.pieces_locked.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Blocks: ", title_style),
            Span::styled(state.stack().len().to_string(), fg_style),
        ]),
    ];
    Paragraph::new(lines).render(status_inner, frame.buffer_mut());

    // --- Colours ---
    let colours_block = sidebar_block(theme);
    let colours_inner = colours_block.inner(chunks[1]);
    colours_block.render(chunks[1], frame.buffer_mut());
    let colours_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(colours_inner);
    Paragraph::new(Line::from(Span::styled("Colours", title_style)))
        .render(colours_layout[0], frame.buffer_mut());
    draw_colour_strip(frame, theme, colours_layout[1]);

    // --- Controls ---
    let controls_block = sidebar_block(theme);
    let controls_inner = controls_block.inner(chunks[2]);
    controls_block.render(chunks[2], frame.buffer_mut());
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{k:<7}"), title_style),
            Span::styled(what, fg_style),
        ])
    };
    let lines = vec![
        key("←/h", "Move left"),
        key("→/l", "Move right"),
        key("↑/k", "Rotate"),
        key("↓/j", "Soft drop"),
        key("P", "Pause"),
        key("R", "Restart"),
        key("Q/Esc", "Quit"),
    ];
    Paragraph::new(lines).render(controls_inner, frame.buffer_mut());
}

/// Draw a row of blocks, one per palette colour.
fn draw_colour_strip(frame: &mut Frame, theme: &Theme, area: Rect) {
    let n = theme.blocks.len() as u16;
    let block_w = (area.width / n).max(1);
    for (i, c) in theme.blocks.iter().enumerate() {
        let r = Rect {
            x: area.x + (i as u16) * block_w,
            y: area.y,
            width: block_w,
            height: area.height.min(1),
        }
        .intersection(area);
        Paragraph::new(BLOCK)
            .style(Style::default().fg(*c).bg(theme.bg))
            .render(r, frame.buffer_mut());
    }
}

fn centered_popup(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 7);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Pieces: {} ", state.pieces_locked),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            " R — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Stacktui ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}
