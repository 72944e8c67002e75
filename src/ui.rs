//! Layout and drawing: bordered board, empty cells, falling blocks with bottom fade, intro effect.

use crate::registry::Block;
use crate::sim::SimStats;
use crate::theme::Theme;
use crate::{SimConfig, ViewConfig};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block as Border, BorderType, Borders, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Duration of the board fade-in on start.
const INTRO_FADE_MS: u32 = 900;

/// Everything one frame needs. Blocks are the snapshot the simulation published.
pub struct BoardView<'a> {
    pub blocks: &'a [Block],
    pub stats: &'a SimStats,
    pub config: &'a SimConfig,
    pub view: &'a ViewConfig,
    pub theme: &'a Theme,
}

/// Fade-in state carried between frames.
#[derive(Default)]
pub struct IntroFade {
    effect: Option<Effect>,
    last_process: Option<Instant>,
    done: bool,
}

impl IntroFade {
    pub fn new(enabled: bool) -> Self {
        Self {
            done: !enabled,
            ..Self::default()
        }
    }
}

/// Board with border, centred in `area` and clipped to it.
pub fn board_rect(area: Rect, rows: u16, cols: u16, cell_width: u16) -> Rect {
    let w = cols.saturating_mul(cell_width).saturating_add(2);
    let h = rows.saturating_add(2);
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Opacity of a block: 1 above the bottom `group_size` rows, then linear down to 0 at `rows`.
pub fn fade_alpha(row: f64, rows: u16, group_size: u16) -> f64 {
    let start = f64::from(rows) - f64::from(group_size);
    if row < start || group_size == 0 {
        return 1.0;
    }
    (1.0 - (row - start) / f64::from(group_size)).clamp(0.0, 1.0)
}

/// Half-row indices (two per grid row) whose centres fall inside `[row, row + 1)`.
fn covered_half_rows(row: f64) -> std::ops::Range<i64> {
    let first = (2.0 * row - 0.5).ceil() as i64;
    first..first + 2
}

fn to_rgb(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (255, 0, 0),
        Color::Green => (0, 255, 0),
        Color::Yellow => (255, 255, 0),
        Color::Blue => (0, 0, 255),
        Color::Magenta => (255, 0, 255),
        Color::Cyan => (0, 255, 255),
        Color::Gray => (128, 128, 128),
        Color::DarkGray => (64, 64, 64),
        _ => (255, 255, 255),
    }
}

/// Mix `color` over `under` with opacity `alpha`.
pub fn blend(color: Color, under: Color, alpha: f64) -> Color {
    if alpha >= 1.0 {
        return color;
    }
    let (r1, g1, b1) = to_rgb(color);
    let (r0, g0, b0) = to_rgb(under);
    let mix = |a: u8, b: u8| (f64::from(b) + (f64::from(a) - f64::from(b)) * alpha).round() as u8;
    Color::Rgb(mix(r1, r0), mix(g1, g0), mix(b1, b0))
}

/// Colour of each half cell, `None` where empty. Later blocks paint over earlier ones.
fn half_cell_colors(board: &BoardView) -> Vec<Option<Color>> {
    let rows = board.config.rows as usize;
    let cols = board.config.cols as usize;
    let mut halves = vec![None; rows * 2 * cols];
    for block in board.blocks {
        let col = block.column as usize;
        if col >= cols {
            continue;
        }
        let base = board.theme.block_color(block.color);
        let color = if board.view.fade {
            let alpha = fade_alpha(block.row, board.config.rows, board.config.group_size);
            blend(base, board.theme.cell, alpha)
        } else {
            base
        };
        for h in covered_half_rows(block.row) {
            if h >= 0 && (h as usize) < rows * 2 {
                halves[h as usize * cols + col] = Some(color);
            }
        }
    }
    halves
}

pub fn draw(frame: &mut Frame, board: &BoardView, intro: &mut IntroFade, now: Instant) {
    let outer = board_rect(
        frame.area(),
        board.config.rows,
        board.config.cols,
        board.view.cell_width,
    );
    let title = format!(
        " blockfall | groups {} | live {} ",
        board.stats.groups_spawned,
        board.blocks.len()
    );
    let border = Border::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(board.theme.border).bg(board.theme.bg))
        .title(Span::styled(title, board.theme.title));
    let inner = border.inner(outer);
    border.render(outer, frame.buffer_mut());

    draw_cells(frame, board, inner);
    apply_intro_effect(frame, outer, board.theme.bg, intro, now);
}

fn draw_cells(frame: &mut Frame, board: &BoardView, inner: Rect) {
    let cols = board.config.cols as usize;
    let cell_width = board.view.cell_width;
    let halves = half_cell_colors(board);
    let empty = board.theme.cell;
    let buf = frame.buffer_mut();

    // One terminal row per grid row: top half in fg, bottom half in bg.
    for ty in 0..board.config.rows {
        for c in 0..board.config.cols {
            let top = halves[(ty as usize * 2) * cols + c as usize].unwrap_or(empty);
            let bottom = halves[(ty as usize * 2 + 1) * cols + c as usize].unwrap_or(empty);
            let style = Style::default().fg(top).bg(bottom);
            for dx in 0..cell_width {
                let x = inner.x.saturating_add(c.saturating_mul(cell_width)).saturating_add(dx);
                let y = inner.y.saturating_add(ty);
                if inner.contains(Position::new(x, y)) {
                    buf[(x, y)].set_symbol("▀").set_style(style);
                }
            }
        }
    }
}

fn apply_intro_effect(frame: &mut Frame, area: Rect, bg: Color, intro: &mut IntroFade, now: Instant) {
    if intro.done {
        return;
    }
    let delta = intro
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    intro.last_process = Some(now);

    let effect = intro
        .effect
        .get_or_insert_with(|| fx::fade_from(bg, bg, (INTRO_FADE_MS, Interpolation::QuadOut)));
    frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
    if effect.done() {
        intro.done = true;
        intro.effect = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn view() -> ViewConfig {
        ViewConfig {
            cell_width: 2,
            frame_rate: 60.0,
            fade: true,
            no_animation: true,
        }
    }

    fn at(buf: &ratatui::buffer::Buffer, x: u16, y: u16) -> &ratatui::buffer::Cell {
        &buf[(x, y)]
    }

    fn render(blocks: &[Block], view: &ViewConfig) -> ratatui::buffer::Buffer {
        let config = SimConfig::default();
        let theme = Theme::default();
        let stats = SimStats::default();
        let board = BoardView {
            blocks,
            stats: &stats,
            config: &config,
            view,
            theme: &theme,
        };
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        let mut intro = IntroFade::new(false);
        terminal
            .draw(|f| draw(f, &board, &mut intro, Instant::now()))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn test_fade_alpha() {
        assert_eq!(fade_alpha(0.0, 15, 5), 1.0);
        assert_eq!(fade_alpha(9.99, 15, 5), 1.0);
        assert_eq!(fade_alpha(10.0, 15, 5), 1.0);
        assert!((fade_alpha(12.5, 15, 5) - 0.5).abs() < 1e-9);
        assert_eq!(fade_alpha(15.0, 15, 5), 0.0);
    }

    #[test]
    fn test_covered_half_rows() {
        assert_eq!(covered_half_rows(0.0), 0..2);
        assert_eq!(covered_half_rows(0.5), 1..3);
        assert_eq!(covered_half_rows(0.3), 1..3);
        assert_eq!(covered_half_rows(-1.0), -2..0);
    }

    #[test]
    fn test_blend() {
        let red = Color::Rgb(200, 0, 0);
        let grey = Color::Rgb(0, 0, 100);
        assert_eq!(blend(red, grey, 1.0), red);
        assert_eq!(blend(red, grey, 0.0), grey);
        assert_eq!(blend(red, grey, 0.5), Color::Rgb(100, 0, 50));
    }

    #[test]
    fn test_board_rect_centres_and_clips() {
        let r = board_rect(Rect::new(0, 0, 60, 20), 15, 20, 2);
        assert_eq!(r, Rect::new(9, 1, 42, 17));
        let small = board_rect(Rect::new(0, 0, 10, 5), 15, 20, 2);
        assert_eq!(small, Rect::new(0, 0, 10, 5));
    }

    #[test]
    fn test_block_drawn_in_its_cell() {
        let buf = render(&[Block { column: 3, row: 0.0, color: 0 }], &view());
        // Inner board starts at (10, 2); column 3 covers x = 16..18.
        for x in [16u16, 17] {
            let cell = at(&buf, x, 2);
            assert_eq!(cell.symbol(), "▀");
            assert_eq!(cell.fg, Color::Rgb(225, 0, 0));
            assert_eq!(cell.bg, Color::Rgb(225, 0, 0));
        }
        assert_eq!(at(&buf, 15, 2).fg, Theme::default().cell);
        assert_eq!(at(&buf, 18, 2).fg, Theme::default().cell);
    }

    #[test]
    fn test_half_row_offset() {
        let buf = render(&[Block { column: 0, row: 0.5, color: 1 }], &view());
        let green = Color::Rgb(0, 225, 0);
        let empty = Theme::default().cell;
        assert_eq!(at(&buf, 10, 2).fg, empty);
        assert_eq!(at(&buf, 10, 2).bg, green);
        assert_eq!(at(&buf, 10, 3).fg, green);
        assert_eq!(at(&buf, 10, 3).bg, empty);
    }

    #[test]
    fn test_blocks_above_grid_not_drawn() {
        let buf = render(&[Block { column: 0, row: -3.0, color: 0 }], &view());
        assert_eq!(at(&buf, 10, 2).fg, Theme::default().cell);
    }

    #[test]
    fn test_fade_near_bottom() {
        let row = 12.5;
        let faded = render(&[Block { column: 0, row, color: 2 }], &view());
        let expected = blend(Color::Rgb(0, 0, 255), Theme::default().cell, fade_alpha(row, 15, 5));
        // 12.5 covers half rows 25 and 26: bottom of terminal row 12, top of row 13.
        assert_eq!(at(&faded, 10, 2 + 12).bg, expected);
        assert_eq!(at(&faded, 10, 2 + 13).fg, expected);

        let no_fade = ViewConfig {
            fade: false,
            ..view()
        };
        let solid = render(&[Block { column: 0, row, color: 2 }], &no_fade);
        assert_eq!(at(&solid, 10, 2 + 13).fg, Color::Rgb(0, 0, 255));
    }
}
