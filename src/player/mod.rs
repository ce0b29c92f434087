//! Player: the live preview loop.
//!
//! Renders the scene into a canvas once per frame interval, scales it onto
//! the LED matrix and writes the changed half-block cells to the terminal.
//! Reloaded scenes from the watcher are swapped in between frames.

use std::io::{self, Write};
use std::time::Instant;

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::{cursor, execute, queue, style, terminal};

use crate::config::{matches_binding, KeyBindings, PlayerConfig};
use crate::engine::watch::SceneWatcher;
use crate::engine::{RenderReport, Scene};
use crate::menubar::{menu_items, print_menu_item};
use crate::renderer::Renderer;
use crate::surface::{Canvas, Rgba};
use crate::types::{Cell, CellChange, Frame, Rgb};

/// Rows reserved above the matrix for the menu bar.
const CANVAS_OFFSET: u16 = 1;

/// Upper half block: foreground is the top LED, background the bottom one.
const HALF_BLOCK: char = '\u{2580}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Restart,
    Ignore,
}

pub struct Player {
    scene: Scene,
    watcher: Option<SceneWatcher>,
    config: PlayerConfig,
    background: Rgba,
    canvas: Canvas,
    renderer: Renderer,
    frames: u64,
    reloads: u32,
    problem: Option<String>,
}

impl Player {
    pub fn new(scene: Scene, watcher: Option<SceneWatcher>, config: PlayerConfig) -> Self {
        let canvas = Canvas::new(scene.width(), scene.height());
        Self {
            background: config.background(),
            renderer: Renderer::new(config.contract()),
            scene,
            watcher,
            config,
            canvas,
            frames: 0,
            reloads: 0,
            problem: None,
        }
    }

    /// Play the scene in the terminal until the user quits.
    ///
    /// Restores the terminal on exit, even on error.
    pub fn play(&mut self) -> Result<()> {
        let contract = self.renderer.contract();
        let (term_w, term_h) = terminal::size()?;
        // +2: one row for menu bar, one row for status bar
        let need_h = contract.rows() + 2;
        if term_w < contract.width || term_h < need_h {
            bail!(
                "Terminal too small: need {}x{}, have {}x{}",
                contract.width,
                need_h,
                term_w,
                term_h,
            );
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout);

        let _ = execute!(stdout, style::ResetColor, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        self.render_menubar(stdout)?;
        let interval = self.config.frame_interval();
        let mut deadline = Instant::now();

        loop {
            if let Some(scene) = self.watcher.as_ref().and_then(SceneWatcher::try_next) {
                self.swap_scene(scene);
            }
            self.draw_frame(stdout)?;

            deadline += interval;
            let now = Instant::now();
            if deadline < now {
                deadline = now;
            }

            // Handle input until the next frame is due.
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !event::poll(remaining)? {
                    break;
                }
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match key_action(&self.config.key_bindings, &key) {
                            Action::Quit => return Ok(()),
                            Action::Restart => {
                                tracing::info!("restarting scene");
                                self.scene.restart();
                            }
                            Action::Ignore => {}
                        }
                    }
                    Event::Resize(_, _) => {
                        queue!(stdout, terminal::Clear(terminal::ClearType::All))?;
                        self.render_menubar(stdout)?;
                        self.renderer.reset();
                    }
                    _ => {}
                }
            }
        }
    }

    /// Replace the working scene between frames. Its clock starts now, not
    /// when the watcher loaded it.
    fn swap_scene(&mut self, mut scene: Scene) {
        if scene.width() != self.canvas.width() || scene.height() != self.canvas.height() {
            self.canvas = Canvas::new(scene.width(), scene.height());
        }
        scene.restart();
        self.scene = scene;
        self.reloads += 1;
        self.problem = None;
    }

    fn draw_frame(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        self.canvas.clear(self.background);
        let report = self.scene.render(&mut self.canvas);
        self.note(&report);
        self.frames += 1;

        match self.renderer.frame(&self.canvas) {
            Frame::Full { cells } => render_full(stdout, &cells)?,
            Frame::Diff { changes } => render_diff(stdout, &changes)?,
        }
        self.render_status(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    /// Keep the first problem of the frame for the status bar. Logged only
    /// when it changes.
    fn note(&mut self, report: &RenderReport) {
        let problem = report
            .failures
            .first()
            .map(ToString::to_string)
            .or_else(|| report.animation_errors.first().map(ToString::to_string));
        if problem != self.problem {
            if let Some(p) = &problem {
                tracing::warn!(problem = %p, "frame rendered with errors");
            }
            self.problem = problem;
        }
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render_menubar(&self, stdout: &mut io::Stdout) -> Result<()> {
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(" "),
        )?;
        for (i, item) in menu_items(&self.config.key_bindings).iter().enumerate() {
            if i > 0 {
                queue!(stdout, style::Print("  "))?;
            }
            print_menu_item(stdout, item)?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let status_y = self.renderer.contract().rows() + CANVAS_OFFSET;
        let (term_w, term_h) = terminal::size()?;
        if status_y >= term_h {
            return Ok(());
        }

        let path = self
            .watcher
            .as_ref()
            .map(|w| w.path().display().to_string())
            .unwrap_or_default();
        let mut status = format!(
            " {} | frame {} | reloads {} | {}",
            path,
            self.frames,
            self.reloads,
            self.problem.as_deref().unwrap_or("ok"),
        );
        if let Some((cut, _)) = status.char_indices().nth(term_w as usize) {
            status.truncate(cut);
        }

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        Ok(())
    }
}

pub fn key_action(bindings: &KeyBindings, key: &KeyEvent) -> Action {
    if matches_binding("Ctrl-c", key)
        || matches_binding(&bindings.quit, key)
        || matches_binding(&bindings.quit_alt, key)
    {
        Action::Quit
    } else if matches_binding(&bindings.restart, key) {
        Action::Restart
    } else {
        Action::Ignore
    }
}

fn render_full(out: &mut impl Write, cells: &[Vec<Cell>]) -> Result<()> {
    for (y, row) in cells.iter().enumerate() {
        queue!(out, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
        for cell in row {
            queue_cell(out, cell)?;
        }
    }
    Ok(())
}

fn render_diff(out: &mut impl Write, changes: &[CellChange]) -> Result<()> {
    for change in changes {
        queue!(out, cursor::MoveTo(change.x, change.y + CANVAS_OFFSET))?;
        queue_cell(out, &change.cell)?;
    }
    Ok(())
}

/// Print a grid as plain lines, for one-off snapshots outside the player.
pub fn write_snapshot(out: &mut impl Write, cells: &[Vec<Cell>]) -> Result<()> {
    for row in cells {
        for cell in row {
            queue_cell(out, cell)?;
        }
        queue!(out, style::ResetColor, style::Print("\n"))?;
    }
    out.flush()?;
    Ok(())
}

fn queue_cell(out: &mut impl Write, cell: &Cell) -> Result<()> {
    queue!(
        out,
        style::PrintStyledContent(style::StyledContent::new(to_content_style(cell), HALF_BLOCK))
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(cell: &Cell) -> style::ContentStyle {
    style::ContentStyle {
        foreground_color: Some(to_ct_color(cell.top)),
        background_color: Some(to_ct_color(cell.bottom)),
        ..Default::default()
    }
}

pub fn to_ct_color(c: Rgb) -> style::Color {
    style::Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}
