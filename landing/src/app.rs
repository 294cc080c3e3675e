use crate::config::{load_settings, save_settings_atomic, Cli, Paths, Settings};
use crate::counter::{spawn_visit, CounterClient, CounterUpdate};
use crate::frame::{FrameHandle, FrameLoop};
use crate::input::{collect_input, map_event, Action, PointerTracker};
use crate::render::{
    canvas_to_cells, draw_frame, draw_header, draw_help, draw_status, DrawSurface, Terminal,
};
use crate::sim::{SimParams, Starfield};
use crossterm::style::Color;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

const BG: Color = Color::Black;

pub(crate) struct App {
    settings: Settings,
    term: Terminal,
    field: Starfield,
    pointer: PointerTracker,
    frames: FrameLoop,
    frame: Option<FrameHandle>,
    rng: StdRng,
    views: Option<u64>,
    counter_error: Option<String>,
    counter_rx: Option<mpsc::Receiver<CounterUpdate>>,
    show_help: bool,
    started: Instant,
}

impl App {
    fn init(settings: Settings) -> anyhow::Result<Self> {
        let mut rng = if settings.seed != 0 {
            StdRng::seed_from_u64(settings.seed)
        } else {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            StdRng::seed_from_u64(nanos ^ 0x9E3779B97F4A7C15u64)
        };

        let term = Terminal::begin()?;
        let surface = term.canvas.size();
        let params = SimParams {
            proximity_radius: settings.proximity_radius,
            ..SimParams::default()
        };
        let field = Starfield::new(settings.stars, surface, params, &mut rng);
        log::info!(
            "mounted {}x{} surface with {} stars",
            surface.w,
            surface.h,
            field.len()
        );

        let counter_rx = if settings.counter_enabled {
            let (tx, rx) = mpsc::channel(8);
            spawn_visit(CounterClient::new(&settings.counter_url), tx);
            Some(rx)
        } else {
            None
        };

        Ok(Self {
            frames: FrameLoop::new(settings.fps_cap),
            settings,
            term,
            field,
            pointer: PointerTracker::default(),
            frame: None,
            rng,
            views: None,
            counter_error: None,
            counter_rx,
            show_help: false,
            started: Instant::now(),
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        self.frame = Some(self.frames.start(Instant::now()));

        while self.frames.is_pending() {
            let wait = self
                .frames
                .wait_time(Instant::now())
                .unwrap_or(Duration::ZERO);
            for ev in collect_input(wait)? {
                match map_event(ev) {
                    Some(Action::Quit) => self.teardown(),
                    Some(Action::HelpToggle) => self.show_help = !self.show_help,
                    Some(Action::PointerAt(col, row)) => self.pointer.move_to_cell(col, row),
                    Some(Action::Resize(cols, rows)) => self.on_resize(cols, rows),
                    None => {}
                }
            }

            self.drain_counter();

            let now = Instant::now();
            if self.frames.take_due(now).is_some() {
                self.render_frame(now)?;
                self.frame = Some(self.frames.request(now));
            }
        }
        Ok(())
    }

    /// Stop the loop: the pending frame is cancelled and never re-requested.
    fn teardown(&mut self) {
        if let Some(h) = self.frame.take() {
            self.frames.cancel(h);
        }
    }

    fn on_resize(&mut self, cols: u16, rows: u16) {
        let surface = self.term.resize(cols, rows);
        self.field.resize(surface);
        let s = self.field.surface();
        log::debug!("resized to {}x{}", s.w, s.h);
    }

    fn drain_counter(&mut self) {
        let Some(rx) = self.counter_rx.as_mut() else {
            return;
        };
        while let Ok(update) = rx.try_recv() {
            match update {
                CounterUpdate::Views(v) => {
                    self.views = Some(v);
                    self.counter_error = None;
                }
                CounterUpdate::Failed(e) => self.counter_error = Some(e),
            }
        }
    }

    fn render_frame(&mut self, now: Instant) -> anyhow::Result<()> {
        let pointer = self.pointer.position();
        draw_frame(
            &mut self.term.canvas,
            &mut self.field,
            pointer,
            now,
            &mut self.rng,
        );
        canvas_to_cells(&self.term.canvas, &mut self.term.cur, BG);

        let t = now.saturating_duration_since(self.started).as_secs_f32();
        draw_header(&mut self.term.cur, &self.settings.name, self.views, t, BG);
        if let Some(err) = &self.counter_error {
            draw_status(&mut self.term.cur, &format!("view counter offline: {err}"), BG);
        }
        if self.show_help {
            draw_help(&mut self.term.cur);
        }

        self.term.present(true)?;
        Ok(())
    }
}

pub(crate) fn run(cli: Cli, paths: Paths) -> anyhow::Result<()> {
    let mut settings = load_settings(&paths.settings_path);
    settings.apply_cli(&cli);
    if cli.save {
        save_settings_atomic(&paths.settings_path, &settings)?;
    }

    let mut app = App::init(settings)?;
    let res = app.run();
    app.term.end()?;
    res
}
