use crate::color::{clampf, gradient, Rgb};
use crate::sim::{Pointer, Starfield, SurfaceSize};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::Rng;
use std::io::{self, Write};
use std::time::Instant;

/// Blur radius of the star glow, in surface units.
pub(crate) const GLOW_BLUR: f32 = 3.0;

/// The slice of a 2D canvas API the starfield paints with.
pub(crate) trait DrawSurface {
    fn size(&self) -> SurfaceSize;
    /// Resizing also drops whatever was drawn.
    fn resize(&mut self, size: SurfaceSize);
    fn clear(&mut self);
    fn set_fill(&mut self, color: Rgb);
    fn set_global_alpha(&mut self, alpha: f32);
    fn set_shadow(&mut self, color: Rgb, blur: f32);
    fn clear_shadow(&mut self);
    fn fill_circle(&mut self, x: f32, y: f32, r: f32);
}

/// Clear the surface, then paint and advance every particle in pool order.
pub(crate) fn draw_frame<S, R>(
    surface: &mut S,
    field: &mut Starfield,
    pointer: Pointer,
    now: Instant,
    rng: &mut R,
) where
    S: DrawSurface + ?Sized,
    R: Rng + ?Sized,
{
    surface.clear();
    for i in 0..field.len() {
        let p = field.particle(i);
        let color = p.color.to_rgb();
        surface.set_fill(color);
        surface.set_global_alpha(p.alpha);
        surface.set_shadow(color, GLOW_BLUR);
        surface.fill_circle(p.x, p.y, p.size);
        // shadow state is shared, reset before the next star
        surface.clear_shadow();
        field.update_particle(i, now, pointer, rng);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
    fill: Rgb,
    alpha: f32,
    shadow: Option<(Rgb, f32)>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
            fill: Rgb::BLACK,
            alpha: 1.0,
            shadow: None,
        }
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> Pixel {
        self.px[self.idx(x, y)]
    }

    fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }

    fn paint(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        let a = (clampf(alpha, 0.0, 1.0) * 255.0 + 0.5) as u8;
        if a == 0 {
            return;
        }
        self.blend_over(
            x,
            y,
            Pixel {
                r: color.r,
                g: color.g,
                b: color.b,
                a,
            },
        );
    }
}

impl DrawSurface for PixelCanvas {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.w, self.h)
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.w = size.w;
        self.h = size.h;
        self.px.clear();
        self.px
            .resize((size.w as usize) * (size.h as usize), Pixel::default());
    }

    fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }

    fn set_fill(&mut self, color: Rgb) {
        self.fill = color;
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = clampf(alpha, 0.0, 1.0);
    }

    fn set_shadow(&mut self, color: Rgb, blur: f32) {
        self.shadow = Some((color, blur.max(0.0)));
    }

    fn clear_shadow(&mut self) {
        self.shadow = None;
    }

    fn fill_circle(&mut self, x: f32, y: f32, r: f32) {
        let r = r.max(0.0);
        let reach = r + self.shadow.map(|(_, blur)| blur).unwrap_or(0.0);
        let x0 = (x - reach).floor() as i32;
        let x1 = (x + reach).ceil() as i32;
        let y0 = (y - reach).floor() as i32;
        let y1 = (y + reach).ceil() as i32;

        // glow first so the disc lands on top of it
        if let Some((glow, blur)) = self.shadow {
            if blur > 0.0 {
                for py in y0..=y1 {
                    for px in x0..=x1 {
                        let dx = px as f32 + 0.5 - x;
                        let dy = py as f32 + 0.5 - y;
                        let d = (dx * dx + dy * dy).sqrt();
                        if d <= r || d > reach {
                            continue;
                        }
                        let t = 1.0 - (d - r) / blur;
                        self.paint(px, py, glow, self.alpha * 0.55 * t * t);
                    }
                }
            }
        }

        let fill = self.fill;
        let alpha = self.alpha;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                if dx * dx + dy * dy <= r * r {
                    self.paint(px, py, fill, alpha);
                }
            }
        }
        // tiny discs can miss every pixel centre; always light the centre dot
        if r > 0.0 && r < 1.0 {
            self.paint(x.floor() as i32, y.floor() as i32, fill, alpha);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn get(&self, x: u16, y: u16) -> Cell {
        self.cells[self.idx(x, y)]
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Alpha at or above which a pixel lights its braille dot.
const INK_ALPHA: u8 = 24;

pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, bg: Color) {
    let cols = out.w as u32;
    let rows = out.h as u32;

    for cy in 0..rows {
        for cx in 0..cols {
            let px0 = cx * 2;
            let py0 = cy * 4;

            let mut mask: u8 = 0;
            let mut sum_r: u32 = 0;
            let mut sum_g: u32 = 0;
            let mut sum_b: u32 = 0;
            let mut sum_a: u32 = 0;
            let mut max_a: u8 = 0;

            for dy in 0..4 {
                for dx in 0..2 {
                    let x = px0 + dx;
                    let y = py0 + dy;
                    if x >= canvas.w || y >= canvas.h {
                        continue;
                    }
                    let p = canvas.get(x, y);
                    if p.a >= INK_ALPHA {
                        mask |= braille_bit(dx, dy);
                        let a = p.a as u32;
                        sum_r += p.r as u32 * a;
                        sum_g += p.g as u32 * a;
                        sum_b += p.b as u32 * a;
                        sum_a += a;
                        max_a = max_a.max(p.a);
                    }
                }
            }

            let cell = if mask == 0 {
                Cell {
                    ch: ' ',
                    fg: Color::White,
                    bg,
                    bold: false,
                }
            } else {
                // terminals have no fg alpha: dim toward black instead
                let avg = Rgb {
                    r: (sum_r / sum_a) as u8,
                    g: (sum_g / sum_a) as u8,
                    b: (sum_b / sum_a) as u8,
                };
                let lit = avg.scale(0.25 + 0.75 * (max_a as f32 / 255.0));
                Cell {
                    ch: char::from_u32(0x2800 + mask as u32).unwrap_or(' '),
                    fg: Color::Rgb {
                        r: lit.r,
                        g: lit.g,
                        b: lit.b,
                    },
                    bg,
                    bold: false,
                }
            };
            out.set(cx as u16, cy as u16, cell);
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x as usize + i;
        if xx >= buf.w as usize {
            break;
        }
        buf.set(
            xx as u16,
            y,
            Cell {
                ch,
                fg,
                bg,
                bold: false,
            },
        );
    }
}

/// purple-400 → purple-600 → purple-800
const HEADER_STOPS: [Rgb; 3] = [
    Rgb { r: 192, g: 132, b: 252 },
    Rgb { r: 147, g: 51, b: 234 },
    Rgb { r: 107, g: 33, b: 168 },
];

/// Profile name with a purple gradient and a slow glow pulse, centred,
/// and the view count underneath.
pub(crate) fn draw_header(buf: &mut CellBuffer, name: &str, views: Option<u64>, t: f32, bg: Color) {
    if buf.w == 0 || buf.h == 0 {
        return;
    }
    let spaced: String = name
        .chars()
        .flat_map(|c| [c, ' '])
        .collect::<String>()
        .trim_end()
        .to_string();
    let n = spaced.chars().count();
    let x0 = (buf.w as usize).saturating_sub(n) / 2;
    let y = (buf.h / 2).saturating_sub(1);
    let pulse = 0.8 + 0.2 * (t * 1.6).sin().abs();

    for (i, ch) in spaced.chars().enumerate() {
        if ch == ' ' {
            continue;
        }
        let k = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
        let c = gradient(&HEADER_STOPS, k).scale(pulse);
        let xx = x0 + i;
        if xx >= buf.w as usize {
            break;
        }
        buf.set(
            xx as u16,
            y,
            Cell {
                ch,
                fg: Color::Rgb {
                    r: c.r,
                    g: c.g,
                    b: c.b,
                },
                bg,
                bold: true,
            },
        );
    }

    let line = views_label(views);
    let lx = (buf.w as usize).saturating_sub(line.chars().count()) / 2;
    draw_text(buf, lx as u16, y.saturating_add(2), &line, Color::Grey, bg);
}

pub(crate) fn views_label(views: Option<u64>) -> String {
    format!("Views: {}", views.unwrap_or(0))
}

pub(crate) fn draw_status(buf: &mut CellBuffer, msg: &str, bg: Color) {
    if buf.h == 0 {
        return;
    }
    draw_text(buf, 1, buf.h - 1, msg, Color::DarkGrey, bg);
}

pub(crate) fn draw_help(buf: &mut CellBuffer) {
    let lines = [
        "Move the mouse over the stars",
        "",
        "H            Toggle this overlay",
        "Q / Esc      Quit",
    ];
    let w = buf.w as usize;
    let h = buf.h as usize;
    let box_w = 40usize.min(w.saturating_sub(4));
    let box_h = (lines.len() + 4).min(h.saturating_sub(2));
    if box_w < 4 || box_h < 3 {
        return;
    }
    let x0 = (w - box_w) / 2;
    let y0 = (h - box_h) / 2;
    let fg = Color::Grey;
    let bg = Color::Black;

    let edge = format!("+{}+", "-".repeat(box_w - 2));
    let blank = format!("|{}|", " ".repeat(box_w - 2));
    draw_text(buf, x0 as u16, y0 as u16, &edge, Color::DarkGrey, bg);
    for i in 1..box_h - 1 {
        draw_text(buf, x0 as u16, (y0 + i) as u16, &blank, Color::DarkGrey, bg);
    }
    draw_text(buf, x0 as u16, (y0 + box_h - 1) as u16, &edge, Color::DarkGrey, bg);

    draw_text(buf, (x0 + 2) as u16, (y0 + 1) as u16, "HELP", fg, bg);
    for (i, l) in lines.iter().enumerate() {
        let yy = y0 + 2 + i;
        if yy >= y0 + box_h - 1 {
            break;
        }
        let text: String = l.chars().take(box_w - 4).collect();
        draw_text(buf, (x0 + 2) as u16, yy as u16, &text, fg, bg);
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    pub(crate) canvas: PixelCanvas,
}

/// Braille cells carry 2×4 dots.
pub(crate) fn surface_for(cols: u16, rows: u16) -> SurfaceSize {
    SurfaceSize::new(cols as u32 * 2, rows as u32 * 4)
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let surface = surface_for(cols, rows);

        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            canvas: PixelCanvas::new(surface.w, surface.h),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize(&mut self, cols: u16, rows: u16) -> SurfaceSize {
        self.cols = cols;
        self.rows = rows;
        self.prev = CellBuffer::new(cols, rows);
        self.cur = CellBuffer::new(cols, rows);
        let surface = surface_for(cols, rows);
        self.canvas.resize(surface);
        // fresh prev buffer no longer matches the screen
        execute!(self.out, Clear(ClearType::All)).ok();
        surface
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                if c.bold {
                    queue!(
                        self.out,
                        SetAttribute(Attribute::Bold),
                        Print(c.ch),
                        SetAttribute(Attribute::NormalIntensity)
                    )?;
                } else {
                    queue!(self.out, Print(c.ch))?;
                }
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Hsl;
    use crate::sim::SimParams;
    use rand::{rngs::StdRng, SeedableRng};

    #[derive(Debug, PartialEq)]
    enum Op {
        Clear,
        Fill(Rgb),
        Alpha(f32),
        Shadow(Rgb, f32),
        ClearShadow,
        Circle(f32, f32, f32),
    }

    #[derive(Default)]
    struct Recorder {
        size: SurfaceSize,
        ops: Vec<Op>,
    }

    impl DrawSurface for Recorder {
        fn size(&self) -> SurfaceSize {
            self.size
        }
        fn resize(&mut self, size: SurfaceSize) {
            self.size = size;
        }
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn set_fill(&mut self, color: Rgb) {
            self.ops.push(Op::Fill(color));
        }
        fn set_global_alpha(&mut self, alpha: f32) {
            self.ops.push(Op::Alpha(alpha));
        }
        fn set_shadow(&mut self, color: Rgb, blur: f32) {
            self.ops.push(Op::Shadow(color, blur));
        }
        fn clear_shadow(&mut self) {
            self.ops.push(Op::ClearShadow);
        }
        fn fill_circle(&mut self, x: f32, y: f32, r: f32) {
            self.ops.push(Op::Circle(x, y, r));
        }
    }

    #[test]
    fn frame_paints_each_star_before_advancing_it() {
        let mut rng = StdRng::seed_from_u64(3);
        let surface = SurfaceSize::new(80, 60);
        let mut field = Starfield::new(3, surface, SimParams::default(), &mut rng);
        let before: Vec<_> = field.particles().to_vec();
        let mut rec = Recorder {
            size: surface,
            ..Default::default()
        };

        draw_frame(&mut rec, &mut field, Pointer::default(), Instant::now(), &mut rng);

        assert_eq!(rec.ops.len(), 1 + 5 * 3);
        assert_eq!(rec.ops[0], Op::Clear);
        for (i, p) in before.iter().enumerate() {
            let ops = &rec.ops[1 + i * 5..1 + (i + 1) * 5];
            let color = p.color.to_rgb();
            assert_eq!(ops[0], Op::Fill(color));
            assert_eq!(ops[1], Op::Alpha(p.alpha));
            assert_eq!(ops[2], Op::Shadow(color, GLOW_BLUR));
            assert_eq!(ops[3], Op::Circle(p.x, p.y, p.size));
            assert_eq!(ops[4], Op::ClearShadow);
        }
        // every star moved (or respawned) after being drawn
        for (a, b) in before.iter().zip(field.particles()) {
            assert_ne!(a.y, b.y);
        }
        assert_eq!(field.len(), 3);
    }

    #[test]
    fn filled_circle_lights_its_centre_with_the_fill_color() {
        let mut c = PixelCanvas::new(20, 20);
        let color = Hsl::star(280.0).to_rgb();
        c.set_fill(color);
        c.set_global_alpha(1.0);
        c.fill_circle(10.0, 10.0, 2.0);
        let p = c.get(10, 10);
        assert_eq!((p.r, p.g, p.b, p.a), (color.r, color.g, color.b, 255));
        assert_eq!(c.get(0, 0).a, 0);
    }

    #[test]
    fn glow_reaches_past_the_disc_and_fades_out() {
        let mut c = PixelCanvas::new(30, 30);
        let color = Rgb { r: 200, g: 100, b: 250 };
        c.set_fill(color);
        c.set_global_alpha(1.0);
        c.set_shadow(color, GLOW_BLUR);
        c.fill_circle(15.0, 15.0, 1.0);

        let halo = c.get(16, 15).a;
        let farther = c.get(17, 15).a;
        assert!(halo > 0 && halo < 255);
        assert!(farther < halo);
        assert_eq!(c.get(25, 15).a, 0);

        c.clear_shadow();
        c.clear();
        c.fill_circle(15.0, 15.0, 1.0);
        assert_eq!(c.get(17, 15).a, 0);
    }

    #[test]
    fn global_alpha_scales_coverage() {
        let mut c = PixelCanvas::new(10, 10);
        c.set_fill(Rgb { r: 255, g: 255, b: 255 });
        c.set_global_alpha(0.5);
        c.fill_circle(5.0, 5.0, 1.5);
        assert_eq!(c.get(5, 5).a, 128);
        c.set_global_alpha(0.0);
        c.clear();
        c.fill_circle(5.0, 5.0, 1.5);
        assert_eq!(c.get(5, 5).a, 0);
    }

    #[test]
    fn resize_changes_dimensions_and_clears() {
        let mut c = PixelCanvas::new(800, 600);
        c.set_fill(Rgb { r: 255, g: 0, b: 0 });
        c.fill_circle(10.0, 10.0, 2.0);
        c.resize(SurfaceSize::new(400, 300));
        assert_eq!(c.size(), SurfaceSize::new(400, 300));
        assert_eq!(c.px.len(), 400 * 300);
        assert!(c.px.iter().all(|p| p.a == 0));
    }

    #[test]
    fn braille_cell_picks_up_lit_dots() {
        let mut c = PixelCanvas::new(4, 4);
        c.set_fill(Rgb { r: 255, g: 255, b: 255 });
        c.fill_circle(0.5, 0.5, 0.5);
        let mut cells = CellBuffer::new(2, 1);
        canvas_to_cells(&c, &mut cells, Color::Black);
        assert_eq!(cells.get(0, 0).ch, '\u{2801}');
        assert_eq!(cells.get(1, 0).ch, ' ');
    }

    #[test]
    fn header_centres_name_and_shows_zero_until_known() {
        let mut buf = CellBuffer::new(21, 9);
        draw_header(&mut buf, "krane", None, 0.0, Color::Black);
        // "k r a n e" is 9 wide
        let row: String = (0..21).map(|x| buf.get(x, 3).ch).collect();
        assert_eq!(row, "      k r a n e      ");
        let views: String = (0..21).map(|x| buf.get(x, 5).ch).collect();
        assert_eq!(views.trim(), "Views: 0");
        assert_eq!(views_label(Some(12)), "Views: 12");
    }
}
