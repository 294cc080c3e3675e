use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub(crate) fn scale(self, k: f32) -> Rgb {
        let k = clampf(k, 0.0, 1.0);
        Rgb {
            r: (self.r as f32 * k) as u8,
            g: (self.g as f32 * k) as u8,
            b: (self.b as f32 * k) as u8,
        }
    }
}

/// Hue in degrees, saturation and lightness in 0..1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Hsl {
    pub(crate) h: f32,
    pub(crate) s: f32,
    pub(crate) l: f32,
}

impl Hsl {
    /// Star colors are always 80% saturated, 70% light.
    pub(crate) fn star(h: f32) -> Self {
        Self { h, s: 0.8, l: 0.7 }
    }

    pub(crate) fn to_rgb(self) -> Rgb {
        let h = self.h.rem_euclid(360.0) / 60.0;
        let s = clampf(self.s, 0.0, 1.0);
        let l = clampf(self.l, 0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = l - c * 0.5;
        let (r, g, b) = match h as i32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Rgb {
            r: (clampf(r + m, 0.0, 1.0) * 255.0).round() as u8,
            g: (clampf(g + m, 0.0, 1.0) * 255.0).round() as u8,
            b: (clampf(b + m, 0.0, 1.0) * 255.0).round() as u8,
        }
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({:.0}, {:.0}%, {:.0}%)",
            self.h,
            self.s * 100.0,
            self.l * 100.0
        )
    }
}

pub(crate) fn clampf(v: f32, a: f32, b: f32) -> f32 {
    v.max(a).min(b)
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub(crate) fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = clampf(t, 0.0, 1.0);
    Rgb {
        r: lerp(a.r as f32, b.r as f32, t).round() as u8,
        g: lerp(a.g as f32, b.g as f32, t).round() as u8,
        b: lerp(a.b as f32, b.b as f32, t).round() as u8,
    }
}

/// Sample a multi-stop gradient at `t` in 0..1.
pub(crate) fn gradient(stops: &[Rgb], t: f32) -> Rgb {
    match stops.len() {
        0 => Rgb::BLACK,
        1 => stops[0],
        n => {
            let pos = clampf(t, 0.0, 1.0) * (n - 1) as f32;
            let i = (pos.floor() as usize).min(n - 2);
            lerp_rgb(stops[i], stops[i + 1], pos - i as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(Hsl { h: 0.0, s: 1.0, l: 0.5 }.to_rgb(), Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(Hsl { h: 120.0, s: 1.0, l: 0.5 }.to_rgb(), Rgb { r: 0, g: 255, b: 0 });
        assert_eq!(Hsl { h: 240.0, s: 1.0, l: 0.5 }.to_rgb(), Rgb { r: 0, g: 0, b: 255 });
        assert_eq!(Hsl { h: 360.0, s: 1.0, l: 0.5 }.to_rgb(), Rgb { r: 255, g: 0, b: 0 });
    }

    #[test]
    fn star_purple_leans_blue_and_red() {
        let c = Hsl::star(290.0).to_rgb();
        assert!(c.b > c.g && c.r > c.g);
        assert_eq!(Hsl::star(290.0).to_string(), "hsl(290, 80%, 70%)");
    }

    #[test]
    fn gradient_hits_its_stops() {
        let stops = [
            Rgb { r: 0, g: 0, b: 0 },
            Rgb { r: 100, g: 100, b: 100 },
            Rgb { r: 200, g: 0, b: 0 },
        ];
        assert_eq!(gradient(&stops, 0.0), stops[0]);
        assert_eq!(gradient(&stops, 0.5), stops[1]);
        assert_eq!(gradient(&stops, 1.0), stops[2]);
        assert_eq!(gradient(&stops, 0.25), Rgb { r: 50, g: 50, b: 50 });
    }
}
