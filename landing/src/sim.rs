use crate::color::Hsl;
use rand::Rng;
use std::ops::Range;
use std::time::{Duration, Instant};

/// Drawing surface size in surface units (braille dots in the terminal).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SurfaceSize {
    pub(crate) w: u32,
    pub(crate) h: u32,
}

impl SurfaceSize {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Last known pointer position, in surface units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Pointer {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

#[derive(Clone, Debug)]
pub(crate) struct SimParams {
    pub(crate) proximity_radius: f32,
    /// Degrees added to an excited particle's hue each frame.
    pub(crate) hue_step: f32,
    pub(crate) hue_band: Range<f32>,
    pub(crate) size_range: Range<f32>,
    pub(crate) speed_range: Range<f32>,
    /// Fraction of the surface height past which a particle starts to fade.
    pub(crate) fade_threshold: f32,
    pub(crate) fade_hold: Duration,
    pub(crate) fade_out: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            proximity_radius: 50.0,
            hue_step: 2.0,
            hue_band: 260.0..320.0,
            size_range: 1.0..3.0,
            speed_range: 1.0..3.0,
            fade_threshold: 0.9,
            fade_hold: Duration::from_millis(900),
            fade_out: Duration::from_millis(400),
        }
    }
}

impl SimParams {
    fn resting_hue<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        sample(rng, self.hue_band.clone())
    }
}

fn sample<R: Rng + ?Sized>(rng: &mut R, range: Range<f32>) -> f32 {
    if range.start < range.end {
        rng.gen_range(range)
    } else {
        range.start
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Spawn {
    /// Pool creation: staggered above the top edge.
    Initial,
    /// Recycled particle: starts on the top edge.
    Respawn,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Particle {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) size: f32,
    pub(crate) speed: f32,
    pub(crate) base_hue: f32,
    pub(crate) hue: f32,
    pub(crate) color: Hsl,
    pub(crate) alpha: f32,
    pub(crate) fade_start: Option<Instant>,
}

impl Particle {
    pub(crate) fn spawn<R: Rng + ?Sized>(
        surface: SurfaceSize,
        kind: Spawn,
        params: &SimParams,
        rng: &mut R,
    ) -> Self {
        let w = surface.w as f32;
        let h = surface.h as f32;
        let x = sample(rng, 0.0..w);
        let y = match kind {
            Spawn::Initial => sample(rng, -h..0.0),
            Spawn::Respawn => 0.0,
        };
        let base_hue = params.resting_hue(rng);
        Self {
            x,
            y,
            size: sample(rng, params.size_range.clone()),
            speed: sample(rng, params.speed_range.clone()),
            base_hue,
            hue: base_hue,
            color: Hsl::star(base_hue),
            alpha: 1.0,
            fade_start: None,
        }
    }

    /// Advance one frame. Returns true when the particle was respawned.
    pub(crate) fn update<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        pointer: Pointer,
        surface: SurfaceSize,
        params: &SimParams,
        rng: &mut R,
    ) -> bool {
        self.y += self.speed;

        let dx = self.x - pointer.x;
        let dy = self.y - pointer.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance < params.proximity_radius {
            self.hue = (self.hue + params.hue_step).rem_euclid(360.0);
        } else {
            // snaps to a fresh resting shade every frame, no easing back
            self.hue = params.resting_hue(rng);
        }
        self.color = Hsl::star(self.hue);

        let h = surface.h as f32;
        if self.fade_start.is_none() && self.y > h * params.fade_threshold {
            self.fade_start = Some(now);
        }

        if let Some(start) = self.fade_start {
            let elapsed = now.saturating_duration_since(start);
            if elapsed > params.fade_hold {
                let t = (elapsed - params.fade_hold).as_secs_f32() / params.fade_out.as_secs_f32();
                // never brighten mid-fade
                self.alpha = self.alpha.min((1.0 - t).max(0.0));
            }
        }

        if self.y > h || self.alpha <= 0.0 {
            *self = Particle::spawn(surface, Spawn::Respawn, params, rng);
            self.fade_start = None;
            self.alpha = 1.0;
            return true;
        }
        false
    }
}

/// The particle pool plus the surface it falls through.
pub(crate) struct Starfield {
    particles: Vec<Particle>,
    surface: SurfaceSize,
    params: SimParams,
}

impl Starfield {
    pub(crate) fn new<R: Rng + ?Sized>(
        count: usize,
        surface: SurfaceSize,
        params: SimParams,
        rng: &mut R,
    ) -> Self {
        let particles = (0..count)
            .map(|_| Particle::spawn(surface, Spawn::Initial, &params, rng))
            .collect();
        Self {
            particles,
            surface,
            params,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.particles.len()
    }

    pub(crate) fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn particle(&self, i: usize) -> &Particle {
        &self.particles[i]
    }

    pub(crate) fn surface(&self) -> SurfaceSize {
        self.surface
    }

    /// New surface bounds; particles keep their positions.
    pub(crate) fn resize(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    pub(crate) fn update_particle<R: Rng + ?Sized>(
        &mut self,
        i: usize,
        now: Instant,
        pointer: Pointer,
        rng: &mut R,
    ) -> bool {
        let surface = self.surface;
        self.particles[i].update(now, pointer, surface, &self.params, rng)
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
}
