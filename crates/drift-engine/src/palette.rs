//! Flake colors: a shade table drawn once at startup from the configured
//! scheme. Each flake picks its shade when it spawns.

use crossterm::style::Color;
use drift_core::config::{ColorChannel, ColorScheme};
use rand::Rng;

/// Number of shades; one per possible flake tint.
pub const SHADES: usize = 256;

/// Shade table indexed by a flake's tint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    flakes: Vec<Color>,
}

impl Palette {
    /// Draw a full shade table from `scheme`.
    pub fn generate(scheme: &ColorScheme, rng: &mut impl Rng) -> Self {
        let flakes = (0..SHADES)
            .map(|_| {
                let (r, g, b) = draw_rgb(scheme, rng);
                Color::Rgb { r, g, b }
            })
            .collect();
        Self { flakes }
    }

    /// Color for a flake tint; white when the table has no such shade.
    pub fn flake(&self, tint: u8) -> Color {
        self.flakes
            .get(usize::from(tint))
            .copied()
            .unwrap_or(Color::White)
    }
}

fn draw_rgb(scheme: &ColorScheme, rng: &mut impl Rng) -> (u8, u8, u8) {
    match *scheme {
        ColorScheme::SingleChannel { channel, min, max } => {
            let value = rng.random_range(min.min(max)..=max.max(min));
            match channel {
                ColorChannel::All => (value, value, value),
                ColorChannel::R => (value, 0, 0),
                ColorChannel::G => (0, value, 0),
                ColorChannel::B => (0, 0, value),
            }
        }
        ColorScheme::RgbRange { min, max } => {
            let packed = rng.random_range(min.min(max)..=max.max(min));
            let [_, r, g, b] = packed.to_be_bytes();
            (r, g, b)
        }
        ColorScheme::HslRamp {
            hue_start,
            hue_end,
            saturation,
            lightness_min,
            lightness_max,
        } => {
            let hue = uniform(rng, hue_start, hue_end);
            let lightness = uniform(rng, lightness_min, lightness_max);
            hsl_to_rgb(hue, saturation / 100.0, lightness / 100.0)
        }
    }
}

/// Uniform draw from `[a, b]` in either order; degenerate ranges return `a`.
fn uniform(rng: &mut impl Rng, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo < hi {
        rng.random_range(lo..=hi)
    } else {
        a
    }
}

/// Convert hue (degrees), saturation and lightness (both `0..=1`) to RGB.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - 2.0_f64.mul_add(l, -1.0).abs()) * s;
    let x = chroma * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = l - chroma / 2.0;

    let (r, g, b) = match h {
        h if h < 1.0 => (chroma, x, 0.0),
        h if h < 2.0 => (x, chroma, 0.0),
        h if h < 3.0 => (0.0, chroma, x),
        h if h < 4.0 => (0.0, x, chroma),
        h if h < 5.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    (channel(r + m), channel(g + m), channel(b + m))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(value: f64) -> u8 {
    // clamped to [0, 255] before the cast
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
        assert_eq!(hsl_to_rgb(360.0, 1.0, 0.5), (255, 0, 0));
    }

    #[test]
    fn lightness_extremes() {
        assert_eq!(hsl_to_rgb(200.0, 0.6, 1.0), (255, 255, 255));
        assert_eq!(hsl_to_rgb(200.0, 0.6, 0.0), (0, 0, 0));
        assert_eq!(hsl_to_rgb(200.0, 0.0, 0.5), (128, 128, 128));
    }

    #[test]
    fn single_channel_stays_on_channel() {
        let scheme = ColorScheme::SingleChannel {
            channel: ColorChannel::G,
            min: 100,
            max: 200,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let palette = Palette::generate(&scheme, &mut rng);
        assert_eq!(palette.flakes.len(), SHADES);
        for tint in 0..=u8::MAX {
            let Color::Rgb { r, g, b } = palette.flake(tint) else {
                panic!("expected an rgb color");
            };
            assert_eq!((r, b), (0, 0));
            assert!((100..=200).contains(&g));
        }
    }

    #[test]
    fn rgb_range_unpacks_channels() {
        let scheme = ColorScheme::RgbRange {
            min: 0x00_12_34_56,
            max: 0x00_12_34_56,
        };
        let mut rng = StdRng::seed_from_u64(2);
        let palette = Palette::generate(&scheme, &mut rng);
        assert_eq!(
            palette.flake(0),
            Color::Rgb {
                r: 0x12,
                g: 0x34,
                b: 0x56
            }
        );
    }

    #[test]
    fn default_ramp_is_pale_blue() {
        let mut rng = StdRng::seed_from_u64(3);
        let palette = Palette::generate(&ColorScheme::default(), &mut rng);
        for tint in 0..=u8::MAX {
            let Color::Rgb { r, b, .. } = palette.flake(tint) else {
                panic!("expected an rgb color");
            };
            assert!(b >= r, "tint {tint}: r={r} b={b}");
        }
    }

    #[test]
    fn shades_vary_across_tints() {
        let mut rng = StdRng::seed_from_u64(4);
        let palette = Palette::generate(&ColorScheme::default(), &mut rng);
        let mut shades: Vec<Color> = Vec::new();
        for tint in 0..=u8::MAX {
            let color = palette.flake(tint);
            if !shades.contains(&color) {
                shades.push(color);
            }
        }
        assert!(shades.len() > 16);
    }

    #[test]
    fn missing_shade_is_white() {
        let palette = Palette {
            flakes: Vec::new(),
        };
        assert_eq!(palette.flake(3), Color::White);
    }
}
