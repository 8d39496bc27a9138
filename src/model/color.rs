//! Category colours and the HSB colour picker used when editing a category.

use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The number of colour stops in each slider's gradient lookup table.
pub const GRADIENT_STEPS: usize = 32;

/// An sRGB colour, written as `#RRGGBB`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hsb(self) -> Hsb {
        Hsb::from(self)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.is_ascii() {
            bail!("Invalid color '{s}', expected the form #RRGGBB");
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .with_context(|| format!("Invalid color '{s}', expected hex digits"))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Hue, saturation and brightness, each in `0.0..=1.0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl Hsb {
    /// Creates an `Hsb`, clamping each component into `0.0..=1.0`.
    pub fn new(hue: f64, saturation: f64, brightness: f64) -> Self {
        Self {
            hue: clamp_unit(hue),
            saturation: clamp_unit(saturation),
            brightness: clamp_unit(brightness),
        }
    }

    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Hue => self.hue,
            Component::Saturation => self.saturation,
            Component::Brightness => self.brightness,
        }
    }

    /// Returns a copy with `component` replaced by `value` (clamped).
    pub fn with(mut self, component: Component, value: f64) -> Self {
        let value = clamp_unit(value);
        match component {
            Component::Hue => self.hue = value,
            Component::Saturation => self.saturation = value,
            Component::Brightness => self.brightness = value,
        }
        self
    }

    pub fn to_color(self) -> Color {
        Color::from(self)
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

impl From<Hsb> for Color {
    fn from(hsb: Hsb) -> Self {
        let Hsb {
            hue,
            saturation: s,
            brightness: v,
        } = hsb;
        // A hue of 1.0 is the same angle as 0.0.
        let h = (hue * 6.0) % 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match sector as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Color::new(to_channel(r), to_channel(g), to_channel(b))
    }
}

impl From<Color> for Hsb {
    fn from(c: Color) -> Self {
        let r = f64::from(c.r) / 255.0;
        let g = f64::from(c.g) / 255.0;
        let b = f64::from(c.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta).rem_euclid(6.0) / 6.0
        } else if max == g {
            ((b - r) / delta + 2.0) / 6.0
        } else {
            ((r - g) / delta + 4.0) / 6.0
        };
        let saturation = if max == 0.0 { 0.0 } else { delta / max };
        Hsb::new(hue, saturation, max)
    }
}

/// One of the three sliders of the colour picker.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Hue,
    Saturation,
    Brightness,
}

serde_plain::derive_display_from_serialize!(Component);
serde_plain::derive_fromstr_from_deserialize!(Component);

impl Component {
    pub const ALL: [Component; 3] = [Component::Hue, Component::Saturation, Component::Brightness];

    fn index(self) -> usize {
        match self {
            Component::Hue => 0,
            Component::Saturation => 1,
            Component::Brightness => 2,
        }
    }

    /// The two sliders that are not `self`.
    pub fn others(self) -> [Component; 2] {
        match self {
            Component::Hue => [Component::Saturation, Component::Brightness],
            Component::Saturation => [Component::Hue, Component::Brightness],
            Component::Brightness => [Component::Hue, Component::Saturation],
        }
    }
}

/// The state behind the category colour editor.
///
/// The three components are held independently. Moving one slider recomputes the displayed colour
/// with the other two held fixed, and rebuilds the background gradients of the *other two* sliders
/// only. The slider that was just moved keeps the gradient it had, which is exactly what is being
/// displayed under the user's finger: its own gradient does not depend on its own value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorPicker {
    hsb: Hsb,
    gradients: [Vec<Color>; 3],
}

impl ColorPicker {
    pub fn new(initial: Color) -> Self {
        let hsb = initial.to_hsb();
        let gradients = Component::ALL.map(|c| build_gradient(hsb, c));
        Self { hsb, gradients }
    }

    pub fn hsb(&self) -> Hsb {
        self.hsb
    }

    /// The colour currently displayed.
    pub fn color(&self) -> Color {
        self.hsb.to_color()
    }

    /// Moves one slider. Returns the sliders whose gradients were rebuilt.
    pub fn set(&mut self, component: Component, value: f64) -> [Component; 2] {
        self.hsb = self.hsb.with(component, value);
        let others = component.others();
        for other in others {
            self.gradients[other.index()] = build_gradient(self.hsb, other);
        }
        others
    }

    /// The lookup table drawn behind `component`'s slider.
    pub fn gradient(&self, component: Component) -> &[Color] {
        &self.gradients[component.index()]
    }
}

/// Sweeps `component` from 0 to 1 while holding the other two components of `hsb`.
fn build_gradient(hsb: Hsb, component: Component) -> Vec<Color> {
    (0..GRADIENT_STEPS)
        .map(|i| {
            let t = i as f64 / (GRADIENT_STEPS - 1) as f64;
            hsb.with(component, t).to_color()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_and_display() {
        let c = Color::from_str("#ff8000").unwrap();
        assert_eq!(c, Color::new(255, 128, 0));
        assert_eq!(c.to_string(), "#FF8000");
        assert_eq!(Color::from_str("00FF00").unwrap(), Color::new(0, 255, 0));
    }

    #[test]
    fn test_color_parse_errors() {
        assert!(Color::from_str("#fff").is_err());
        assert!(Color::from_str("#gg0000").is_err());
        assert!(Color::from_str("#ÿÿÿ").is_err());
    }

    #[test]
    fn test_primary_colors_round_trip() {
        for c in [
            Color::new(255, 0, 0),
            Color::new(0, 255, 0),
            Color::new(0, 0, 255),
            Color::new(255, 255, 255),
            Color::new(0, 0, 0),
        ] {
            assert_eq!(c.to_hsb().to_color(), c, "round trip of {c}");
        }
    }

    #[test]
    fn test_hsb_values() {
        let green = Color::new(0, 255, 0).to_hsb();
        assert!((green.hue - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(green.saturation, 1.0);
        assert_eq!(green.brightness, 1.0);

        let gray = Color::new(128, 128, 128).to_hsb();
        assert_eq!(gray.saturation, 0.0);
    }

    #[test]
    fn test_hue_one_wraps_to_red() {
        assert_eq!(Hsb::new(1.0, 1.0, 1.0).to_color(), Color::new(255, 0, 0));
    }

    #[test]
    fn test_hsb_clamps() {
        let hsb = Hsb::new(-1.0, 2.0, f64::NAN);
        assert_eq!(hsb, Hsb::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_picker_set_holds_other_components() {
        let mut picker = ColorPicker::new(Color::new(255, 0, 0));
        picker.set(Component::Brightness, 0.5);
        let hsb = picker.hsb();
        assert_eq!(hsb.hue, 0.0);
        assert_eq!(hsb.saturation, 1.0);
        assert_eq!(hsb.brightness, 0.5);
        assert_eq!(picker.color(), Color::new(128, 0, 0));
    }

    #[test]
    fn test_picker_does_not_rebuild_moved_slider() {
        let mut picker = ColorPicker::new(Color::new(255, 0, 0));
        let hue_before = picker.gradient(Component::Hue).to_vec();
        let sat_before = picker.gradient(Component::Saturation).to_vec();

        let rebuilt = picker.set(Component::Hue, 0.5);
        assert_eq!(rebuilt, [Component::Saturation, Component::Brightness]);

        // The hue slider's own gradient is untouched.
        assert_eq!(picker.gradient(Component::Hue), hue_before.as_slice());
        // The saturation gradient now ends on cyan instead of red.
        assert_ne!(picker.gradient(Component::Saturation), sat_before.as_slice());
        assert_eq!(
            picker.gradient(Component::Saturation).last().copied(),
            Some(Color::new(0, 255, 255))
        );
    }

    #[test]
    fn test_gradient_shape() {
        let picker = ColorPicker::new(Color::new(0, 0, 255));
        let brightness = picker.gradient(Component::Brightness);
        assert_eq!(brightness.len(), GRADIENT_STEPS);
        assert_eq!(brightness[0], Color::new(0, 0, 0));
        assert_eq!(brightness[GRADIENT_STEPS - 1], Color::new(0, 0, 255));
    }

    #[test]
    fn test_component_display() {
        assert_eq!(Component::Saturation.to_string(), "saturation");
        assert_eq!(Component::from_str("hue").unwrap(), Component::Hue);
    }
}
