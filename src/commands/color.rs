//! The colour picker command: adjust a colour by hue, saturation and brightness.

use crate::args::ColorArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Color, ColorPicker, Component, Hsb};
use crate::Result;
use anyhow::ensure;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorView {
    pub initial: Color,
    pub color: Color,
    pub hsb: Hsb,
    /// The colour stops drawn behind each slider after the last adjustment.
    pub gradients: BTreeMap<Component, Vec<Color>>,
}

/// Moves the picker's sliders to the given values, in hue, saturation, brightness order, and
/// reports the resulting colour together with each slider's gradient.
///
/// # Errors
///
/// Returns an error if a value is outside `0.0..=1.0`.
pub fn color(args: ColorArgs) -> Result<Out<ColorView>> {
    let mut picker = ColorPicker::new(args.color);
    for (component, value) in [
        (Component::Hue, args.hue),
        (Component::Saturation, args.saturation),
        (Component::Brightness, args.brightness),
    ] {
        let Some(value) = value else {
            continue;
        };
        check_unit(component, value).pub_result(ErrorType::Request)?;
        picker.set(component, value);
    }

    let hsb = picker.hsb();
    let view = ColorView {
        initial: args.color,
        color: picker.color(),
        hsb,
        gradients: Component::ALL
            .into_iter()
            .map(|c| (c, picker.gradient(c).to_vec()))
            .collect(),
    };

    let mut message = format!("{} -> {}", view.initial, view.color);
    for component in Component::ALL {
        let gradient = picker.gradient(component);
        let _ = write!(
            message,
            "\n  {:<10} {:.3}  {} .. {}",
            component.to_string(),
            hsb.get(component),
            gradient.first().copied().unwrap_or_default(),
            gradient.last().copied().unwrap_or_default()
        );
    }
    Ok(Out::new(message, view))
}

fn check_unit(component: Component, value: f64) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "The {component} must be between 0.0 and 1.0, got {value}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GRADIENT_STEPS;

    fn args(color: Color) -> ColorArgs {
        ColorArgs {
            color,
            hue: None,
            saturation: None,
            brightness: None,
        }
    }

    #[test]
    fn test_color_unchanged() {
        let red = Color::new(255, 0, 0);
        let out = color(args(red)).unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.color, red);
        assert_eq!(view.gradients.len(), 3);
        for gradient in view.gradients.values() {
            assert_eq!(gradient.len(), GRADIENT_STEPS);
        }
    }

    #[test]
    fn test_color_brightness_to_zero_is_black() {
        let out = color(ColorArgs {
            brightness: Some(0.0),
            ..args(Color::new(40, 120, 200))
        })
        .unwrap();
        assert_eq!(out.structure().unwrap().color, Color::new(0, 0, 0));
    }

    #[test]
    fn test_color_hue() {
        // Hue 1/3 at full saturation and brightness is pure green.
        let out = color(ColorArgs {
            hue: Some(1.0 / 3.0),
            ..args(Color::new(255, 0, 0))
        })
        .unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.color, Color::new(0, 255, 0));
        assert!(out.message().starts_with("#FF0000 -> #00FF00"));
    }

    #[test]
    fn test_color_out_of_range() {
        let e = color(ColorArgs {
            saturation: Some(1.5),
            ..args(Color::new(255, 0, 0))
        })
        .unwrap_err();
        assert_eq!(ErrorType::of(&e), Some(ErrorType::Request));
    }
}
