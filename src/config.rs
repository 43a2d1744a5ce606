//! Numeric configuration surface of the engine.
//!
//! Every field has a default, so a partial TOML document is enough:
//!
//! ```toml
//! brush_radius = 14
//! gap_filling_level = 4
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Gap-filling level used when an input cannot provide one.
pub const DEFAULT_GAP_FILLING_LEVEL: u32 = 3;

/// Largest gap-filling level; each level is one full dilation pass.
pub const MAX_GAP_FILLING_LEVEL: u32 = 32;

/// Largest paint brush radius in pixels.
pub const MAX_BRUSH_RADIUS: u32 = 512;

/// Circle tool radius limits (slider range of the capture tool).
pub const MIN_CIRCLE_RADIUS: u32 = 5;
pub const MAX_CIRCLE_RADIUS: u32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Paint brush radius in pixels.
    pub brush_radius: u32,
    /// Displayed cursor radius of the circle tool.
    pub circle_radius: u32,
    /// Dilation iterations used to bridge gaps between edge fragments.
    pub gap_filling_level: u32,
    /// Contours enclosing less area than this (px²) are outlined but never filled.
    pub min_fill_area: f64,
    /// Opacity of the paint feedback colour.
    pub blend_opacity: f32,
    pub fill_opacity: f32,
    pub selected_fill_opacity: f32,
    pub outline_thickness: u32,
    /// Period of the hold-to-strengthen circle tool.
    pub tick_interval_ms: u64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    pub gaussian_kernel_size: u32,
    pub highlight_color: [u8; 3],
    pub contour_color: [u8; 3],
    pub selected_color: [u8; 3],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            brush_radius: 10,
            circle_radius: 20,
            gap_filling_level: DEFAULT_GAP_FILLING_LEVEL,
            min_fill_area: 100.0,
            blend_opacity: 0.3,
            fill_opacity: 0.2,
            selected_fill_opacity: 0.4,
            outline_thickness: 2,
            tick_interval_ms: 100,
            canny_low: 30.0,
            canny_high: 100.0,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            gaussian_kernel_size: 5,
            highlight_color: [255, 0, 255],
            contour_color: [0, 255, 0],
            selected_color: [173, 216, 230],
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_brush_radius(self.brush_radius)?;
        validate_circle_radius(self.circle_radius)?;
        validate_gap_level(self.gap_filling_level)?;
        if !self.min_fill_area.is_finite() || self.min_fill_area < 0.0 {
            return Err(EngineError::invalid(
                "min_fill_area",
                format!("must be a finite non-negative area, got {}", self.min_fill_area),
            ));
        }
        validate_opacity("blend_opacity", self.blend_opacity)?;
        validate_opacity("fill_opacity", self.fill_opacity)?;
        validate_opacity("selected_fill_opacity", self.selected_fill_opacity)?;
        if self.outline_thickness == 0 {
            return Err(EngineError::invalid("outline_thickness", "must be at least 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(EngineError::invalid("tick_interval_ms", "must be at least 1"));
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(EngineError::invalid(
                "canny_low",
                format!(
                    "thresholds must satisfy 0 <= low <= high, got {} / {}",
                    self.canny_low, self.canny_high
                ),
            ));
        }
        if self.bilateral_diameter == 0 || self.bilateral_diameter % 2 == 0 {
            return Err(EngineError::invalid("bilateral_diameter", "must be odd"));
        }
        if !(self.bilateral_sigma_color > 0.0) || !(self.bilateral_sigma_space > 0.0) {
            return Err(EngineError::invalid("bilateral_sigma", "sigmas must be positive"));
        }
        if self.gaussian_kernel_size == 0 || self.gaussian_kernel_size % 2 == 0 {
            return Err(EngineError::invalid("gaussian_kernel_size", "must be odd"));
        }
        Ok(())
    }
}

pub fn validate_brush_radius(radius: u32) -> Result<()> {
    if !(1..=MAX_BRUSH_RADIUS).contains(&radius) {
        return Err(EngineError::invalid(
            "brush_radius",
            format!("must be within 1..={MAX_BRUSH_RADIUS}, got {radius}"),
        ));
    }
    Ok(())
}

pub fn validate_gap_level(level: u32) -> Result<()> {
    if !(1..=MAX_GAP_FILLING_LEVEL).contains(&level) {
        return Err(EngineError::invalid(
            "gap_filling_level",
            format!("must be within 1..={MAX_GAP_FILLING_LEVEL}, got {level}"),
        ));
    }
    Ok(())
}

pub fn validate_circle_radius(radius: u32) -> Result<()> {
    if !(MIN_CIRCLE_RADIUS..=MAX_CIRCLE_RADIUS).contains(&radius) {
        return Err(EngineError::invalid(
            "circle_radius",
            format!("must be within {MIN_CIRCLE_RADIUS}..={MAX_CIRCLE_RADIUS}, got {radius}"),
        ));
    }
    Ok(())
}

fn validate_opacity(name: &'static str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::invalid(name, format!("must be within 0..=1, got {value}")));
    }
    Ok(())
}

/// A loosely typed parameter as delivered by sliders, bindings or config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    List(Vec<ParamValue>),
    Text(String),
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_owned())
    }
}

/// Coerce a gap-filling level to a positive integer.
///
/// Fractions truncate, lists contribute their first element and numeric text
/// is parsed. Empty lists and values below 1 fall back to
/// [`DEFAULT_GAP_FILLING_LEVEL`], values above [`MAX_GAP_FILLING_LEVEL`] are
/// clamped to it; anything non-numeric is rejected.
pub fn coerce_gap_level(value: &ParamValue) -> Result<u32> {
    let raw = match value {
        ParamValue::Int(n) => *n as f64,
        ParamValue::Float(f) => *f,
        ParamValue::List(items) => match items.first() {
            Some(first) => return coerce_gap_level(first),
            None => return Ok(DEFAULT_GAP_FILLING_LEVEL),
        },
        ParamValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            EngineError::invalid("gap_filling_level", format!("`{text}` is not a number"))
        })?,
    };

    if !raw.is_finite() {
        return Err(EngineError::invalid(
            "gap_filling_level",
            format!("{raw} is not a finite number"),
        ));
    }

    let level = raw.trunc();
    if level < 1.0 {
        return Ok(DEFAULT_GAP_FILLING_LEVEL);
    }
    Ok(level.min(MAX_GAP_FILLING_LEVEL as f64) as u32)
}
