//! Stretch sensor auto-calibration
//!
//! Each sensor tracks the smallest and largest raw value it has seen since the
//! last reset and normalizes new samples into that window.

/// Running bounds for one stretch sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorBounds {
    pub min: u16,
    pub max: u16,
}

impl SensorBounds {
    /// Bounds that any real sample overwrites.
    pub const UNOBSERVED: Self = Self {
        min: u16::MAX,
        max: 0,
    };

    /// Widen the bounds to include `raw`.
    pub fn observe(&mut self, raw: u16) {
        self.min = self.min.min(raw);
        self.max = self.max.max(raw);
    }

    /// True once the window has a non-zero width.
    pub fn is_established(&self) -> bool {
        self.min < self.max
    }

    /// Position of `raw` inside the window, clamped to `[0, 1]`.
    ///
    /// A window that is empty or collapsed to a single value yields `0`.
    pub fn normalize(&self, raw: u16) -> f64 {
        if !self.is_established() {
            return 0.0;
        }
        let span = f64::from(self.max - self.min);
        let offset = f64::from(raw.saturating_sub(self.min));
        (offset / span).clamp(0.0, 1.0)
    }
}

impl Default for SensorBounds {
    fn default() -> Self {
        Self::UNOBSERVED
    }
}

/// Calibration state for every stretch sensor on a glove.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    bounds: Vec<SensorBounds>,
}

impl Calibration {
    pub fn new(sensor_count: usize) -> Self {
        Self {
            bounds: vec![SensorBounds::UNOBSERVED; sensor_count],
        }
    }

    pub fn bounds(&self) -> &[SensorBounds] {
        &self.bounds
    }

    /// Feed one sample for `sensor` and return its calibrated value.
    pub fn update(&mut self, sensor: usize, raw: u16) -> f64 {
        match self.bounds.get_mut(sensor) {
            Some(bounds) => {
                bounds.observe(raw);
                bounds.normalize(raw)
            }
            None => 0.0,
        }
    }

    /// Forget every observed range.
    pub fn reset(&mut self) {
        self.bounds.fill(SensorBounds::UNOBSERVED);
    }
}
