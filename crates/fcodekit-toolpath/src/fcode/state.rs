//! Trip bookkeeping shared by the FCode writers
//!
//! Tracks the head position, the extents reached, the travelled distance and
//! the estimated time, and collects the error strings reported to a writer.

use fcodekit_core::{mm_per_min_to_mm_per_sec, WriterWarning};
use fcodekit_settings::EstimatorSettings;

use super::estimator::{estimate_time, project_velocity, vertical_move_time};
use crate::gcode::MotionFlags;

/// Margin added to every extent written into metadata
pub const EXTENT_MARGIN: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TripState {
    acc_x: f64,
    acc_y: f64,
    z_speed: f64,
    home: [f32; 3],
    current: [f32; 3],
    /// mm/s
    current_feedrate: f64,
    /// Velocity carried out of the last XY segment, mm/s
    last_feedrate: f64,
    /// Direction of the last XY segment, radians
    last_direction: f64,
    traveled: f64,
    time_cost: f64,
    max_x: f32,
    max_y: f32,
    max_z: f32,
    max_radius: f32,
    filament: [f32; 3],
    errors: Vec<String>,
}

impl Default for TripState {
    fn default() -> Self {
        Self::new(&EstimatorSettings::default())
    }
}

impl TripState {
    pub fn new(settings: &EstimatorSettings) -> Self {
        Self {
            acc_x: settings.acc_x as f64,
            acc_y: settings.acc_y as f64,
            z_speed: settings.z_speed as f64,
            home: [0.0; 3],
            current: [0.0; 3],
            current_feedrate: 0.0,
            last_feedrate: 0.0,
            last_direction: 0.0,
            traveled: 0.0,
            time_cost: 0.0,
            max_x: 0.0,
            max_y: 0.0,
            max_z: 0.0,
            max_radius: 0.0,
            filament: [0.0; 3],
            errors: Vec::new(),
        }
    }

    /// Override the X acceleration, mm/s²
    pub fn set_acc_x(&mut self, acc: f64) {
        self.acc_x = acc;
    }

    /// Account for one motion event
    pub fn record_move(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32) {
        if flags.contains(MotionFlags::HAS_FEEDRATE) && feedrate > 0.0 {
            self.current_feedrate = mm_per_min_to_mm_per_sec(feedrate) as f64;
        }

        let targets = [
            (MotionFlags::HAS_X, 'X', x),
            (MotionFlags::HAS_Y, 'Y', y),
            (MotionFlags::HAS_Z, 'Z', z),
        ];
        for (flag, axis, value) in targets {
            if flags.contains(flag) && !value.is_finite() {
                self.record_warning(WriterWarning::NonFiniteTarget(axis));
                return;
            }
        }

        let mut delta = [0.0f64; 3];
        let mut has_move = false;

        if flags.contains(MotionFlags::HAS_X) {
            delta[0] = x as f64 - self.current[0] as f64;
            self.current[0] = x;
            self.max_x = self.max_x.max(x);
            has_move = true;
        }
        if flags.contains(MotionFlags::HAS_Y) {
            delta[1] = y as f64 - self.current[1] as f64;
            self.current[1] = y;
            self.max_y = self.max_y.max(y);
            has_move = true;
        }
        if flags.intersects(MotionFlags::HAS_X | MotionFlags::HAS_Y) {
            let radius = (self.current[0] as f64).hypot(self.current[1] as f64);
            self.max_radius = self.max_radius.max(radius.min(f32::MAX as f64) as f32);
        }
        if flags.contains(MotionFlags::HAS_Z) {
            if z < 0.0 {
                // Negative Z homes to the reference surface.
                self.current[2] = 0.0;
            } else {
                delta[2] = z as f64 - self.current[2] as f64;
                self.current[2] = z;
                self.max_z = self.max_z.max(z);
                has_move = true;
            }
        }

        if !has_move {
            return;
        }

        if delta[2].abs() > 0.0 {
            let distance = delta[2].abs();
            self.traveled += distance;
            let time = vertical_move_time(distance, self.z_speed);
            if time.is_finite() {
                self.time_cost += time;
            }
            return;
        }

        let distance = delta[0].hypot(delta[1]);
        if !(distance.is_finite() && distance > 0.0) {
            return;
        }
        self.traveled += distance;

        if self.current_feedrate <= 0.0 {
            self.record_warning(WriterWarning::BadFeedrate);
            return;
        }

        let direction = delta[1].atan2(delta[0]);
        let last_velocity = project_velocity(self.last_feedrate, self.last_direction, direction);
        let acceleration = if delta[1].abs() > 0.0 {
            self.acc_y
        } else {
            self.acc_x
        };
        let estimate = estimate_time(last_velocity, self.current_feedrate, acceleration, distance);
        if estimate.is_valid() {
            self.time_cost += estimate.time;
            self.last_feedrate = estimate.end_velocity;
            self.last_direction = direction;
        } else {
            self.record_warning(WriterWarning::BadFeedrate);
        }
    }

    /// Account for a dwell; negative or NaN durations add nothing
    pub fn record_sleep(&mut self, seconds: f32) {
        if seconds.is_finite() && seconds > 0.0 {
            self.time_cost += seconds as f64;
        }
    }

    pub fn record_home(&mut self) {
        self.current = self.home;
    }

    /// Record an `on_error` report as `ERROR <text>` or `WARNING <text>`
    pub fn record_error(&mut self, critical: bool, message: &str) {
        let prefix = if critical { "ERROR" } else { "WARNING" };
        self.errors.push(format!("{prefix} {message}"));
    }

    pub fn record_warning(&mut self, warning: WriterWarning) {
        tracing::warn!("{}", warning);
        self.record_error(false, &warning.to_string());
    }

    /// Filament used per extruder, mm
    pub fn set_filament_used(&mut self, filament: &[f32]) {
        for (slot, value) in self.filament.iter_mut().zip(filament) {
            *slot = *value;
        }
    }

    pub fn position(&self) -> [f32; 3] {
        self.current
    }

    pub fn traveled(&self) -> f64 {
        self.traveled
    }

    pub fn time_cost(&self) -> f64 {
        self.time_cost
    }

    pub fn max_x(&self) -> f32 {
        self.max_x
    }

    pub fn max_y(&self) -> f32 {
        self.max_y
    }

    pub fn max_z(&self) -> f32 {
        self.max_z
    }

    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// `FILAMENT_USED` value: one to three comma-separated totals
    pub fn filament_summary(&self) -> String {
        let used = if self.filament[2] != 0.0 {
            3
        } else if self.filament[1] != 0.0 {
            2
        } else {
            1
        };
        self.filament[..used]
            .iter()
            .map(|v| format!("{v:.2}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// `%.2f` rendering used for every computed metadata value
pub fn format_metric(value: f64) -> String {
    format!("{value:.2}")
}

/// Extent with the metadata margin applied
pub fn format_extent(value: f32) -> String {
    format_metric(value as f64 + EXTENT_MARGIN)
}
