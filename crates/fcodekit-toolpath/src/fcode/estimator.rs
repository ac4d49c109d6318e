//! Segment travel-time estimation
//!
//! Each XY segment is modeled with a constant-acceleration profile: the head
//! accelerates from the velocity it carried out of the previous segment
//! (projected onto the new direction) toward the commanded feedrate. When the
//! segment is long enough the profile is a trapezoid and the head cruises at
//! the feedrate; otherwise it is a triangle and the segment ends below it.
//!
//! All velocities are mm/s, accelerations mm/s², distances mm, times seconds.

/// Outcome of estimating one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEstimate {
    /// Velocity reached at the end of the segment
    pub end_velocity: f64,
    /// Time spent on the segment
    pub time: f64,
}

impl SegmentEstimate {
    /// Whether the estimate can be added to a running total
    pub fn is_valid(&self) -> bool {
        self.time.is_finite() && self.end_velocity.is_finite()
    }
}

/// Component of the previous velocity along the new travel direction
pub fn project_velocity(last_velocity: f64, last_direction: f64, new_direction: f64) -> f64 {
    last_velocity * (new_direction - last_direction).cos()
}

/// Distance needed to go from `last_velocity` to `target_velocity`
pub fn acceleration_distance(last_velocity: f64, target_velocity: f64, acceleration: f64) -> f64 {
    (target_velocity.powi(2) - last_velocity.powi(2)) / (2.0 * acceleration)
}

/// Velocity reached at the end of a segment
fn estimate_velocity(
    last_velocity: f64,
    target_velocity: f64,
    acceleration: f64,
    distance: f64,
) -> f64 {
    if acceleration_distance(last_velocity, target_velocity, acceleration) <= distance {
        target_velocity
    } else {
        (last_velocity.powi(2) + 2.0 * acceleration * distance).sqrt()
    }
}

/// Velocity and time for a segment
///
/// `last_velocity` must already be projected onto the segment direction
/// (see [`project_velocity`]).
pub fn estimate_time(
    last_velocity: f64,
    target_velocity: f64,
    acceleration: f64,
    distance: f64,
) -> SegmentEstimate {
    let end_velocity = estimate_velocity(last_velocity, target_velocity, acceleration, distance);
    let d_acc = acceleration_distance(last_velocity, target_velocity, acceleration);
    let time = if d_acc <= distance {
        (target_velocity - last_velocity) / acceleration + (distance - d_acc) / target_velocity
    } else {
        (end_velocity - last_velocity) / acceleration
    };
    SegmentEstimate { end_velocity, time }
}

/// Time for a vertical move at the nominal Z speed
pub fn vertical_move_time(distance: f64, z_speed: f64) -> f64 {
    distance.abs() / z_speed
}
