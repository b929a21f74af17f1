//! Planar geometry on normalized screen-space joints.

use glam::Vec2;

/// Angle in degrees at `b` going from `b -> a` to `b -> c`, in [0, 360).
///
/// The result depends on the orientation of the points: swapping `a` and `c`
/// gives `360 - angle`. When `a == b` or `b == c` the vector has zero length
/// and `atan2(0, 0) = 0` is used for it, so the value is deterministic but
/// meaningless.
pub fn angle(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ba = a - b;
    let bc = c - b;

    let angle = (bc.y.atan2(bc.x) - ba.y.atan2(ba.x)).to_degrees();
    let angle = if angle < 0.0 { angle + 360.0 } else { angle };

    // Adding 360 to a tiny negative value rounds to exactly 360
    angle % 360.0
}

/// Shortest distance between two angles in degrees, in [0, 180]
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let delta = (a - b).rem_euclid(360.0);
    delta.min(360.0 - delta)
}

/// Line in slope-intercept form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f32,
    pub intercept: f32,
}

impl Line {
    /// Line passing through two points. Vertical lines have no slope,
    /// they are flattened into the horizontal line at the height of `p`.
    pub fn through(p: Vec2, q: Vec2) -> Self {
        if p.x == q.x {
            return Self { slope: 0.0, intercept: p.y };
        }

        let slope = (q.y - p.y) / (q.x - p.x);
        Self {
            slope,
            intercept: p.y - slope * p.x,
        }
    }
}

/// Vertical offset between line A through (`p1`, `p2`) and line B through (`p3`, `p4`).
///
/// Exact for parallel lines. Otherwise it is the distance formula evaluated at
/// the first point of each line, which is only a rough "how far apart" signal
/// since non-parallel lines do not have a constant distance.
pub fn vertical_separation(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> f32 {
    let a = Line::through(p1, p2);
    let b = Line::through(p3, p4);

    if a.slope == b.slope {
        return (a.intercept - b.intercept).abs();
    }

    (a.slope * p3.x - b.slope * p1.x + b.intercept - a.intercept).abs()
        / (a.slope * a.slope + 1.0).sqrt()
}
