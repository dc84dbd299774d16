use std::f64::consts::PI;

// Fitted track geometries produced by the trajectory fitting stage.
//
// The fit yields either a straight segment or a helix arc. The vertex
// extrapolator consumes these read-only and hands back shortened copies;
// callers decide whether to adopt the truncation.

const PARALLEL_EPS: f64 = 1e-12;

/// A straight-line trajectory segment between two 3D endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Line3 {
    pub first: [f64; 3],
    pub last: [f64; 3],
}

impl Line3 {
    pub fn new(first: [f64; 3], last: [f64; 3]) -> Self {
        Line3 { first, last }
    }

    /// Direction vector from the first endpoint to the last (not normalized).
    pub fn direction(&self) -> [f64; 3] {
        [
            self.last[0] - self.first[0],
            self.last[1] - self.first[1],
            self.last[2] - self.first[2],
        ]
    }

    pub fn length(&self) -> f64 {
        let d = self.direction();
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    /// Intersection of the (infinite) line with the plane `axis = value`,
    /// where `axis` indexes x, y or z. Returns None when the line runs
    /// parallel to the plane.
    pub fn point_at_plane(&self, axis: usize, value: f64) -> Option<[f64; 3]> {
        let direction = self.direction();
        if direction[axis].abs() < PARALLEL_EPS {
            return None;
        }
        let t = (value - self.first[axis]) / direction[axis];
        Some([
            self.first[0] + t * direction[0],
            self.first[1] + t * direction[1],
            self.first[2] + t * direction[2],
        ])
    }
}

/// A helix arc with its axis along z.
///
/// The curve parameter `t` counts turns: the running angle is `2*pi*t`,
/// the z position advances by `step` per unit of `t`, and the arc runs
/// over the parameter range `[t1, t2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Helix3 {
    /// Center of the helix circle; `center[2]` is the z origin of the arc.
    pub center: [f64; 3],
    pub radius: f64,
    /// Signed z advance per full turn (the pitch).
    pub step: f64,
    pub t1: f64,
    pub t2: f64,
}

impl Helix3 {
    pub fn new(center: [f64; 3], radius: f64, step: f64, t1: f64, t2: f64) -> Self {
        Helix3 {
            center,
            radius,
            step,
            t1,
            t2,
        }
    }

    /// Convert a running angle to the curve parameter.
    pub fn angle_to_t(angle: f64) -> f64 {
        angle / (2.0 * PI)
    }

    /// Convert a curve parameter to the running angle.
    pub fn t_to_angle(t: f64) -> f64 {
        t * 2.0 * PI
    }

    /// Curve parameter at a given z position. z is monotonic in t for a
    /// helix of nonzero pitch.
    pub fn t_from_z(&self, z: f64) -> f64 {
        (z - self.center[2]) / self.step
    }

    /// 3D position at a given curve parameter.
    pub fn position_at_t(&self, t: f64) -> [f64; 3] {
        let angle = Self::t_to_angle(t);
        [
            self.center[0] + self.radius * angle.cos(),
            self.center[1] + self.radius * angle.sin(),
            self.center[2] + self.step * t,
        ]
    }

    pub fn first(&self) -> [f64; 3] {
        self.position_at_t(self.t1)
    }

    pub fn last(&self) -> [f64; 3] {
        self.position_at_t(self.t2)
    }

    pub fn angle1(&self) -> f64 {
        Self::t_to_angle(self.t1)
    }

    pub fn angle2(&self) -> f64 {
        Self::t_to_angle(self.t2)
    }

    /// Arc length of one full turn.
    pub fn turn_length(&self) -> f64 {
        2.0 * PI * (self.radius.powi(2) + (self.step / (2.0 * PI)).powi(2)).sqrt()
    }

    /// Arc length of the parameter range [t1, t2].
    pub fn length(&self) -> f64 {
        self.turn_length() * (self.t2 - self.t1).abs()
    }
}

/// Tagged union over the supported trajectory fits.
#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryPattern {
    Line(Line3),
    Helix(Helix3),
}

impl TrajectoryPattern {
    /// First endpoint of the underlying curve.
    pub fn first(&self) -> [f64; 3] {
        match self {
            TrajectoryPattern::Line(line) => line.first,
            TrajectoryPattern::Helix(helix) => helix.first(),
        }
    }

    /// Last endpoint of the underlying curve.
    pub fn last(&self) -> [f64; 3] {
        match self {
            TrajectoryPattern::Line(line) => line.last,
            TrajectoryPattern::Helix(helix) => helix.last(),
        }
    }
}
