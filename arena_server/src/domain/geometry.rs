// Plane geometry used by movement, placement and collision resolution.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (b - a).length()
}

/// Strict overlap test between two collision circles.
///
/// Touching circles (distance equal to the sum of radii) do not overlap.
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    distance(a, b) < radius_a + radius_b
}

/// Angle of the line from `from` to `to`, in radians.
///
/// Coincident centers have no defined direction; they resolve along +X.
pub fn contact_angle(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    if d.x == 0.0 && d.y == 0.0 {
        return 0.0;
    }
    d.y.atan2(d.x)
}

/// Pushes two overlapping circles apart along their contact angle.
///
/// Each circle moves half the overlap depth, so afterwards they are exactly
/// touching. Returns the unit normal pointing from `a` to `b`.
pub fn separate(a: &mut Vec2, radius_a: f32, b: &mut Vec2, radius_b: f32) -> Vec2 {
    let normal = Vec2::from_angle(contact_angle(*a, *b));
    let overlap = radius_a + radius_b - distance(*a, *b);
    if overlap > 0.0 {
        let push = normal * (overlap / 2.0);
        *a = *a - push;
        *b = *b + push;
    }
    normal
}

/// Mirrors `v` across the line perpendicular to `normal` (elastic reflection).
pub fn reflect(v: Vec2, normal: Vec2) -> Vec2 {
    v - normal * (2.0 * v.dot(normal))
}

/// Result of advancing a point toward a destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Moved(Vec2),
    Arrived,
}

/// Moves `pos` toward `target` by `speed`, or reports arrival once within `epsilon`.
pub fn step_toward(pos: Vec2, target: Vec2, speed: f32, epsilon: f32) -> Step {
    let d = target - pos;
    let dist = d.length();
    if dist <= epsilon {
        return Step::Arrived;
    }
    Step::Moved(pos + d * (speed / dist))
}
