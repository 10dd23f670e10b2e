use crate::domain::geometry::Vec2;

/// Playable area. Units may leave it (hostiles spawn outside), but placement,
/// random targets and move orders are confined to it.
#[derive(Debug, Clone, Copy)]
pub struct ArenaBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ArenaBounds {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Distance from `p` to the nearest point of the arena (0 inside).
    pub fn distance_outside(&self, p: Vec2) -> f32 {
        let dx = (self.min_x - p.x).max(0.0).max(p.x - self.max_x);
        let dy = (self.min_y - p.y).max(0.0).max(p.y - self.max_y);
        dx.hypot(dy)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        // Centered on the origin; clients translate the view to the canvas center.
        Self {
            min_x: -500.0,
            max_x: 500.0,
            min_y: -300.0,
            max_y: 300.0,
        }
    }
}

/// Rule variants selectable per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Place anywhere free; players start with no units.
    Classic,
    /// New units must be placed near an owned unit; players start with one producer.
    Outpost,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Self::Classic),
            "outpost" => Some(Self::Outpost),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Outpost => "outpost",
        }
    }

    /// Maximum distance from an owned unit for new placements.
    pub fn placement_radius(self) -> Option<f32> {
        match self {
            Self::Classic => None,
            Self::Outpost => Some(150.0),
        }
    }

    /// Side count of the producer handed out on join/restart, if any.
    pub fn starting_unit_sides(self) -> Option<u8> {
        match self {
            Self::Classic => None,
            Self::Outpost => Some(3),
        }
    }
}
