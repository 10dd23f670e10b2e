// Per-side-count unit stats. Side count drives size, speed, cost and combat rank.
use thiserror::Error;

pub const MIN_SIDES: u8 = 3;
pub const MAX_SIDES: u8 = 9;

/// Bump whenever any entry below changes so clients can detect stale tables.
pub const SIDE_TABLE_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SideSpec {
    pub sides: u8,
    pub name: &'static str,
    /// Placement/replication price.
    pub cost: u32,
    /// Collision radius.
    pub size: f32,
    /// Distance per tick.
    pub speed: f32,
    pub color: &'static str,
}

#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    #[error("side table has no entry for {0} sides")]
    MissingSides(u8),
    #[error("side table entry for {0} sides is out of order")]
    Misordered(u8),
    #[error("side table entry for {sides} sides has a non-positive {field}")]
    NonPositive { sides: u8, field: &'static str },
}

#[derive(Debug, Clone)]
pub struct SideTable {
    pub version: u32,
    entries: Vec<SideSpec>,
}

impl SideTable {
    pub fn new(version: u32, entries: Vec<SideSpec>) -> Self {
        Self { version, entries }
    }

    /// Ensures every side count in range has a sane entry, stored in order.
    pub fn validate(&self) -> Result<(), TuningError> {
        for sides in MIN_SIDES..=MAX_SIDES {
            let idx = usize::from(sides - MIN_SIDES);
            let Some(spec) = self.entries.get(idx) else {
                return Err(TuningError::MissingSides(sides));
            };
            if spec.sides != sides {
                return Err(TuningError::Misordered(sides));
            }
            for (field, value) in [("size", spec.size), ("speed", spec.speed)] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(TuningError::NonPositive { sides, field });
                }
            }
            if spec.cost == 0 {
                return Err(TuningError::NonPositive {
                    sides,
                    field: "cost",
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, sides: u8) -> Option<&SideSpec> {
        if !(MIN_SIDES..=MAX_SIDES).contains(&sides) {
            return None;
        }
        self.entries
            .get(usize::from(sides - MIN_SIDES))
            .filter(|spec| spec.sides == sides)
    }

    /// Lookup for side counts already known to be in range.
    ///
    /// Out-of-range values are clamped; the table is validated at startup and
    /// units are only ever built from in-range side counts.
    pub fn spec(&self, sides: u8) -> &SideSpec {
        let clamped = sides.clamp(MIN_SIDES, MAX_SIDES);
        &self.entries[usize::from(clamped - MIN_SIDES)]
    }

    pub fn entries(&self) -> &[SideSpec] {
        &self.entries
    }
}

impl Default for SideTable {
    fn default() -> Self {
        let row = |sides, name, cost, size, speed, color| SideSpec {
            sides,
            name,
            cost,
            size,
            speed,
            color,
        };
        Self::new(
            SIDE_TABLE_VERSION,
            vec![
                row(3, "Triangle", 10, 20.0, 2.0, "#FF5733"),
                row(4, "Square", 15, 25.0, 1.8, "#33FF57"),
                row(5, "Pentagon", 23, 30.0, 1.6, "#3357FF"),
                row(6, "Hexagon", 34, 35.0, 1.4, "#F033FF"),
                row(7, "Heptagon", 51, 40.0, 1.2, "#FF33A1"),
                row(8, "Octagon", 77, 45.0, 1.0, "#33FFF6"),
                row(9, "Nonagon", 115, 50.0, 0.8, "#BFFF33"),
            ],
        )
    }
}
