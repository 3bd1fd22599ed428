//! Track - The fixed waypoint circuit
//!
//! Waypoints double as the racing line and as checkpoint locations.
//! Index 0 is the start/finish point and indices wrap around.

use serde::{Deserialize, Serialize};

/// A point on the playfield
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Heading that faces `other`, 0 = towards decreasing y
    pub fn bearing_to(&self, other: Point) -> f64 {
        (other.x - self.x).atan2(-(other.y - self.y))
    }
}

/// Default oval circuit, listed in driving order
const DEFAULT_CIRCUIT: [Point; 12] = [
    Point::new(400.0, 500.0),
    Point::new(550.0, 490.0),
    Point::new(680.0, 440.0),
    Point::new(730.0, 340.0),
    Point::new(700.0, 220.0),
    Point::new(600.0, 130.0),
    Point::new(400.0, 100.0),
    Point::new(200.0, 130.0),
    Point::new(100.0, 220.0),
    Point::new(70.0, 340.0),
    Point::new(120.0, 440.0),
    Point::new(250.0, 490.0),
];

/// Lateral distance of each grid slot from the start line centre
const GRID_LANE_OFFSET: f64 = 15.0;

/// Immutable, cyclic sequence of waypoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaypointTrack {
    points: Vec<Point>,
}

impl WaypointTrack {
    /// Build a track. Needs at least two finite points.
    pub fn new(points: Vec<Point>) -> Result<Self, String> {
        if points.len() < 2 {
            return Err(format!(
                "a circuit needs at least 2 waypoints, got {}",
                points.len()
            ));
        }
        if let Some(i) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(format!("waypoint {} has a non-finite coordinate", i));
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Waypoint at `index`, wrapping past the end
    pub fn point(&self, index: usize) -> Point {
        self.points[index % self.points.len()]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.points.len()
    }

    pub fn distance_to(&self, from: Point, index: usize) -> f64 {
        from.distance_to(self.point(index))
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Starting position and heading for grid slot `lane` (0 or 1).
    ///
    /// Slots sit either side of waypoint 0, perpendicular to the first
    /// segment, facing waypoint 1.
    pub fn grid_slot(&self, lane: usize) -> (Point, f64) {
        let start = self.point(0);
        let heading = start.bearing_to(self.point(1));
        // Left normal of the heading direction (sin h, -cos h)
        let (nx, ny) = (-heading.cos(), -heading.sin());
        let side = if lane % 2 == 0 { 1.0 } else { -1.0 };
        let position = Point::new(
            start.x + nx * GRID_LANE_OFFSET * side,
            start.y + ny * GRID_LANE_OFFSET * side,
        );
        (position, heading)
    }
}

impl Default for WaypointTrack {
    fn default() -> Self {
        Self {
            points: DEFAULT_CIRCUIT.to_vec(),
        }
    }
}
