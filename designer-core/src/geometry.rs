//! Rectangle and edge utilities shared by layout and alignment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ComponentId;

/// Tolerance below which two positions are considered identical.
pub const EPSILON: f32 = 0.1;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Named edge or center line of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Edge {
    /// Left edge.
    Left,
    /// Right edge.
    Right,
    /// Vertical center line.
    CenterX,
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
    /// Horizontal center line.
    CenterY,
}

impl Edge {
    /// Edges that lie on vertical lines (compared along X).
    pub const VERTICAL: [Self; 3] = [Self::Left, Self::Right, Self::CenterX];
    /// Edges that lie on horizontal lines (compared along Y).
    pub const HORIZONTAL: [Self; 3] = [Self::Top, Self::Bottom, Self::CenterY];

    /// Whether this edge is a vertical line.
    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Left | Self::Right | Self::CenterX)
    }

    /// Fraction of the rectangle's extent between its origin and this edge.
    #[must_use]
    pub fn fraction(self) -> f32 {
        match self {
            Self::Left | Self::Top => 0.0,
            Self::CenterX | Self::CenterY => 0.5,
            Self::Right | Self::Bottom => 1.0,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::CenterX => "centerX",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::CenterY => "centerY",
        };
        f.write_str(name)
    }
}

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Horizontal center.
    #[must_use]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Vertical center.
    #[must_use]
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Coordinate of a named edge.
    #[must_use]
    pub fn edge(&self, edge: Edge) -> f32 {
        match edge {
            Edge::Left => self.left(),
            Edge::Right => self.right(),
            Edge::CenterX => self.center_x(),
            Edge::Top => self.top(),
            Edge::Bottom => self.bottom(),
            Edge::CenterY => self.center_y(),
        }
    }

    /// Origin that places `edge` exactly at `position`, on that edge's axis.
    #[must_use]
    pub fn origin_for_edge(&self, edge: Edge, position: f32) -> f32 {
        let extent = if edge.is_vertical() {
            self.width
        } else {
            self.height
        };
        position - extent * edge.fraction()
    }

    /// Top-left corner.
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Width and height.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Same size, different origin.
    #[must_use]
    pub fn with_origin(&self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    /// Grow on every side by `amount` (shrink when negative).
    #[must_use]
    pub fn inflated(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    /// Check if a point is within this rectangle.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }
}

/// A rectangle owned by a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRect {
    /// Owning component.
    pub id: ComponentId,
    /// Resolved rectangle.
    #[serde(flatten)]
    pub rect: Rect,
}

impl ComponentRect {
    /// Create a new component rectangle.
    #[must_use]
    pub fn new(id: ComponentId, rect: Rect) -> Self {
        Self { id, rect }
    }
}

/// Whether two coordinates are within `threshold` of each other.
#[must_use]
pub fn within_threshold(a: f32, b: f32, threshold: f32) -> bool {
    (a - b).abs() <= threshold
}

/// Whether two coordinates are the same line for alignment purposes.
#[must_use]
pub fn nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Round a coordinate to the nearest multiple of `grid_size`.
///
/// Non-positive grid sizes leave the value unchanged.
#[must_use]
pub fn snap_value(value: f32, grid_size: f32) -> f32 {
    if grid_size <= 0.0 || !grid_size.is_finite() {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Round both coordinates of a point to the nearest grid intersection.
#[must_use]
pub fn snap_to_grid(point: Point, grid_size: f32) -> Point {
    Point::new(snap_value(point.x, grid_size), snap_value(point.y, grid_size))
}
