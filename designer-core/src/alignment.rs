//! Drag-time alignment guides and snapping.
//!
//! Given the rectangle being dragged and the rectangles around it, the engine
//! reports which edges line up (guides) and where the rectangle should land
//! (snapped position).
//!
//! ## Guide kinds
//!
//! | Strength | Produced by |
//! |----------|-------------|
//! | strong   | any edge or center of the target within `snap_threshold` of any edge or center of a sibling on the same axis; canvas edges |
//! | weak     | stacked or side-by-side adjacency within `weak_threshold`; canvas center lines |
//!
//! A *vertical* guide is a vertical line at an x position and is matched
//! against left, right and center-x. A *horizontal* guide is a horizontal
//! line at a y position.
//!
//! ## Snapping
//!
//! Snapping starts from the raw origin (grid-rounded if enabled). On each
//! axis the guide nearest to one of the raw rectangle's edges wins if it is
//! within `snap_threshold`; exact ties go to the guide listed first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{
    nearly_equal, snap_to_grid, within_threshold, ComponentRect, Edge, Point, Rect, Size,
};
use crate::ComponentId;

/// Axis a guide line runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideOrientation {
    /// Horizontal line at a y position.
    Horizontal,
    /// Vertical line at an x position.
    Vertical,
}

impl GuideOrientation {
    /// Rectangle edges that can sit on a guide of this orientation.
    #[must_use]
    pub fn edges(self) -> [Edge; 3] {
        match self {
            Self::Horizontal => Edge::HORIZONTAL,
            Self::Vertical => Edge::VERTICAL,
        }
    }
}

impl fmt::Display for GuideOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        })
    }
}

/// How strongly a guide suggests alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideStrength {
    /// Adjacency or canvas center line.
    Weak,
    /// Near-exact coincidence.
    Strong,
}

impl fmt::Display for GuideStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weak => "weak",
            Self::Strong => "strong",
        })
    }
}

/// What produced a guide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum GuideSource {
    /// An edge or center of another component.
    Component(ComponentId),
    /// An edge of the canvas.
    CanvasEdge,
    /// A center line of the canvas.
    CanvasCenter,
}

impl fmt::Display for GuideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(id) => write!(f, "component:{id}"),
            Self::CanvasEdge => f.write_str("canvas-edge"),
            Self::CanvasCenter => f.write_str("canvas-center"),
        }
    }
}

/// A line the dragged rectangle can align to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentGuide {
    /// Line orientation.
    #[serde(rename = "type")]
    pub orientation: GuideOrientation,
    /// X for vertical guides, Y for horizontal guides.
    pub position: f32,
    /// Strength.
    pub strength: GuideStrength,
    /// What produced the guide.
    pub source: GuideSource,
    /// The component the guide belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_component: Option<ComponentId>,
}

impl AlignmentGuide {
    fn component(
        orientation: GuideOrientation,
        position: f32,
        strength: GuideStrength,
        id: &ComponentId,
    ) -> Self {
        Self {
            orientation,
            position,
            strength,
            source: GuideSource::Component(id.clone()),
            target_component: Some(id.clone()),
        }
    }

    fn canvas(orientation: GuideOrientation, position: f32, strength: GuideStrength, source: GuideSource) -> Self {
        Self {
            orientation,
            position,
            strength,
            source,
            target_component: None,
        }
    }
}

/// An edge of the snapped rectangle that sits exactly on a guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedEdge {
    /// Edge of the dragged rectangle.
    pub edge: Edge,
    /// Guide position it sits on.
    pub position: f32,
    /// Strength of that guide.
    pub strength: GuideStrength,
    /// Source of that guide.
    pub source: GuideSource,
}

/// Output of [`calculate_alignment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentResult {
    /// Deduplicated guides to render.
    pub guides: Vec<AlignmentGuide>,
    /// Where the rectangle's origin should land.
    pub snapped_position: Point,
    /// Edges of the snapped rectangle lying on a guide.
    pub aligned_edges: Vec<AlignedEdge>,
}

impl AlignmentResult {
    /// Guides of one strength.
    pub fn guides_with(&self, strength: GuideStrength) -> impl Iterator<Item = &AlignmentGuide> {
        self.guides.iter().filter(move |g| g.strength == strength)
    }
}

/// Alignment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlignmentOptions {
    /// Distance within which edges produce strong guides and snap.
    pub snap_threshold: f32,
    /// Distance within which adjacency produces weak guides. Defaults to
    /// twice the snap threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_threshold: Option<f32>,
    /// Emit weak guides.
    pub show_weak_guides: bool,
    /// Emit strong guides.
    pub show_strong_guides: bool,
    /// Emit canvas edge and center guides.
    pub show_canvas_guides: bool,
    /// Canvas extent; canvas guides need it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_size: Option<Size>,
    /// Grid pitch.
    pub grid_size: f32,
    /// Round the raw origin to the grid before guide snapping.
    pub snap_to_grid: bool,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            snap_threshold: 5.0,
            weak_threshold: None,
            show_weak_guides: true,
            show_strong_guides: true,
            show_canvas_guides: true,
            canvas_size: None,
            grid_size: 10.0,
            snap_to_grid: false,
        }
    }
}

impl AlignmentOptions {
    /// Set the snap threshold.
    #[must_use]
    pub fn with_snap_threshold(mut self, threshold: f32) -> Self {
        self.snap_threshold = threshold;
        self
    }

    /// Set the weak-guide threshold.
    #[must_use]
    pub fn with_weak_threshold(mut self, threshold: f32) -> Self {
        self.weak_threshold = Some(threshold);
        self
    }

    /// Set the canvas size.
    #[must_use]
    pub fn with_canvas_size(mut self, size: Size) -> Self {
        self.canvas_size = Some(size);
        self
    }

    /// Enable grid rounding with the given pitch.
    #[must_use]
    pub fn with_grid(mut self, grid_size: f32) -> Self {
        self.grid_size = grid_size;
        self.snap_to_grid = true;
        self
    }

    /// Effective weak-guide threshold.
    #[must_use]
    pub fn weak_band(&self) -> f32 {
        self.weak_threshold.unwrap_or(self.snap_threshold * 2.0)
    }
}

/// Compute guides, snapped position and aligned edges for a drag.
#[must_use]
pub fn calculate_alignment(
    target: Rect,
    siblings: &[ComponentRect],
    options: &AlignmentOptions,
) -> AlignmentResult {
    let mut guides = calculate_horizontal_guides(target, siblings, options);
    guides.extend(calculate_vertical_guides(target, siblings, options));
    guides.extend(canvas_guides(target, options));
    let guides = dedup_guides(guides);

    let mut origin = if options.snap_to_grid {
        snap_to_grid(target.origin(), options.grid_size)
    } else {
        target.origin()
    };
    if let Some(x) = snap_axis(target, &guides, GuideOrientation::Vertical, options.snap_threshold) {
        origin.x = x;
    }
    if let Some(y) = snap_axis(target, &guides, GuideOrientation::Horizontal, options.snap_threshold) {
        origin.y = y;
    }

    let snapped = target.with_origin(origin);
    let aligned_edges = guides
        .iter()
        .flat_map(|guide| {
            guide
                .orientation
                .edges()
                .into_iter()
                .filter(|&edge| nearly_equal(snapped.edge(edge), guide.position))
                .map(|edge| AlignedEdge {
                    edge,
                    position: guide.position,
                    strength: guide.strength,
                    source: guide.source.clone(),
                })
        })
        .collect();

    AlignmentResult {
        guides,
        snapped_position: origin,
        aligned_edges,
    }
}

/// Horizontal guides (y positions) from sibling components.
#[must_use]
pub fn calculate_horizontal_guides(
    target: Rect,
    siblings: &[ComponentRect],
    options: &AlignmentOptions,
) -> Vec<AlignmentGuide> {
    axis_guides(target, siblings, options, GuideOrientation::Horizontal)
}

/// Vertical guides (x positions) from sibling components.
#[must_use]
pub fn calculate_vertical_guides(
    target: Rect,
    siblings: &[ComponentRect],
    options: &AlignmentOptions,
) -> Vec<AlignmentGuide> {
    axis_guides(target, siblings, options, GuideOrientation::Vertical)
}

fn axis_guides(
    target: Rect,
    siblings: &[ComponentRect],
    options: &AlignmentOptions,
    orientation: GuideOrientation,
) -> Vec<AlignmentGuide> {
    let edges = orientation.edges();
    // Adjacency pairs: (target edge, sibling edge) for touching sides.
    let adjacent = match orientation {
        GuideOrientation::Horizontal => [(Edge::Top, Edge::Bottom), (Edge::Bottom, Edge::Top)],
        GuideOrientation::Vertical => [(Edge::Left, Edge::Right), (Edge::Right, Edge::Left)],
    };
    let mut guides = Vec::new();

    for sibling in siblings {
        let rect = sibling.rect;
        if options.show_strong_guides {
            for sibling_edge in edges {
                let position = rect.edge(sibling_edge);
                if edges
                    .iter()
                    .any(|&t| within_threshold(target.edge(t), position, options.snap_threshold))
                {
                    guides.push(AlignmentGuide::component(
                        orientation,
                        position,
                        GuideStrength::Strong,
                        &sibling.id,
                    ));
                }
            }
        }
        if options.show_weak_guides {
            for (target_edge, sibling_edge) in adjacent {
                let position = rect.edge(sibling_edge);
                if within_threshold(target.edge(target_edge), position, options.weak_band()) {
                    guides.push(AlignmentGuide::component(
                        orientation,
                        position,
                        GuideStrength::Weak,
                        &sibling.id,
                    ));
                }
            }
        }
    }

    guides
}

fn canvas_guides(target: Rect, options: &AlignmentOptions) -> Vec<AlignmentGuide> {
    let Some(canvas) = options.canvas_size.filter(|_| options.show_canvas_guides) else {
        return Vec::new();
    };
    let mut guides = vec![
        AlignmentGuide::canvas(
            GuideOrientation::Vertical,
            canvas.width / 2.0,
            GuideStrength::Weak,
            GuideSource::CanvasCenter,
        ),
        AlignmentGuide::canvas(
            GuideOrientation::Horizontal,
            canvas.height / 2.0,
            GuideStrength::Weak,
            GuideSource::CanvasCenter,
        ),
    ];

    let edges = [
        (GuideOrientation::Vertical, 0.0),
        (GuideOrientation::Vertical, canvas.width),
        (GuideOrientation::Horizontal, 0.0),
        (GuideOrientation::Horizontal, canvas.height),
    ];
    for (orientation, position) in edges {
        let near = orientation
            .edges()
            .iter()
            .any(|&e| within_threshold(target.edge(e), position, options.snap_threshold));
        if near {
            guides.push(AlignmentGuide::canvas(
                orientation,
                position,
                GuideStrength::Strong,
                GuideSource::CanvasEdge,
            ));
        }
    }

    guides
}

/// Collapse guides of the same orientation within 0.1px. The first
/// occurrence is kept and takes the strongest strength among its duplicates.
fn dedup_guides(guides: Vec<AlignmentGuide>) -> Vec<AlignmentGuide> {
    let mut kept: Vec<AlignmentGuide> = Vec::with_capacity(guides.len());
    for guide in guides {
        match kept
            .iter_mut()
            .find(|k| k.orientation == guide.orientation && nearly_equal(k.position, guide.position))
        {
            Some(existing) => existing.strength = existing.strength.max(guide.strength),
            None => kept.push(guide),
        }
    }
    kept
}

/// New origin coordinate on one axis, if any guide is within the threshold.
fn snap_axis(
    target: Rect,
    guides: &[AlignmentGuide],
    orientation: GuideOrientation,
    threshold: f32,
) -> Option<f32> {
    let mut best: Option<(f32, Edge, f32)> = None;
    for guide in guides.iter().filter(|g| g.orientation == orientation) {
        for edge in orientation.edges() {
            let distance = (target.edge(edge) - guide.position).abs();
            if distance <= threshold && best.map_or(true, |(d, _, _)| distance < d) {
                best = Some((distance, edge, guide.position));
            }
        }
    }
    best.map(|(_, edge, position)| target.origin_for_edge(edge, position))
}

/// Whether two rectangles overlap once `a` is grown by `threshold` on every
/// side. Touching edges do not collide at threshold zero.
#[must_use]
pub fn detect_collision(a: Rect, b: Rect, threshold: f32) -> bool {
    let a = a.inflated(threshold);
    a.left() < b.right() && a.right() > b.left() && a.top() < b.bottom() && a.bottom() > b.top()
}

/// Per-axis gap between two rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    /// Horizontal gap, 0 when the x ranges overlap.
    pub horizontal: f32,
    /// Vertical gap, 0 when the y ranges overlap.
    pub vertical: f32,
}

impl Gap {
    /// Straight-line distance between the closest points.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.horizontal.hypot(self.vertical)
    }
}

/// Per-axis distance between two rectangles.
#[must_use]
pub fn calculate_min_distance(a: Rect, b: Rect) -> Gap {
    let horizontal = (b.left() - a.right()).max(a.left() - b.right()).max(0.0);
    let vertical = (b.top() - a.bottom()).max(a.top() - b.bottom()).max(0.0);
    Gap {
        horizontal,
        vertical,
    }
}

/// A spacing problem between two laid-out components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutIssue {
    /// The rectangles overlap.
    Overlap {
        /// First component.
        a: ComponentId,
        /// Second component.
        b: ComponentId,
    },
    /// The rectangles are closer than the minimum spacing.
    TooClose {
        /// First component.
        a: ComponentId,
        /// Second component.
        b: ComponentId,
        /// Actual distance.
        distance: f32,
    },
}

/// Check every pair of rectangles for overlap and minimum spacing.
#[must_use]
pub fn validate_layout(rects: &[ComponentRect], min_spacing: f32) -> Vec<LayoutIssue> {
    let mut issues = Vec::new();
    for (i, first) in rects.iter().enumerate() {
        for second in &rects[i + 1..] {
            if detect_collision(first.rect, second.rect, 0.0) {
                issues.push(LayoutIssue::Overlap {
                    a: first.id.clone(),
                    b: second.id.clone(),
                });
                continue;
            }
            let distance = calculate_min_distance(first.rect, second.rect).distance();
            if distance < min_spacing {
                issues.push(LayoutIssue::TooClose {
                    a: first.id.clone(),
                    b: second.id.clone(),
                    distance,
                });
            }
        }
    }
    issues
}
