//! Layout engine: resolves component geometry for a viewport.
//!
//! Each component is laid out inside a *container box* handed down by its
//! parent. The algorithm depends on the component type:
//!
//! - **Row**: a 12-column grid. Columns flow left to right and wrap onto a
//!   new line when their spans no longer fit.
//! - **Col**: width is `span` twelfths of the row, offset by `offset`
//!   twelfths. Children stack vertically.
//! - **Container**: flexbox with direction, wrap, justify, align and gap.
//!   Without `display: flex` children stack vertically.
//! - **Widgets**: explicit styles, falling back to [`StyleDefaults`].
//!
//! Responsive overrides for the viewport's breakpoint are merged over the
//! base styles before anything else happens. Results are memoized per
//! component and context in a [`LayoutCache`].

mod cache;
mod debounce;
mod defaults;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use web_time::Instant;

use serde::{Deserialize, Serialize};

pub use cache::{CacheStats, LayoutCache, LayoutCacheConfig, LayoutKey};
pub use debounce::Debouncer;
pub use defaults::{BuiltinDefaults, DefaultSize, StyleDefaults};

use crate::geometry::{ComponentRect, Point, Rect, EPSILON};
use crate::tree::ComponentMap;
use crate::{
    AlignItems, Breakpoint, ComponentId, ComponentInstance, ComponentProps, ComponentType,
    Dimension, Display, FlexDirection, FlexWrap, JustifyContent, PositionMode, RowProps, Spacing,
    Styles,
};

/// The visible area a design is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Breakpoint derived from the width.
    pub breakpoint: Breakpoint,
}

impl Viewport {
    /// Create a viewport; the breakpoint follows from the width.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            breakpoint: Breakpoint::from_width(width),
        }
    }

    /// The viewport as a rectangle at the origin.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Algorithm settings carried in every [`LayoutContext`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Round pixel `left`/`top`/`width`/`height` to the grid before layout.
    pub enable_grid_snapping: bool,
    /// Grid pitch in pixels.
    pub grid_size: f32,
    /// Columns in a grid row.
    pub columns: u8,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enable_grid_snapping: false,
            grid_size: 8.0,
            columns: 12,
        }
    }
}

/// Everything a component's layout depends on besides the component itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    /// The viewport being laid out for.
    pub viewport: Viewport,
    /// Box assigned by the parent. Its origin is where the component's
    /// margin box starts; its size is the basis for percentages.
    pub container: Rect,
    /// Gutter of the enclosing row, applied to column widths.
    pub column_gutter: f32,
    /// Algorithm settings.
    pub config: LayoutConfig,
}

impl LayoutContext {
    /// Root context: the container is the whole viewport.
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            container: viewport.rect(),
            column_gutter: 0.0,
            config: LayoutConfig::default(),
        }
    }

    /// Replace the container box.
    #[must_use]
    pub fn with_container(mut self, container: Rect) -> Self {
        self.container = container;
        self
    }

    /// Replace the algorithm settings.
    #[must_use]
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    fn child(&self, container: Rect) -> Self {
        Self {
            container,
            column_gutter: 0.0,
            ..*self
        }
    }
}

/// Resolved geometry of a component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    /// Border-box width.
    pub width: f32,
    /// Border-box height.
    pub height: f32,
    /// Border-box top-left corner in canvas coordinates.
    pub position: Point,
    /// Paint order.
    pub z_index: i32,
}

impl LayoutInfo {
    /// The border box as a rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.width, self.height)
    }
}

/// Responsive context echoed back with a result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveInfo {
    /// Breakpoint the layout was computed for.
    pub breakpoint: Breakpoint,
    /// Viewport width.
    pub viewport_width: f32,
    /// Viewport height.
    pub viewport_height: f32,
    /// Whether an override for the breakpoint was merged in.
    pub override_applied: bool,
}

/// Timing and reuse information for one calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInfo {
    /// Wall time spent producing the result.
    #[serde(with = "crate::config::duration_ms")]
    pub calculation_time: Duration,
    /// Components laid out, including descendants.
    pub affected_components: usize,
    /// Whether the result was served from the cache.
    pub optimized: bool,
}

/// Output of [`LayoutEngine::calculate_layout`] for one component subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCalculationResult {
    /// The component laid out.
    pub component_id: ComponentId,
    /// Its type.
    pub component_type: ComponentType,
    /// Merged styles with resolved `width`/`height` in pixels.
    pub computed_styles: Styles,
    /// Resolved geometry.
    pub layout_info: LayoutInfo,
    /// Geometry of each direct child, by id.
    pub children_layouts: BTreeMap<ComponentId, LayoutInfo>,
    /// Full results of the direct children, in sibling order.
    pub children: Vec<LayoutCalculationResult>,
    /// Responsive context.
    pub responsive: ResponsiveInfo,
    /// Timing and reuse.
    pub performance: PerformanceInfo,
    /// `false` when hidden at this breakpoint or `display: none`.
    pub visible: bool,
    /// Non-fatal conditions such as overflowing grid rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl LayoutCalculationResult {
    /// The border box.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.layout_info.rect()
    }

    /// Move this result and its whole subtree.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.layout_info.position.x += dx;
        self.layout_info.position.y += dy;
        for info in self.children_layouts.values_mut() {
            info.position.x += dx;
            info.position.y += dy;
        }
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    /// Find a result for `id` in this subtree.
    #[must_use]
    pub fn find(&self, id: &ComponentId) -> Option<&Self> {
        if &self.component_id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Rectangles of every visible component in this subtree, pre-order.
    #[must_use]
    pub fn flatten(&self) -> Vec<ComponentRect> {
        let mut out = Vec::new();
        self.collect_rects(&mut out);
        out
    }

    /// Warnings from this subtree, pre-order.
    #[must_use]
    pub fn all_warnings(&self) -> Vec<String> {
        let mut out = self.warnings.clone();
        for child in &self.children {
            out.extend(child.all_warnings());
        }
        out
    }

    fn collect_rects(&self, out: &mut Vec<ComponentRect>) {
        if !self.visible {
            return;
        }
        out.push(ComponentRect::new(self.component_id.clone(), self.rect()));
        for child in &self.children {
            child.collect_rects(out);
        }
    }

    fn margin(&self) -> Spacing {
        self.computed_styles.margin_or_zero()
    }

    fn is_out_of_flow(&self) -> bool {
        !self.visible || self.computed_styles.position == Some(PositionMode::Absolute)
    }

    /// Width including horizontal margins.
    fn outer_width(&self) -> f32 {
        self.layout_info.width + self.margin().horizontal()
    }

    /// Height including vertical margins.
    fn outer_height(&self) -> f32 {
        self.layout_info.height + self.margin().vertical()
    }

    fn outer_bottom(&self) -> f32 {
        self.layout_info.position.y + self.layout_info.height + self.margin().bottom
    }

    fn set_height(&mut self, height: f32) {
        self.layout_info.height = height;
        self.computed_styles.height = Some(Dimension::Px(height));
    }

    fn set_width(&mut self, width: f32) {
        self.layout_info.width = width;
        self.computed_styles.width = Some(Dimension::Px(width));
    }
}

/// Styles in effect at a breakpoint: base styles with the override merged in.
#[must_use]
pub fn effective_styles(component: &ComponentInstance, breakpoint: Breakpoint) -> Styles {
    component.responsive_for(breakpoint).map_or_else(
        || component.styles.clone(),
        |overrides| component.styles.merged_with(&overrides.styles),
    )
}

/// Direct children of `component`, ordered by `position.order` then id.
#[must_use]
pub fn children_of<'a>(
    component: &ComponentInstance,
    all: &'a ComponentMap,
) -> Vec<&'a ComponentInstance> {
    let mut children: Vec<&ComponentInstance> = all
        .values()
        .filter(|c| c.parent_id.as_ref() == Some(&component.id) && c.id != component.id)
        .collect();
    children.sort_by(|a, b| {
        a.position
            .order
            .cmp(&b.position.order)
            .then_with(|| a.id.cmp(&b.id))
    });
    children
}

/// Effective span of a grid child; non-columns take the full row.
fn column_span(component: &ComponentInstance, breakpoint: Breakpoint, columns: u8) -> u8 {
    let overridden = component
        .responsive_for(breakpoint)
        .and_then(|o| o.props.span);
    let span = match &component.props {
        ComponentProps::Col(col) => overridden.or(col.span).unwrap_or(columns),
        _ => columns,
    };
    span.min(columns)
}

fn column_offset(component: &ComponentInstance, breakpoint: Breakpoint, columns: u8) -> u8 {
    let overridden = component
        .responsive_for(breakpoint)
        .and_then(|o| o.props.offset);
    let offset = match &component.props {
        ComponentProps::Col(col) => overridden.unwrap_or(col.offset),
        _ => 0,
    };
    offset.min(columns)
}

fn clamp_dimension(value: f32, min: Option<Dimension>, max: Option<Dimension>, basis: f32) -> f32 {
    let mut value = value;
    if let Some(max) = max.and_then(|m| m.resolve(basis)) {
        value = value.min(max);
    }
    if let Some(min) = min.and_then(|m| m.resolve(basis)) {
        value = value.max(min);
    }
    value.max(0.0)
}

/// Start offset and spacing between items for a justify mode.
#[allow(clippy::cast_precision_loss)] // Sibling counts are small
fn justify_offsets(justify: JustifyContent, free: f32, count: usize, gap: f32) -> (f32, f32) {
    let n = count as f32;
    match justify {
        JustifyContent::FlexStart => (0.0, gap),
        JustifyContent::Center => (free / 2.0, gap),
        JustifyContent::FlexEnd => (free, gap),
        JustifyContent::SpaceBetween if free > 0.0 && count > 1 => (0.0, gap + free / (n - 1.0)),
        JustifyContent::SpaceAround if free > 0.0 => (free / n / 2.0, gap + free / n),
        JustifyContent::SpaceEvenly if free > 0.0 => (free / (n + 1.0), gap + free / (n + 1.0)),
        JustifyContent::SpaceBetween | JustifyContent::SpaceAround | JustifyContent::SpaceEvenly => {
            (0.0, gap)
        }
    }
}

/// Computes and caches component layouts.
pub struct LayoutEngine {
    cache: LayoutCache,
    pending: Debouncer<ComponentId, LayoutContext>,
    defaults: Box<dyn StyleDefaults + Send + Sync>,
    /// Components currently being laid out, outermost first.
    active: Vec<ComponentId>,
    /// Parent links skipped because they close a cycle.
    cycles_cut: u64,
}

impl fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("cache", &self.cache)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    /// Create an engine with default cache settings and built-in widget metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LayoutCacheConfig::default())
    }

    /// Create an engine with custom cache settings.
    #[must_use]
    pub fn with_config(config: LayoutCacheConfig) -> Self {
        Self {
            pending: Debouncer::new(config.debounce_interval),
            cache: LayoutCache::new(config),
            defaults: Box::new(BuiltinDefaults),
            active: Vec::new(),
            cycles_cut: 0,
        }
    }

    /// Replace the source of fallback sizes.
    #[must_use]
    pub fn with_defaults(mut self, defaults: impl StyleDefaults + Send + Sync + 'static) -> Self {
        self.defaults = Box::new(defaults);
        self
    }

    /// Lay out `component` and its subtree.
    ///
    /// `all` is the whole design; children are found by `parent_id`.
    /// Results are served from the cache when the same component was laid
    /// out in an identical context within the TTL.
    ///
    /// A child that is also an ancestor closes a cycle in the hierarchy; it
    /// is skipped with a warning and the affected results are not cached.
    pub fn calculate_layout(
        &mut self,
        component: &ComponentInstance,
        all: &ComponentMap,
        context: &LayoutContext,
    ) -> LayoutCalculationResult {
        let started = Instant::now();
        let key = LayoutKey::new(&component.id, context);

        if let Some(cached) = self.cache.get(&key, started) {
            let mut result = cached.clone();
            result.performance.optimized = true;
            result.performance.calculation_time = started.elapsed();
            return result;
        }

        let cycles_before = self.cycles_cut;
        self.active.push(component.id.clone());
        let mut result = self.compute(component, all, context);
        self.active.pop();
        result.performance.calculation_time = started.elapsed();
        if self.cycles_cut == cycles_before {
            self.cache.insert(key, result.clone(), Instant::now());
        }
        result
    }

    /// Lay out every root of the design against the viewport.
    pub fn calculate_design(
        &mut self,
        all: &ComponentMap,
        context: &LayoutContext,
    ) -> Vec<LayoutCalculationResult> {
        let roots: Vec<&ComponentInstance> = all
            .values()
            .filter(|c| c.parent_id.as_ref().map_or(true, |p| !all.contains_key(p)))
            .collect();
        tracing::debug!(
            roots = roots.len(),
            components = all.len(),
            breakpoint = %context.viewport.breakpoint,
            "Calculating design layout"
        );
        roots
            .into_iter()
            .map(|root| self.calculate_layout(root, all, context))
            .collect()
    }

    /// Lay out a subtree and return its visible rectangles, pre-order.
    pub fn calculate_tree(
        &mut self,
        component: &ComponentInstance,
        all: &ComponentMap,
        context: &LayoutContext,
    ) -> Vec<ComponentRect> {
        self.calculate_layout(component, all, context).flatten()
    }

    /// Request a recomputation that fires once the component has been quiet
    /// for the debounce interval. A newer request replaces a pending one.
    ///
    /// Returns `true` if a pending request was replaced.
    pub fn request_layout(&mut self, component_id: ComponentId, context: LayoutContext, now: Instant) -> bool {
        self.pending.schedule(component_id, context, now)
    }

    /// Drop a pending debounced request. Returns `true` if one was pending.
    pub fn cancel_request(&mut self, component_id: &ComponentId) -> bool {
        self.pending.cancel(component_id)
    }

    /// Run every debounced request whose interval has elapsed.
    ///
    /// Requests for components no longer in `all` are dropped.
    pub fn poll_debounced(&mut self, all: &ComponentMap, now: Instant) -> Vec<LayoutCalculationResult> {
        let due = self.pending.take_due(now);
        let mut results = Vec::with_capacity(due.len());
        for (id, context) in due {
            let Some(component) = all.get(&id) else {
                tracing::debug!(component = %id, "Dropping debounced layout for removed component");
                continue;
            };
            self.cache.invalidate(&HashSet::from([id]));
            results.push(self.calculate_layout(component, all, &context));
        }
        results
    }

    /// Earliest instant at which [`poll_debounced`](Self::poll_debounced)
    /// has work to do.
    #[must_use]
    pub fn next_debounce_deadline(&self) -> Option<Instant> {
        self.pending.next_deadline()
    }

    /// Number of pending debounced requests.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Drop cached results for a component and all of its ancestors.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_component(&mut self, id: &ComponentId, all: &ComponentMap) -> usize {
        let mut ids = HashSet::from([id.clone()]);
        let mut current = all.get(id).and_then(|c| c.parent_id.clone());
        while let Some(parent) = current {
            if !ids.insert(parent.clone()) {
                break;
            }
            current = all.get(&parent).and_then(|c| c.parent_id.clone());
        }
        let removed = self.cache.invalidate(&ids);
        tracing::trace!(component = %id, removed, "Invalidated layout cache");
        removed
    }

    /// Drop every cached result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Drop every pending debounced request.
    pub fn clear_debounce_timers(&mut self) {
        self.pending.clear();
    }

    /// Cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of cached results.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn compute(
        &mut self,
        component: &ComponentInstance,
        all: &ComponentMap,
        context: &LayoutContext,
    ) -> LayoutCalculationResult {
        let viewport = context.viewport;
        let overrides = component.responsive_for(viewport.breakpoint);
        let mut styles = effective_styles(component, viewport.breakpoint);
        if context.config.enable_grid_snapping {
            styles.snap_to_grid(context.config.grid_size);
        }
        let responsive = ResponsiveInfo {
            breakpoint: viewport.breakpoint,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            override_applied: overrides.is_some(),
        };
        let container = context.container;

        let hidden = overrides.and_then(|o| o.props.hidden).unwrap_or(false)
            || styles.display == Some(Display::None);
        if hidden {
            styles.display = Some(Display::None);
            return LayoutCalculationResult {
                component_id: component.id.clone(),
                component_type: component.component_type(),
                computed_styles: styles,
                layout_info: LayoutInfo {
                    width: 0.0,
                    height: 0.0,
                    position: container.origin(),
                    z_index: component.position.z_index,
                },
                children_layouts: BTreeMap::new(),
                children: Vec::new(),
                responsive,
                performance: PerformanceInfo {
                    calculation_time: Duration::ZERO,
                    affected_components: 1,
                    optimized: false,
                },
                visible: false,
                warnings: Vec::new(),
            };
        }

        let margin = styles.margin_or_zero();
        let padding = styles.padding_or_zero();
        let available_width = (container.width - margin.horizontal()).max(0.0);
        let available_height = (container.height - margin.vertical()).max(0.0);

        let mut x = container.x + margin.left;
        let mut y = container.y + margin.top;
        if styles.position != Some(PositionMode::Static) {
            x += styles
                .left
                .and_then(|l| l.resolve(container.width))
                .unwrap_or(0.0);
            y += styles
                .top
                .and_then(|t| t.resolve(container.height))
                .unwrap_or(0.0);
        }

        let fallback = self.defaults.default_size(&component.props);
        let width = if let ComponentProps::Col(_) = &component.props {
            let columns = context.config.columns.max(1);
            let span = column_span(component, viewport.breakpoint, columns);
            let offset = column_offset(component, viewport.breakpoint, columns);
            let unit = (container.width + context.column_gutter) / f32::from(columns);
            let offset_px = unit * f32::from(offset);
            x += offset_px;
            styles.margin = Some(Spacing {
                left: margin.left + offset_px,
                ..margin
            });
            (unit * f32::from(span) - context.column_gutter).max(0.0)
        } else {
            let width = styles
                .width
                .and_then(|w| w.resolve(container.width))
                .or_else(|| fallback.width.resolve(available_width))
                .unwrap_or(available_width);
            clamp_dimension(width, styles.min_width, styles.max_width, container.width)
        };

        let explicit_height = styles.height.and_then(|h| h.resolve(container.height));
        let content = Rect::new(
            x + padding.left,
            y + padding.top,
            (width - padding.horizontal()).max(0.0),
            (explicit_height.unwrap_or(available_height) - padding.vertical()).max(0.0),
        );

        let mut warnings = Vec::new();
        let mut children = children_of(component, all);
        children.retain(|child| {
            if !self.active.contains(&child.id) {
                return true;
            }
            tracing::warn!(
                component = %component.id,
                child = %child.id,
                "Cycle in component hierarchy; skipping child"
            );
            warnings.push(format!(
                "component {}: child {} is also an ancestor; skipped",
                component.id, child.id
            ));
            self.cycles_cut += 1;
            false
        });
        let (child_results, content_extent) = match &component.props {
            ComponentProps::Row(row) => {
                self.layout_row(component, row, &children, all, context, content, &mut warnings)
            }
            ComponentProps::Container => {
                let is_flex = styles.display == Some(Display::Flex);
                self.layout_flex(&styles, is_flex, explicit_height.is_some(), &children, all, context, content)
            }
            _ => self.layout_flex(&styles, false, explicit_height.is_some(), &children, all, context, content),
        };

        let height = explicit_height
            .or_else(|| {
                if child_results.is_empty() {
                    fallback.height.resolve(available_height)
                } else {
                    None
                }
            })
            .unwrap_or(content_extent + padding.vertical());
        let height = clamp_dimension(height, styles.min_height, styles.max_height, container.height);

        styles.width = Some(Dimension::Px(width));
        styles.height = Some(Dimension::Px(height));

        let children_layouts = child_results
            .iter()
            .map(|child| (child.component_id.clone(), child.layout_info))
            .collect();
        let affected = 1 + child_results
            .iter()
            .map(|c| c.performance.affected_components)
            .sum::<usize>();

        LayoutCalculationResult {
            component_id: component.id.clone(),
            component_type: component.component_type(),
            computed_styles: styles,
            layout_info: LayoutInfo {
                width,
                height,
                position: Point::new(x, y),
                z_index: component.position.z_index,
            },
            children_layouts,
            children: child_results,
            responsive,
            performance: PerformanceInfo {
                calculation_time: Duration::ZERO,
                affected_components: affected,
                optimized: false,
            },
            visible: true,
            warnings,
        }
    }

    /// Grid flow. Returns the child results and the height used.
    #[allow(clippy::too_many_arguments)]
    fn layout_row(
        &mut self,
        row: &ComponentInstance,
        props: &RowProps,
        children: &[&ComponentInstance],
        all: &ComponentMap,
        context: &LayoutContext,
        content: Rect,
        warnings: &mut Vec<String>,
    ) -> (Vec<LayoutCalculationResult>, f32) {
        let breakpoint = context.viewport.breakpoint;
        let columns = context.config.columns.max(1);
        let unit = (content.width + props.gutter) / f32::from(columns);

        let mut results = Vec::with_capacity(children.len());
        let mut total_span: u32 = 0;
        let mut used = 0.0_f32;
        let mut line_top = content.y;
        let mut line_bottom = content.y;

        for child in children {
            let child_styles = effective_styles(child, breakpoint);
            if child_styles.position == Some(PositionMode::Absolute) {
                results.push(self.calculate_layout(child, all, &context.child(content)));
                continue;
            }

            let span = column_span(child, breakpoint, columns);
            let units = f32::from(span) + f32::from(column_offset(child, breakpoint, columns));
            if props.wrap && used > 0.0 && used + units > f32::from(columns) {
                used = 0.0;
                line_top = line_bottom;
            }

            let slot = Rect::new(content.x + unit * used, line_top, content.width, content.height);
            let mut child_context = context.child(slot);
            child_context.column_gutter = props.gutter;
            let result = self.calculate_layout(child, all, &child_context);

            if result.visible {
                used += units;
                total_span += u32::from(span);
                line_bottom = line_bottom.max(result.outer_bottom());
            }
            results.push(result);
        }

        if total_span > u32::from(columns) {
            let message = format!(
                "row {}: column spans total {total_span} of {columns}; columns will wrap",
                row.id
            );
            tracing::debug!(component = %row.id, total_span, "Row overflow");
            warnings.push(message);
        }

        (results, line_bottom - content.y)
    }

    /// Flex flow. Returns the child results in sibling order and the
    /// vertical extent used.
    #[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
    fn layout_flex(
        &mut self,
        styles: &Styles,
        is_flex: bool,
        definite_height: bool,
        children: &[&ComponentInstance],
        all: &ComponentMap,
        context: &LayoutContext,
        content: Rect,
    ) -> (Vec<LayoutCalculationResult>, f32) {
        let breakpoint = context.viewport.breakpoint;
        let direction = styles.flex_direction.unwrap_or(if is_flex {
            FlexDirection::Row
        } else {
            FlexDirection::Column
        });
        let wrap = styles.flex_wrap == Some(FlexWrap::Wrap);
        let justify = styles.justify_content.unwrap_or_default();
        let align = styles.align_items.unwrap_or(if is_flex {
            AlignItems::Stretch
        } else {
            AlignItems::FlexStart
        });
        let row = direction.is_row();
        let main_extent = if row { content.width } else { content.height };
        let main_definite = row || definite_height;
        let gap = styles
            .gap
            .and_then(|g| g.resolve(main_extent))
            .unwrap_or(0.0);

        let mut results: Vec<LayoutCalculationResult> = children
            .iter()
            .map(|child| self.calculate_layout(child, all, &context.child(content)))
            .collect();
        let flow: Vec<usize> = (0..results.len())
            .filter(|&i| !results[i].is_out_of_flow())
            .collect();

        let outer_main = |r: &LayoutCalculationResult| if row { r.outer_width() } else { r.outer_height() };
        let outer_cross = |r: &LayoutCalculationResult| if row { r.outer_height() } else { r.outer_width() };

        let mut lines: Vec<Vec<usize>> = Vec::new();
        let mut cursor = 0.0_f32;
        for &i in &flow {
            let size = outer_main(&results[i]);
            let start_new = match lines.last() {
                None => true,
                Some(line) => wrap && !line.is_empty() && cursor + size > main_extent + EPSILON,
            };
            if start_new {
                lines.push(Vec::new());
                cursor = 0.0;
            }
            if let Some(line) = lines.last_mut() {
                line.push(i);
            }
            cursor += size + gap;
        }

        let mut cross_cursor = 0.0_f32;
        let mut max_main = 0.0_f32;
        for line in &lines {
            let used = line.iter().map(|&i| outer_main(&results[i])).sum::<f32>()
                + gap * line.len().saturating_sub(1) as f32;
            let line_cross = line
                .iter()
                .map(|&i| outer_cross(&results[i]))
                .fold(0.0, f32::max);
            let span = if main_definite { main_extent } else { used };
            let (start, between) = justify_offsets(justify, span - used, line.len(), gap);

            let mut pos = start;
            for &i in line {
                let result = &mut results[i];
                let margin = result.margin();
                if align == AlignItems::Stretch {
                    let child_styles = effective_styles(children[i], breakpoint);
                    if row && child_styles.height.map_or(true, Dimension::is_auto) {
                        result.set_height((line_cross - margin.vertical()).max(0.0));
                    } else if !row && child_styles.width.map_or(true, Dimension::is_auto) {
                        result.set_width((line_cross - margin.horizontal()).max(0.0));
                    }
                }
                let main_size = outer_main(result);
                let cross_size = outer_cross(result);
                let cross_offset = match align {
                    AlignItems::FlexStart | AlignItems::Stretch => 0.0,
                    AlignItems::Center => (line_cross - cross_size) / 2.0,
                    AlignItems::FlexEnd => line_cross - cross_size,
                };
                let main_pos = if direction.is_reverse() {
                    span - pos - main_size
                } else {
                    pos
                };
                let cross_pos = cross_cursor + cross_offset;
                if row {
                    result.translate(main_pos, cross_pos);
                } else {
                    result.translate(cross_pos, main_pos);
                }
                pos += main_size + between;
            }

            max_main = max_main.max(used);
            cross_cursor += line_cross + gap;
        }
        let cross_used = if lines.is_empty() {
            0.0
        } else {
            cross_cursor - gap
        };

        let vertical_extent = if row { cross_used } else { max_main };
        (results, vertical_extent)
    }
}
