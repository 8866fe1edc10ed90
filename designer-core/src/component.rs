//! Component instances - the nodes of a page design.
//!
//! A design is a flat map of [`ComponentInstance`]s keyed by [`ComponentId`].
//! Hierarchy is expressed through `parent_id` lookups (see [`crate::tree`]),
//! never through pointers, so snapshots of the map are plain owned data.
//!
//! ```text
//! ComponentInstance
//! ├── props      ComponentProps (tagged by "type": row | col | container | widget)
//! ├── styles     Styles (CSS-like, every property optional)
//! ├── responsive Breakpoint -> ResponsiveOverride
//! └── position   { z_index, order }   paint order / sibling order, not geometry
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Unique identifier for a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Create an identifier from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Named viewport-width thresholds used to select responsive overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    /// Below 576px.
    Xs,
    /// 576px and up.
    Sm,
    /// 768px and up.
    Md,
    /// 992px and up.
    Lg,
    /// 1200px and up.
    Xl,
    /// 1600px and up.
    Xxl,
}

impl Breakpoint {
    /// All breakpoints, smallest first.
    pub const ALL: [Self; 6] = [Self::Xs, Self::Sm, Self::Md, Self::Lg, Self::Xl, Self::Xxl];

    /// Minimum viewport width (inclusive) for this breakpoint.
    #[must_use]
    pub const fn min_width(self) -> f32 {
        match self {
            Self::Xs => 0.0,
            Self::Sm => 576.0,
            Self::Md => 768.0,
            Self::Lg => 992.0,
            Self::Xl => 1200.0,
            Self::Xxl => 1600.0,
        }
    }

    /// Select the breakpoint that applies to a viewport width.
    #[must_use]
    pub fn from_width(width: f32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|bp| width >= bp.min_width())
            .unwrap_or(Self::Xs)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Xs => "xs",
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
            Self::Xxl => "xxl",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Style values
// ---------------------------------------------------------------------------

/// A CSS-like length.
///
/// Deserialization never fails: numbers are pixels, `"N%"` is a percentage,
/// `"Npx"` or a numeric string is pixels, and anything else becomes `Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Dimension {
    /// Absolute pixels.
    Px(f32),
    /// Percentage of the containing box.
    Percent(f32),
    /// Determined by the layout algorithm.
    #[default]
    Auto,
}

impl Dimension {
    /// Resolve against a basis length. `Auto` has no definite value.
    #[must_use]
    pub fn resolve(self, basis: f32) -> Option<f32> {
        match self {
            Self::Px(px) => Some(px),
            Self::Percent(pct) => Some(basis * pct / 100.0),
            Self::Auto => None,
        }
    }

    /// The pixel value, if this is an absolute length.
    #[must_use]
    pub fn as_px(self) -> Option<f32> {
        match self {
            Self::Px(px) => Some(px),
            Self::Percent(_) | Self::Auto => None,
        }
    }

    /// Whether this is `Auto`.
    #[must_use]
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(pct) = raw.strip_suffix('%') {
            return pct
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map_or(Self::Auto, Self::Percent);
        }
        let number = raw.strip_suffix("px").unwrap_or(raw).trim();
        number
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map_or(Self::Auto, Self::Px)
    }
}

impl From<serde_json::Value> for Dimension {
    #[allow(clippy::cast_possible_truncation)] // Style lengths fit comfortably in f32
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map_or(Self::Auto, |v| Self::Px(v as f32)),
            serde_json::Value::String(s) => Self::parse(&s),
            _ => Self::Auto,
        }
    }
}

impl From<Dimension> for serde_json::Value {
    fn from(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Px(px) => Self::from(f64::from(px)),
            Dimension::Percent(pct) => Self::String(format!("{pct}%")),
            Dimension::Auto => Self::String("auto".to_string()),
        }
    }
}

/// Per-side spacing for margin and padding, in pixels.
///
/// Accepts a number (all sides), a CSS shorthand string (`"8px 16px"`), or an
/// object with `top`/`right`/`bottom`/`left`. Malformed input is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct Spacing {
    /// Top side.
    pub top: f32,
    /// Right side.
    pub right: f32,
    /// Bottom side.
    pub bottom: f32,
    /// Left side.
    pub left: f32,
}

impl Spacing {
    /// Same spacing on every side.
    #[must_use]
    pub const fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Total horizontal spacing.
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Total vertical spacing.
    #[must_use]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    fn from_shorthand(raw: &str) -> Self {
        let parts: Vec<f32> = raw
            .split_whitespace()
            .map(|part| Dimension::parse(part).as_px().unwrap_or(0.0))
            .collect();
        match parts.as_slice() {
            [all] => Self::all(*all),
            [vertical, horizontal] => Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            },
            [top, horizontal, bottom] => Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            },
            [top, right, bottom, left, ..] => Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            },
            [] => Self::default(),
        }
    }
}

impl From<serde_json::Value> for Spacing {
    fn from(value: serde_json::Value) -> Self {
        let side = |v: Option<&serde_json::Value>| {
            v.cloned()
                .map(Dimension::from)
                .and_then(Dimension::as_px)
                .unwrap_or(0.0)
        };
        match value {
            serde_json::Value::Number(_) => {
                Self::all(Dimension::from(value).as_px().unwrap_or(0.0))
            }
            serde_json::Value::String(s) => Self::from_shorthand(&s),
            serde_json::Value::Object(map) => Self {
                top: side(map.get("top")),
                right: side(map.get("right")),
                bottom: side(map.get("bottom")),
                left: side(map.get("left")),
            },
            _ => Self::default(),
        }
    }
}

/// CSS `position` modes the layout engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    /// Normal flow.
    Static,
    /// Normal flow, offset by `left`/`top`.
    Relative,
    /// Out of flow, placed by `left`/`top` inside the parent box.
    Absolute,
}

/// CSS `display` values the layout engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    /// Block box.
    Block,
    /// Flex container.
    Flex,
    /// Inline block box.
    InlineBlock,
    /// Not rendered and removed from flow.
    None,
}

/// Main axis direction of a flex container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexDirection {
    /// Left to right.
    #[default]
    Row,
    /// Right to left.
    RowReverse,
    /// Top to bottom.
    Column,
    /// Bottom to top.
    ColumnReverse,
}

impl FlexDirection {
    /// Whether the main axis is horizontal.
    #[must_use]
    pub fn is_row(self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }

    /// Whether items are placed in reverse order.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(self, Self::RowReverse | Self::ColumnReverse)
    }
}

/// Wrapping behavior of a flex container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexWrap {
    /// Single line.
    #[default]
    Nowrap,
    /// Wrap onto new lines.
    Wrap,
}

/// Main axis distribution of a flex container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JustifyContent {
    /// Pack at the start.
    #[default]
    FlexStart,
    /// Pack in the center.
    Center,
    /// Pack at the end.
    FlexEnd,
    /// First and last item at the edges, equal space between.
    SpaceBetween,
    /// Equal space around each item.
    SpaceAround,
    /// Equal space between and at the edges.
    SpaceEvenly,
}

/// Cross axis alignment of a flex container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignItems {
    /// Align to the cross start.
    FlexStart,
    /// Center on the cross axis.
    Center,
    /// Align to the cross end.
    FlexEnd,
    /// Fill the line's cross size.
    #[default]
    Stretch,
}

/// Deserialize an optional value, treating anything malformed as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`], with the type's default standing in for bad input.
fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// CSS-like style bag. Every property is optional.
///
/// Properties the engine does not model are kept verbatim in `extra` so a
/// round trip through the engine never drops user data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Styles {
    /// Box width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    /// Box height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    /// Lower bound on width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width: Option<Dimension>,
    /// Upper bound on width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<Dimension>,
    /// Lower bound on height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<Dimension>,
    /// Upper bound on height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<Dimension>,
    /// Horizontal offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Dimension>,
    /// Vertical offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<Dimension>,
    /// Positioning mode.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub position: Option<PositionMode>,
    /// Outer spacing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Spacing>,
    /// Inner spacing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<Spacing>,
    /// Display mode.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub display: Option<Display>,
    /// Flex main axis.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub flex_direction: Option<FlexDirection>,
    /// Flex wrapping.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub flex_wrap: Option<FlexWrap>,
    /// Flex main axis distribution.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub justify_content: Option<JustifyContent>,
    /// Flex cross axis alignment.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub align_items: Option<AlignItems>,
    /// Gap between flex items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<Dimension>,
    /// Foreground color.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub color: Option<String>,
    /// Background color.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub background_color: Option<String>,
    /// Unmodelled properties, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Styles {
    /// Merge an override on top of these styles. Set properties in
    /// `overrides` win.
    #[must_use]
    pub fn merged_with(&self, overrides: &Self) -> Self {
        let mut extra = self.extra.clone();
        extra.extend(overrides.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            width: overrides.width.or(self.width),
            height: overrides.height.or(self.height),
            min_width: overrides.min_width.or(self.min_width),
            max_width: overrides.max_width.or(self.max_width),
            min_height: overrides.min_height.or(self.min_height),
            max_height: overrides.max_height.or(self.max_height),
            left: overrides.left.or(self.left),
            top: overrides.top.or(self.top),
            position: overrides.position.or(self.position),
            margin: overrides.margin.or(self.margin),
            padding: overrides.padding.or(self.padding),
            display: overrides.display.or(self.display),
            flex_direction: overrides.flex_direction.or(self.flex_direction),
            flex_wrap: overrides.flex_wrap.or(self.flex_wrap),
            justify_content: overrides.justify_content.or(self.justify_content),
            align_items: overrides.align_items.or(self.align_items),
            gap: overrides.gap.or(self.gap),
            color: overrides.color.clone().or_else(|| self.color.clone()),
            background_color: overrides
                .background_color
                .clone()
                .or_else(|| self.background_color.clone()),
            extra,
        }
    }

    /// Round pixel `left`/`top`/`width`/`height` to the nearest grid line.
    pub fn snap_to_grid(&mut self, grid_size: f32) {
        if grid_size <= 0.0 {
            return;
        }
        for value in [
            &mut self.left,
            &mut self.top,
            &mut self.width,
            &mut self.height,
        ] {
            if let Some(Dimension::Px(px)) = value {
                *px = crate::geometry::snap_value(*px, grid_size);
            }
        }
    }

    /// Resolved margin (zero when unset).
    #[must_use]
    pub fn margin_or_zero(&self) -> Spacing {
        self.margin.unwrap_or_default()
    }

    /// Resolved padding (zero when unset).
    #[must_use]
    pub fn padding_or_zero(&self) -> Spacing {
        self.padding.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// Size preset shared by form widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    /// Compact.
    Small,
    /// Default.
    #[default]
    Middle,
    /// Large.
    Large,
}

/// Visual variant of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonVariant {
    /// Emphasized action.
    Primary,
    /// Standard button.
    #[default]
    Default,
    /// Dashed outline.
    Dashed,
    /// Borderless text button.
    Text,
    /// Rendered as a link.
    Link,
}

/// Orientation of a divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Horizontal rule.
    #[default]
    Horizontal,
    /// Vertical rule.
    Vertical,
}

/// Props of a grid row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowProps {
    /// Horizontal spacing between columns, in pixels.
    pub gutter: f32,
    /// Whether columns wrap when their spans exceed the row.
    pub wrap: bool,
}

impl Default for RowProps {
    fn default() -> Self {
        Self {
            gutter: 0.0,
            wrap: true,
        }
    }
}

/// Props of a grid column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColProps {
    /// Columns spanned (out of 12). `None`, or a value that is not a
    /// small non-negative integer, spans the full row.
    #[serde(deserialize_with = "lenient")]
    pub span: Option<u8>,
    /// Columns skipped before this one. Malformed values count as 0.
    #[serde(deserialize_with = "lenient_or_default")]
    pub offset: u8,
}

/// Props of a text input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputProps {
    /// Placeholder text.
    pub placeholder: Option<String>,
    /// Current value.
    pub value: Option<String>,
    /// Whether input is disabled.
    pub disabled: bool,
    /// Size preset.
    pub size: WidgetSize,
}

/// One option of a select.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Display label.
    pub label: String,
    /// Submitted value.
    pub value: String,
}

/// Props of a select.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectProps {
    /// Available options.
    pub options: Vec<SelectOption>,
    /// Placeholder text.
    pub placeholder: Option<String>,
    /// Whether several options may be chosen.
    pub multiple: bool,
    /// Whether the select is disabled.
    pub disabled: bool,
    /// Size preset.
    pub size: WidgetSize,
}

/// Props of a button.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonProps {
    /// Button label.
    pub label: String,
    /// Visual variant.
    pub variant: ButtonVariant,
    /// Whether the button is disabled.
    pub disabled: bool,
    /// Size preset.
    pub size: WidgetSize,
}

/// Props of a text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    /// Text content.
    pub content: String,
    /// Heading level (1-5), `None` for body text.
    pub level: Option<u8>,
}

/// Props of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProps {
    /// Image source URL.
    pub src: String,
    /// Alternative text.
    pub alt: Option<String>,
}

/// Props of a checkbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckboxProps {
    /// Label next to the box.
    pub label: String,
    /// Whether the box is checked.
    pub checked: bool,
}

/// Props of a divider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividerProps {
    /// Divider orientation.
    pub orientation: Orientation,
}

/// Type-specific payload of a component. The variant is the component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentProps {
    /// 12-column grid row.
    Row(RowProps),
    /// Grid column inside a row.
    Col(ColProps),
    /// Flex container.
    Container,
    /// Text input.
    Input(InputProps),
    /// Dropdown select.
    Select(SelectProps),
    /// Button.
    Button(ButtonProps),
    /// Text block.
    Text(TextProps),
    /// Image.
    Image(ImageProps),
    /// Checkbox.
    Checkbox(CheckboxProps),
    /// Divider.
    Divider(DividerProps),
}

impl ComponentProps {
    /// The component type this payload belongs to.
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Row(_) => ComponentType::Row,
            Self::Col(_) => ComponentType::Col,
            Self::Container => ComponentType::Container,
            Self::Input(_) => ComponentType::Input,
            Self::Select(_) => ComponentType::Select,
            Self::Button(_) => ComponentType::Button,
            Self::Text(_) => ComponentType::Text,
            Self::Image(_) => ComponentType::Image,
            Self::Checkbox(_) => ComponentType::Checkbox,
            Self::Divider(_) => ComponentType::Divider,
        }
    }
}

/// Discriminant of [`ComponentProps`], used for dispatch and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// Grid row.
    Row,
    /// Grid column.
    Col,
    /// Flex container.
    Container,
    /// Text input.
    Input,
    /// Dropdown select.
    Select,
    /// Button.
    Button,
    /// Text block.
    Text,
    /// Image.
    Image,
    /// Checkbox.
    Checkbox,
    /// Divider.
    Divider,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Row => "row",
            Self::Col => "col",
            Self::Container => "container",
            Self::Input => "input",
            Self::Select => "select",
            Self::Button => "button",
            Self::Text => "text",
            Self::Image => "image",
            Self::Checkbox => "checkbox",
            Self::Divider => "divider",
        };
        f.write_str(name)
    }
}

/// Layout props a breakpoint may override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropsOverride {
    /// Column span override (columns only).
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub span: Option<u8>,
    /// Column offset override (columns only).
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub offset: Option<u8>,
    /// Hide the component at this breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Partial override applied at one breakpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsiveOverride {
    /// Style overrides.
    pub styles: Styles,
    /// Layout prop overrides.
    pub props: PropsOverride,
}

/// Paint order and sibling order. Not geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortPosition {
    /// Paint order.
    pub z_index: i32,
    /// Order among siblings sharing a parent.
    pub order: u32,
}

/// A node in the design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstance {
    /// Unique identifier.
    pub id: ComponentId,
    /// Owning component, `None` for roots.
    #[serde(default)]
    pub parent_id: Option<ComponentId>,
    /// Type-specific payload.
    pub props: ComponentProps,
    /// Base styles.
    #[serde(default)]
    pub styles: Styles,
    /// Per-breakpoint overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responsive: BTreeMap<Breakpoint, ResponsiveOverride>,
    /// Paint and sibling order.
    #[serde(default)]
    pub position: SortPosition,
}

impl ComponentInstance {
    /// Create a root component with empty styles.
    #[must_use]
    pub fn new(id: impl Into<ComponentId>, props: ComponentProps) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            props,
            styles: Styles::default(),
            responsive: BTreeMap::new(),
            position: SortPosition::default(),
        }
    }

    /// Set the parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<ComponentId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the sibling order.
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.position.order = order;
        self
    }

    /// Set the paint order.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.position.z_index = z_index;
        self
    }

    /// Set the base styles.
    #[must_use]
    pub fn with_styles(mut self, styles: Styles) -> Self {
        self.styles = styles;
        self
    }

    /// Add an override for a breakpoint.
    #[must_use]
    pub fn with_responsive(mut self, breakpoint: Breakpoint, overrides: ResponsiveOverride) -> Self {
        self.responsive.insert(breakpoint, overrides);
        self
    }

    /// The component type.
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        self.props.component_type()
    }

    /// Override for a breakpoint, if one is defined.
    #[must_use]
    pub fn responsive_for(&self, breakpoint: Breakpoint) -> Option<&ResponsiveOverride> {
        self.responsive.get(&breakpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_from_width() {
        assert_eq!(Breakpoint::from_width(320.0), Breakpoint::Xs);
        assert_eq!(Breakpoint::from_width(576.0), Breakpoint::Sm);
        assert_eq!(Breakpoint::from_width(800.0), Breakpoint::Md);
        assert_eq!(Breakpoint::from_width(1024.0), Breakpoint::Lg);
        assert_eq!(Breakpoint::from_width(1200.0), Breakpoint::Xl);
        assert_eq!(Breakpoint::from_width(1920.0), Breakpoint::Xxl);
        assert_eq!(Breakpoint::from_width(-5.0), Breakpoint::Xs);
    }

    #[test]
    fn test_dimension_parsing() {
        let parse = |v: serde_json::Value| Dimension::from(v);
        assert_eq!(parse(serde_json::json!(120)), Dimension::Px(120.0));
        assert_eq!(parse(serde_json::json!("50%")), Dimension::Percent(50.0));
        assert_eq!(parse(serde_json::json!("32px")), Dimension::Px(32.0));
        assert_eq!(parse(serde_json::json!("  64 ")), Dimension::Px(64.0));
        assert_eq!(parse(serde_json::json!("auto")), Dimension::Auto);
    }

    #[test]
    fn test_malformed_dimension_falls_back_to_auto() {
        for raw in [
            serde_json::json!("wide"),
            serde_json::json!(true),
            serde_json::json!({"w": 1}),
            serde_json::json!("abc%"),
        ] {
            assert_eq!(Dimension::from(raw), Dimension::Auto);
        }
    }

    #[test]
    fn test_dimension_resolve() {
        assert_eq!(Dimension::Px(10.0).resolve(500.0), Some(10.0));
        assert_eq!(Dimension::Percent(25.0).resolve(400.0), Some(100.0));
        assert_eq!(Dimension::Auto.resolve(400.0), None);
    }

    #[test]
    fn test_spacing_shorthand() {
        let spacing = Spacing::from(serde_json::json!("8px 16px"));
        assert_eq!(spacing.top, 8.0);
        assert_eq!(spacing.right, 16.0);
        assert_eq!(spacing.bottom, 8.0);
        assert_eq!(spacing.left, 16.0);
        assert_eq!(spacing.horizontal(), 32.0);

        let object = Spacing::from(serde_json::json!({"top": 4, "left": "12px"}));
        assert_eq!(object.top, 4.0);
        assert_eq!(object.left, 12.0);
        assert_eq!(object.right, 0.0);
    }

    #[test]
    fn test_styles_tolerate_malformed_values() {
        let json = r#"{
            "width": "huge",
            "height": 40,
            "flexDirection": "diagonal",
            "position": 7,
            "boxShadow": "0 1px 2px black"
        }"#;
        let styles: Styles = serde_json::from_str(json).expect("styles never fail");
        assert_eq!(styles.width, Some(Dimension::Auto));
        assert_eq!(styles.height, Some(Dimension::Px(40.0)));
        assert_eq!(styles.flex_direction, None);
        assert_eq!(styles.position, None);
        assert_eq!(
            styles.extra.get("boxShadow"),
            Some(&serde_json::json!("0 1px 2px black"))
        );
    }

    #[test]
    fn test_styles_merge_prefers_override() {
        let base = Styles {
            width: Some(Dimension::Px(100.0)),
            height: Some(Dimension::Px(50.0)),
            ..Styles::default()
        };
        let overrides = Styles {
            width: Some(Dimension::Percent(100.0)),
            ..Styles::default()
        };
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.width, Some(Dimension::Percent(100.0)));
        assert_eq!(merged.height, Some(Dimension::Px(50.0)));
    }

    #[test]
    fn test_styles_snap_to_grid_only_touches_pixels() {
        let mut styles = Styles {
            left: Some(Dimension::Px(13.0)),
            top: Some(Dimension::Px(7.0)),
            width: Some(Dimension::Percent(33.0)),
            height: Some(Dimension::Px(44.0)),
            ..Styles::default()
        };
        styles.snap_to_grid(8.0);
        assert_eq!(styles.left, Some(Dimension::Px(16.0)));
        assert_eq!(styles.top, Some(Dimension::Px(8.0)));
        assert_eq!(styles.width, Some(Dimension::Percent(33.0)));
        assert_eq!(styles.height, Some(Dimension::Px(48.0)));
    }

    #[test]
    fn test_component_json_shape() {
        let json = r#"{
            "id": "col-1",
            "parentId": "row-1",
            "props": {"type": "col", "span": 6},
            "styles": {"height": 80},
            "responsive": {"xs": {"props": {"span": 12}}},
            "position": {"zIndex": 2, "order": 1}
        }"#;
        let component: ComponentInstance = serde_json::from_str(json).expect("should parse");
        assert_eq!(component.component_type(), ComponentType::Col);
        assert_eq!(component.parent_id, Some(ComponentId::from("row-1")));
        assert_eq!(component.position.order, 1);
        assert_eq!(
            component
                .responsive_for(Breakpoint::Xs)
                .and_then(|o| o.props.span),
            Some(12)
        );
    }

    #[test]
    fn test_out_of_range_column_props_fall_back() {
        let json = r#"{
            "id": "col-1",
            "props": {"type": "col", "span": -3, "offset": 400},
            "responsive": {"sm": {"props": {"span": 1000, "offset": "2"}}}
        }"#;
        let component: ComponentInstance = serde_json::from_str(json).expect("should parse");
        assert_eq!(
            component.props,
            ComponentProps::Col(ColProps {
                span: None,
                offset: 0,
            })
        );
        let sm = component.responsive_for(Breakpoint::Sm).expect("sm override");
        assert_eq!(sm.props.span, None);
        assert_eq!(sm.props.offset, None);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ComponentId::generate(), ComponentId::generate());
    }
}
