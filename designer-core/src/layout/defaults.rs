//! Intrinsic sizes for components without explicit dimensions.

use crate::{ComponentProps, Dimension, Orientation, WidgetSize};

/// Size a component takes when its styles leave width or height unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultSize {
    /// Fallback width, resolved against the available width.
    pub width: Dimension,
    /// Fallback height. `Auto` means "size to content".
    pub height: Dimension,
}

impl DefaultSize {
    /// Create a default size.
    #[must_use]
    pub const fn new(width: Dimension, height: Dimension) -> Self {
        Self { width, height }
    }
}

/// Source of per-type fallback sizes.
///
/// The layout engine consults this for every component whose width or height
/// is unset or `auto`. Implement it to plug in a different widget library's
/// metrics.
pub trait StyleDefaults {
    /// Fallback size for a component with these props.
    fn default_size(&self, props: &ComponentProps) -> DefaultSize;
}

/// Metrics of the built-in widget set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDefaults;

const FILL: Dimension = Dimension::Percent(100.0);
const CHAR_WIDTH: f32 = 8.0;
const HEADING_HEIGHTS: [f32; 5] = [46.0, 38.0, 32.0, 28.0, 24.0];
const BODY_LINE_HEIGHT: f32 = 22.0;

fn control_height(size: WidgetSize) -> f32 {
    match size {
        WidgetSize::Small => 24.0,
        WidgetSize::Middle => 32.0,
        WidgetSize::Large => 40.0,
    }
}

#[allow(clippy::cast_precision_loss)] // Label lengths are tiny
fn label_width(label: &str, padding: f32) -> f32 {
    label.chars().count() as f32 * CHAR_WIDTH + padding
}

impl StyleDefaults for BuiltinDefaults {
    fn default_size(&self, props: &ComponentProps) -> DefaultSize {
        match props {
            ComponentProps::Row(_) | ComponentProps::Col(_) | ComponentProps::Container => {
                DefaultSize::new(FILL, Dimension::Auto)
            }
            ComponentProps::Input(input) => {
                DefaultSize::new(FILL, Dimension::Px(control_height(input.size)))
            }
            ComponentProps::Select(select) => {
                DefaultSize::new(FILL, Dimension::Px(control_height(select.size)))
            }
            ComponentProps::Button(button) => DefaultSize::new(
                Dimension::Px(label_width(&button.label, 32.0)),
                Dimension::Px(control_height(button.size)),
            ),
            ComponentProps::Text(text) => {
                let height = text
                    .level
                    .and_then(|level| HEADING_HEIGHTS.get(usize::from(level.max(1)) - 1))
                    .copied()
                    .unwrap_or(BODY_LINE_HEIGHT);
                DefaultSize::new(FILL, Dimension::Px(height))
            }
            ComponentProps::Image(_) => DefaultSize::new(Dimension::Px(200.0), Dimension::Px(150.0)),
            ComponentProps::Checkbox(checkbox) => DefaultSize::new(
                Dimension::Px(label_width(&checkbox.label, 24.0)),
                Dimension::Px(BODY_LINE_HEIGHT),
            ),
            ComponentProps::Divider(divider) => match divider.orientation {
                Orientation::Horizontal => DefaultSize::new(FILL, Dimension::Px(1.0)),
                Orientation::Vertical => DefaultSize::new(Dimension::Px(1.0), Dimension::Px(16.0)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ButtonProps, InputProps, TextProps};

    #[test]
    fn test_control_heights_follow_size() {
        let small = ComponentProps::Input(InputProps {
            size: WidgetSize::Small,
            ..InputProps::default()
        });
        let large = ComponentProps::Input(InputProps {
            size: WidgetSize::Large,
            ..InputProps::default()
        });
        assert_eq!(BuiltinDefaults.default_size(&small).height, Dimension::Px(24.0));
        assert_eq!(BuiltinDefaults.default_size(&large).height, Dimension::Px(40.0));
    }

    #[test]
    fn test_button_width_tracks_label() {
        let button = ComponentProps::Button(ButtonProps {
            label: "Save".to_string(),
            ..ButtonProps::default()
        });
        assert_eq!(
            BuiltinDefaults.default_size(&button).width,
            Dimension::Px(4.0 * CHAR_WIDTH + 32.0)
        );
    }

    #[test]
    fn test_text_heading_levels() {
        let heading = |level| {
            ComponentProps::Text(TextProps {
                content: "Title".to_string(),
                level,
            })
        };
        assert_eq!(BuiltinDefaults.default_size(&heading(Some(1))).height, Dimension::Px(46.0));
        assert_eq!(BuiltinDefaults.default_size(&heading(None)).height, Dimension::Px(22.0));
        assert_eq!(
            BuiltinDefaults.default_size(&heading(Some(9))).height,
            Dimension::Px(BODY_LINE_HEIGHT)
        );
    }

    #[test]
    fn test_layout_types_fill_and_size_to_content() {
        let size = BuiltinDefaults.default_size(&ComponentProps::Container);
        assert_eq!(size.width, FILL);
        assert!(size.height.is_auto());
    }
}
