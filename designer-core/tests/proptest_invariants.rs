//! Property-based invariant tests for the editing engine.
//!
//! 1. Grid snapping is idempotent.
//! 2. Strong edge alignment is symmetric.
//! 3. History length never exceeds its bound.
//! 4. Cursor predicates match the cursor position.
//! 5. Layout is deterministic across fresh engines.

use designer_core::alignment::{calculate_alignment, GuideSource};
use designer_core::geometry::{nearly_equal, snap_to_grid};
use designer_core::history::{DesignSnapshot, NewHistoryItem};
use designer_core::{
    AlignmentOptions, ColProps, ComponentId, ComponentInstance, ComponentMap, ComponentProps,
    ComponentRect, GuideOrientation, GuideStrength, HistoryActionType, HistoryConfig,
    HistoryManager, LayoutContext, LayoutEngine, Point, Rect, RowProps, Viewport,
};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (
        -500.0f32..500.0,
        -500.0f32..500.0,
        1.0f32..300.0,
        1.0f32..300.0,
    )
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

#[derive(Debug, Clone, Copy)]
enum HistoryOp {
    Add,
    Undo,
    Redo,
}

fn history_op_strategy() -> impl Strategy<Value = HistoryOp> {
    prop_oneof![
        3 => Just(HistoryOp::Add),
        1 => Just(HistoryOp::Undo),
        1 => Just(HistoryOp::Redo),
    ]
}

fn row_design(spans: &[u8]) -> ComponentMap {
    let mut components = ComponentMap::new();
    let row = ComponentInstance::new("row", ComponentProps::Row(RowProps::default()));
    components.insert(row.id.clone(), row);
    for (i, span) in spans.iter().enumerate() {
        let col = ComponentInstance::new(
            format!("col-{i}"),
            ComponentProps::Col(ColProps {
                span: Some(*span),
                offset: 0,
            }),
        )
        .with_parent("row")
        .with_order(u32::try_from(i).unwrap_or(u32::MAX));
        components.insert(col.id.clone(), col);
    }
    components
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Grid snapping is idempotent
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn snap_to_grid_is_idempotent(
        x in -10_000.0f32..10_000.0,
        y in -10_000.0f32..10_000.0,
        grid in 1u16..64,
    ) {
        let grid = f32::from(grid);
        let once = snap_to_grid(Point::new(x, y), grid);
        let twice = snap_to_grid(once, grid);
        prop_assert_eq!(once, twice);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Strong edge alignment is symmetric
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn strong_left_alignment_is_symmetric(
        a in rect_strategy(),
        b in rect_strategy(),
        delta in -4.5f32..4.5,
    ) {
        let b = Rect::new(a.x + delta, b.y, b.width, b.height);
        let options = AlignmentOptions::default();
        let a_id = ComponentId::new("a");
        let b_id = ComponentId::new("b");

        let has_strong_at = |target: Rect, other: Rect, other_id: &ComponentId| {
            let sibling = ComponentRect::new(other_id.clone(), other);
            calculate_alignment(target, &[sibling], &options)
                .guides
                .iter()
                .any(|g| {
                    g.orientation == GuideOrientation::Vertical
                        && g.strength == GuideStrength::Strong
                        && nearly_equal(g.position, other.left())
                        && g.source == GuideSource::Component(other_id.clone())
                })
        };

        prop_assert!(has_strong_at(a, b, &b_id), "a should see b's left edge");
        prop_assert!(has_strong_at(b, a, &a_id), "b should see a's left edge");
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-4. History bounds and cursor predicates
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn history_stays_bounded_with_consistent_cursor(
        max_size in 1usize..12,
        threshold in 1usize..15,
        ops in proptest::collection::vec(history_op_strategy(), 0..60),
    ) {
        let config = HistoryConfig::default()
            .with_max_history_size(max_size)
            .with_compression_threshold(threshold);
        let mut history = HistoryManager::new(config);
        let snapshot = DesignSnapshot::default();

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                HistoryOp::Add => {
                    let action = if i % 2 == 0 {
                        HistoryActionType::MoveComponent
                    } else {
                        HistoryActionType::UpdateStyle
                    };
                    history.add_history_item(
                        NewHistoryItem::new(action, format!("edit {i}"), &snapshot, &snapshot)
                            .with_component("box"),
                    );
                    prop_assert!(!history.can_redo(), "adding clears the redo branch");
                }
                HistoryOp::Undo => {
                    history.undo();
                }
                HistoryOp::Redo => {
                    history.redo();
                }
            }

            let len = i64::try_from(history.len()).unwrap_or(i64::MAX);
            let cursor = history.current_index();
            prop_assert!(history.len() <= max_size);
            prop_assert!((-1..len).contains(&cursor));
            prop_assert_eq!(history.can_undo(), cursor != -1);
            prop_assert_eq!(history.can_redo(), cursor != len - 1);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Layout is deterministic across fresh engines
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_is_deterministic(
        spans in proptest::collection::vec(1u8..=12, 1..8),
        width in 320.0f32..2000.0,
    ) {
        let components = row_design(&spans);
        let context = LayoutContext::new(Viewport::new(width, 800.0));
        let row = &components[&ComponentId::new("row")];

        let first = LayoutEngine::new().calculate_tree(row, &components, &context);
        let second = LayoutEngine::new().calculate_tree(row, &components, &context);
        prop_assert_eq!(first, second);
    }
}
