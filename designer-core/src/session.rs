//! Editing session: one design plus the engines that operate on it.
//!
//! A [`DesignSession`] owns the live component map, the selection, and one
//! instance each of the layout engine, alignment settings and history
//! manager. Every structural edit goes through [`DesignSession::apply_edit`]
//! so it is captured in history and invalidates the affected layouts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::alignment::{calculate_alignment, validate_layout, AlignmentOptions, AlignmentResult, LayoutIssue};
use crate::config::DesignerConfig;
use crate::error::{DesignerError, DesignerResult};
use crate::geometry::{ComponentRect, Point, Size};
use crate::history::{DesignSnapshot, HistoryActionType, HistoryManager, NewHistoryItem};
use crate::layout::{LayoutCalculationResult, LayoutConfig, LayoutContext, LayoutEngine, Viewport};
use crate::storage::HistoryStorage;
use crate::tree::{ComponentMap, ComponentTree, TreeIssue};
use crate::{ComponentId, ComponentInstance, ComponentProps, Dimension, PositionMode, Styles};

/// A design as exchanged with hosts and stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    /// Every component, in any order.
    pub components: Vec<ComponentInstance>,
    /// Selected component ids.
    #[serde(default)]
    pub selected_ids: Vec<ComponentId>,
}

impl DesignDocument {
    /// Parse a design document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> DesignerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Index the components by id. Later duplicates replace earlier ones.
    #[must_use]
    pub fn component_map(&self) -> ComponentMap {
        self.components
            .iter()
            .map(|c| (c.id.clone(), c.clone()))
            .collect()
    }
}

/// Structural and spacing problems in a design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Hierarchy problems.
    pub tree_issues: Vec<TreeIssue>,
    /// Overlap and spacing problems between siblings.
    pub layout_issues: Vec<LayoutIssue>,
    /// Warnings raised during layout.
    pub layout_warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.tree_issues.is_empty() && self.layout_issues.is_empty() && self.layout_warnings.is_empty()
    }
}

/// One design being edited.
#[derive(Debug)]
pub struct DesignSession {
    components: ComponentMap,
    selection: Vec<ComponentId>,
    viewport: Viewport,
    layout_config: LayoutConfig,
    alignment: AlignmentOptions,
    engine: LayoutEngine,
    history: HistoryManager,
}

impl Default for DesignSession {
    fn default() -> Self {
        Self::new(DesignerConfig::default(), Viewport::new(1200.0, 800.0))
    }
}

impl DesignSession {
    /// Create an empty session with in-memory history.
    #[must_use]
    pub fn new(config: DesignerConfig, viewport: Viewport) -> Self {
        Self::with_history(config.clone(), viewport, HistoryManager::new(config.history))
    }

    /// Create an empty session whose history persists to `storage`.
    #[must_use]
    pub fn with_storage(
        config: DesignerConfig,
        viewport: Viewport,
        storage: impl HistoryStorage + 'static,
    ) -> Self {
        let history = HistoryManager::with_storage(config.history.clone(), storage);
        Self::with_history(config, viewport, history)
    }

    fn with_history(config: DesignerConfig, viewport: Viewport, history: HistoryManager) -> Self {
        Self {
            components: ComponentMap::new(),
            selection: Vec::new(),
            viewport,
            layout_config: config.layout,
            alignment: config.alignment,
            engine: LayoutEngine::with_config(config.cache),
            history,
        }
    }

    /// Replace the design. History is kept, so a restored persisted
    /// history stays usable after the host reloads its document.
    pub fn load_design(&mut self, document: DesignDocument) {
        self.components = document.component_map();
        self.selection = document.selected_ids;
        self.engine.clear_cache();
        self.engine.clear_debounce_timers();
        tracing::debug!(components = self.components.len(), "Loaded design");
    }

    /// The design as a document.
    #[must_use]
    pub fn document(&self) -> DesignDocument {
        DesignDocument {
            components: self.components.values().cloned().collect(),
            selected_ids: self.selection.clone(),
        }
    }

    /// Every component.
    #[must_use]
    pub fn components(&self) -> &ComponentMap {
        &self.components
    }

    /// A component by id.
    #[must_use]
    pub fn component(&self, id: &ComponentId) -> Option<&ComponentInstance> {
        self.components.get(id)
    }

    /// Selected ids.
    #[must_use]
    pub fn selection(&self) -> &[ComponentId] {
        &self.selection
    }

    /// Replace the selection. Not recorded in history.
    pub fn set_selection(&mut self, ids: Vec<ComponentId>) {
        self.selection = ids;
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Change the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Alignment settings.
    #[must_use]
    pub fn alignment_options(&self) -> &AlignmentOptions {
        &self.alignment
    }

    /// The history manager.
    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// The layout engine.
    #[must_use]
    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Root layout context for the current viewport.
    #[must_use]
    pub fn layout_context(&self) -> LayoutContext {
        LayoutContext::new(self.viewport).with_config(self.layout_config)
    }

    /// Capture the current design.
    #[must_use]
    pub fn snapshot(&self) -> DesignSnapshot {
        DesignSnapshot::new(self.components.clone(), self.selection.clone())
    }

    /// Lay out every root component.
    pub fn calculate_layout(&mut self) -> Vec<LayoutCalculationResult> {
        let context = self.layout_context();
        self.engine.calculate_design(&self.components, &context)
    }

    /// Every visible component rectangle, roots in order, each subtree
    /// pre-order.
    pub fn layout_rects(&mut self) -> Vec<ComponentRect> {
        self.calculate_layout()
            .iter()
            .flat_map(LayoutCalculationResult::flatten)
            .collect()
    }

    /// Run an edit against a working copy of the design and record it.
    ///
    /// `edit` returns the ids it touched. If it fails, the design and the
    /// history are unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `edit`.
    pub fn apply_edit<F>(
        &mut self,
        action: HistoryActionType,
        description: impl Into<String>,
        edit: F,
    ) -> DesignerResult<Vec<ComponentId>>
    where
        F: FnOnce(&mut ComponentMap) -> DesignerResult<Vec<ComponentId>>,
    {
        let mut working = self.components.clone();
        let touched = edit(&mut working)?;

        let before = self.snapshot();
        let previous = std::mem::replace(&mut self.components, working);
        self.selection.retain(|id| self.components.contains_key(id));
        let after = self.snapshot();

        for id in &touched {
            self.engine.invalidate_component(id, &previous);
            self.engine.invalidate_component(id, &self.components);
        }

        let mut entry = NewHistoryItem::new(action, description, &before, &after);
        match touched.as_slice() {
            [single] => entry = entry.with_component(single.clone()),
            [] => {}
            many => entry = entry.with_components(many.to_vec()),
        }
        self.history.add_history_item(entry);
        Ok(touched)
    }

    /// Add a component.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken or the parent does not exist.
    pub fn add_component(&mut self, component: ComponentInstance) -> DesignerResult<()> {
        let description = format!("Add {}", component.component_type());
        self.apply_edit(HistoryActionType::AddComponent, description, move |map| {
            if map.contains_key(&component.id) {
                return Err(DesignerError::InvalidOperation(format!(
                    "component {} already exists",
                    component.id
                )));
            }
            if let Some(parent) = &component.parent_id {
                if !map.contains_key(parent) {
                    return Err(DesignerError::ComponentNotFound(parent.to_string()));
                }
            }
            let id = component.id.clone();
            map.insert(id.clone(), component);
            Ok(vec![id])
        })?;
        Ok(())
    }

    /// Delete a component and its descendants. Returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Fails if the component does not exist.
    pub fn delete_component(&mut self, id: &ComponentId) -> DesignerResult<usize> {
        let touched = self.apply_edit(
            HistoryActionType::DeleteComponent,
            format!("Delete {id}"),
            |map| {
                if !map.contains_key(id) {
                    return Err(DesignerError::ComponentNotFound(id.to_string()));
                }
                let tree = ComponentTree::build(map);
                let mut removed = vec![id.clone()];
                removed.extend(tree.descendants(id));
                for gone in &removed {
                    map.remove(gone);
                }
                Ok(removed)
            },
        )?;
        for gone in &touched {
            self.engine.cancel_request(gone);
        }
        Ok(touched.len())
    }

    /// Replace a component's base styles.
    ///
    /// # Errors
    ///
    /// Fails if the component does not exist.
    pub fn update_styles(&mut self, id: &ComponentId, styles: Styles) -> DesignerResult<()> {
        self.edit_component(HistoryActionType::UpdateStyle, format!("Style {id}"), id, |c| {
            c.styles = styles;
        })
    }

    /// Replace a component's props.
    ///
    /// # Errors
    ///
    /// Fails if the component does not exist.
    pub fn update_props(&mut self, id: &ComponentId, props: ComponentProps) -> DesignerResult<()> {
        self.edit_component(HistoryActionType::UpdateProperty, format!("Edit {id}"), id, |c| {
            c.props = props;
        })
    }

    /// Set a component's explicit size.
    ///
    /// # Errors
    ///
    /// Fails if the component does not exist.
    pub fn resize_component(&mut self, id: &ComponentId, size: Size) -> DesignerResult<()> {
        self.edit_component(HistoryActionType::ResizeComponent, format!("Resize {id}"), id, |c| {
            c.styles.width = Some(Dimension::Px(size.width));
            c.styles.height = Some(Dimension::Px(size.height));
        })
    }

    /// Alignment guides and snapped origin for dragging `id` to `proposed`.
    ///
    /// Guides come from the component's siblings as currently laid out and,
    /// when no canvas size is configured, from the viewport.
    ///
    /// # Errors
    ///
    /// Fails if the component does not exist or is not visible.
    pub fn drag_preview(&mut self, id: &ComponentId, proposed: Point) -> DesignerResult<AlignmentResult> {
        let component = self
            .components
            .get(id)
            .ok_or_else(|| DesignerError::ComponentNotFound(id.to_string()))?;
        let parent = component.parent_id.clone();

        let rects = self.layout_rects();
        let target = rects
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| DesignerError::InvalidOperation(format!("component {id} is not visible")))?
            .rect
            .with_origin(proposed);
        let siblings: Vec<ComponentRect> = rects
            .into_iter()
            .filter(|r| {
                &r.id != id
                    && self.components.get(&r.id).map(|c| &c.parent_id) == Some(&parent)
            })
            .collect();

        let mut options = self.alignment.clone();
        if options.canvas_size.is_none() {
            options.canvas_size = Some(Size::new(self.viewport.width, self.viewport.height));
        }
        Ok(calculate_alignment(target, &siblings, &options))
    }

    /// Record a completed drag so the component's border box lands at
    /// `position`, in the same canvas coordinates
    /// [`drag_preview`](Self::drag_preview) works in.
    ///
    /// `left`/`top` are stored in pixels relative to where the layout would
    /// otherwise place the component. A `static` component becomes
    /// `relative` so the offsets take effect.
    ///
    /// # Errors
    ///
    /// Fails if the component does not exist or is not visible.
    pub fn commit_move(&mut self, id: &ComponentId, position: Point) -> DesignerResult<()> {
        let origin = self.unshifted_origin(id)?;
        let (left, top) = (position.x - origin.x, position.y - origin.y);
        tracing::debug!(component = %id, left, top, "Committing move");
        self.edit_component(HistoryActionType::MoveComponent, format!("Move {id}"), id, |c| {
            if c.styles.position == Some(PositionMode::Static) {
                c.styles.position = Some(PositionMode::Relative);
            }
            c.styles.left = Some(Dimension::Px(left));
            c.styles.top = Some(Dimension::Px(top));
        })
    }

    /// Revert the last edit. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().map(|item| item.before_state.clone()) else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    /// Reapply the last undone edit. Returns `false` if there was nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().map(|item| item.after_state.clone()) else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    /// Jump to a history position (`None` for before the first entry).
    /// Returns `false` for an invalid position.
    pub fn go_to(&mut self, index: Option<usize>) -> bool {
        let Some(snapshot) = self.history.go_to(index).cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    /// Whether [`undo`](Self::undo) would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`redo`](Self::redo) would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Export the history document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_history(&self) -> DesignerResult<String> {
        self.history.export_history()
    }

    /// Import a history document. The design itself is unchanged.
    pub fn import_history(&mut self, json: &str) -> bool {
        self.history.import_history(json)
    }

    /// Queue a debounced relayout of `id` for the current viewport.
    pub fn request_layout(&mut self, id: ComponentId, now: Instant) -> bool {
        let context = self.layout_context();
        self.engine.request_layout(id, context, now)
    }

    /// Run due debounced relayouts.
    pub fn poll_debounced(&mut self, now: Instant) -> Vec<LayoutCalculationResult> {
        self.engine.poll_debounced(&self.components, now)
    }

    /// Check the hierarchy and sibling spacing.
    pub fn validate(&mut self, min_spacing: f32) -> ValidationReport {
        let tree_issues = ComponentTree::validate(&self.components);
        let layouts = self.calculate_layout();
        let layout_warnings = layouts
            .iter()
            .flat_map(LayoutCalculationResult::all_warnings)
            .collect();

        let mut groups: BTreeMap<Option<ComponentId>, Vec<ComponentRect>> = BTreeMap::new();
        for rect in layouts.iter().flat_map(LayoutCalculationResult::flatten) {
            let parent = self.components.get(&rect.id).and_then(|c| c.parent_id.clone());
            groups.entry(parent).or_default().push(rect);
        }
        let layout_issues = groups
            .values()
            .flat_map(|rects| validate_layout(rects, min_spacing))
            .collect();

        ValidationReport {
            tree_issues,
            layout_issues,
            layout_warnings,
        }
    }

    fn edit_component(
        &mut self,
        action: HistoryActionType,
        description: String,
        id: &ComponentId,
        change: impl FnOnce(&mut ComponentInstance),
    ) -> DesignerResult<()> {
        self.apply_edit(action, description, |map| {
            let component = map
                .get_mut(id)
                .ok_or_else(|| DesignerError::ComponentNotFound(id.to_string()))?;
            change(component);
            Ok(vec![id.clone()])
        })?;
        Ok(())
    }

    /// Canvas origin of `id` with its `left`/`top` offsets zeroed.
    ///
    /// Offsets only shift a component and its subtree, so this is the point
    /// stored offsets are measured from. Uses a scratch engine to keep the
    /// session cache clean.
    fn unshifted_origin(&self, id: &ComponentId) -> DesignerResult<Point> {
        let mut scratch = self.components.clone();
        let component = scratch
            .get_mut(id)
            .ok_or_else(|| DesignerError::ComponentNotFound(id.to_string()))?;
        component.styles.left = Some(Dimension::Px(0.0));
        component.styles.top = Some(Dimension::Px(0.0));
        if component.styles.position == Some(PositionMode::Static) {
            component.styles.position = Some(PositionMode::Relative);
        }

        LayoutEngine::new()
            .calculate_design(&scratch, &self.layout_context())
            .iter()
            .find_map(|root| root.find(id))
            .filter(|result| result.visible)
            .map(|result| result.layout_info.position)
            .ok_or_else(|| DesignerError::InvalidOperation(format!("component {id} is not visible")))
    }

    fn restore(&mut self, snapshot: DesignSnapshot) {
        self.components = snapshot.components;
        self.selection = snapshot.selected_ids;
        self.engine.clear_cache();
        self.engine.clear_debounce_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::GuideStrength;
    use crate::{ButtonProps, ColProps, RowProps};

    fn id(raw: &str) -> ComponentId {
        ComponentId::new(raw)
    }

    fn boxed(raw: &str, x: f32, y: f32, w: f32, h: f32) -> ComponentInstance {
        ComponentInstance::new(raw, ComponentProps::Container).with_styles(Styles {
            position: Some(crate::PositionMode::Absolute),
            left: Some(Dimension::Px(x)),
            top: Some(Dimension::Px(y)),
            width: Some(Dimension::Px(w)),
            height: Some(Dimension::Px(h)),
            ..Styles::default()
        })
    }

    fn canvas_session() -> DesignSession {
        let mut session = DesignSession::default();
        session.load_design(DesignDocument {
            components: vec![
                ComponentInstance::new("page", ComponentProps::Container).with_styles(Styles {
                    height: Some(Dimension::Px(800.0)),
                    ..Styles::default()
                }),
                boxed("a", 0.0, 0.0, 100.0, 50.0).with_parent("page").with_order(0),
                boxed("b", 300.0, 200.0, 80.0, 40.0).with_parent("page").with_order(1),
            ],
            selected_ids: vec![id("b")],
        });
        session
    }

    #[test]
    fn test_add_and_undo() {
        let mut session = DesignSession::default();
        session
            .add_component(ComponentInstance::new("row", ComponentProps::Row(RowProps::default())))
            .expect("add row");
        session
            .add_component(
                ComponentInstance::new("col", ComponentProps::Col(ColProps { span: Some(6), offset: 0 }))
                    .with_parent("row"),
            )
            .expect("add col");
        assert_eq!(session.components().len(), 2);
        assert!(session.can_undo());

        assert!(session.undo());
        assert_eq!(session.components().len(), 1);
        assert!(session.redo());
        assert_eq!(session.components().len(), 2);
    }

    #[test]
    fn test_failed_edit_records_nothing() {
        let mut session = DesignSession::default();
        let orphan = ComponentInstance::new("x", ComponentProps::Container).with_parent("missing");
        assert!(matches!(
            session.add_component(orphan),
            Err(DesignerError::ComponentNotFound(_))
        ));
        assert!(session.components().is_empty());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut session = canvas_session();
        let removed = session.delete_component(&id("page")).expect("delete");
        assert_eq!(removed, 3);
        assert!(session.components().is_empty());
        assert!(session.selection().is_empty());

        session.undo();
        assert_eq!(session.components().len(), 3);
        assert_eq!(session.selection(), &[id("b")]);
    }

    #[test]
    fn test_delete_cancels_pending_layouts() {
        let mut session = canvas_session();
        let now = Instant::now();
        session.request_layout(id("b"), now);
        session.request_layout(id("a"), now);
        assert_eq!(session.engine().pending_requests(), 2);

        session.delete_component(&id("b")).expect("delete");
        assert_eq!(session.engine().pending_requests(), 1);
    }

    #[test]
    fn test_drag_preview_snaps_to_sibling() {
        let mut session = canvas_session();
        let preview = session
            .drag_preview(&id("b"), Point::new(103.0, 3.0))
            .expect("preview");
        assert_eq!(preview.snapped_position, Point::new(100.0, 0.0));
        assert!(preview.guides_with(GuideStrength::Strong).count() >= 1);
    }

    #[test]
    fn test_commit_move_updates_layout_and_history() {
        let mut session = canvas_session();
        session.commit_move(&id("b"), Point::new(100.0, 0.0)).expect("move");

        let rects = session.layout_rects();
        let b = rects.iter().find(|r| r.id == id("b")).expect("b laid out");
        assert_eq!(b.rect.x, 100.0);
        assert_eq!(b.rect.y, 0.0);
        assert_eq!(session.history().undo_description(), Some("Move b"));

        session.undo();
        let rects = session.layout_rects();
        let b = rects.iter().find(|r| r.id == id("b")).expect("b laid out");
        assert_eq!(b.rect.x, 300.0);
    }

    #[test]
    fn test_commit_move_of_static_child_becomes_relative() {
        let mut session = DesignSession::default();
        session.load_design(DesignDocument {
            components: vec![
                ComponentInstance::new("page", ComponentProps::Container).with_styles(Styles {
                    padding: Some(crate::Spacing::all(20.0)),
                    ..Styles::default()
                }),
                ComponentInstance::new("s", ComponentProps::Container)
                    .with_parent("page")
                    .with_styles(Styles {
                        position: Some(PositionMode::Static),
                        width: Some(Dimension::Px(100.0)),
                        height: Some(Dimension::Px(40.0)),
                        ..Styles::default()
                    }),
            ],
            selected_ids: Vec::new(),
        });

        session.commit_move(&id("s"), Point::new(70.0, 90.0)).expect("move");
        let styles = &session.component(&id("s")).expect("s").styles;
        assert_eq!(styles.position, Some(PositionMode::Relative));
        assert_eq!(styles.left, Some(Dimension::Px(50.0)));
        assert_eq!(styles.top, Some(Dimension::Px(70.0)));

        let rects = session.layout_rects();
        let s = rects.iter().find(|r| r.id == id("s")).expect("s laid out");
        assert_eq!((s.rect.x, s.rect.y), (70.0, 90.0));
    }

    #[test]
    fn test_drag_preview_unknown_component() {
        let mut session = canvas_session();
        assert!(matches!(
            session.drag_preview(&id("nope"), Point::default()),
            Err(DesignerError::ComponentNotFound(_))
        ));
    }

    #[test]
    fn test_validate_reports_sibling_overlap() {
        let mut session = canvas_session();
        session.commit_move(&id("b"), Point::new(50.0, 10.0)).expect("move");
        let report = session.validate(0.0);
        assert!(report.tree_issues.is_empty());
        assert_eq!(
            report.layout_issues,
            vec![LayoutIssue::Overlap { a: id("a"), b: id("b") }]
        );
    }

    #[test]
    fn test_update_props_and_styles() {
        let mut session = DesignSession::default();
        session
            .add_component(ComponentInstance::new(
                "btn",
                ComponentProps::Button(ButtonProps {
                    label: "Go".into(),
                    ..ButtonProps::default()
                }),
            ))
            .expect("add");
        session
            .update_props(
                &id("btn"),
                ComponentProps::Button(ButtonProps {
                    label: "Submit".into(),
                    ..ButtonProps::default()
                }),
            )
            .expect("props");
        session
            .resize_component(&id("btn"), Size::new(120.0, 40.0))
            .expect("resize");

        let rects = session.layout_rects();
        assert_eq!(rects[0].rect.width, 120.0);
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history().items_for_component(&id("btn")).len(), 3);

        assert!(session.go_to(None));
        assert!(session.components().is_empty());
    }
}
