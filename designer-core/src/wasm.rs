//! WebAssembly bindings for designer-core.
//!
//! Payloads cross the boundary as JSON strings; small status records are
//! built as plain JS objects.

use wasm_bindgen::prelude::*;

use crate::{ComponentId, DesignDocument, DesignSession, DesignerConfig, Point, Viewport};

/// Initialize the designer WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Design session handle for the browser editor.
#[wasm_bindgen]
pub struct WasmDesignSession {
    session: DesignSession,
}

#[wasm_bindgen]
impl WasmDesignSession {
    /// Create a session for a viewport. `config_json` may be empty for
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, config_json: &str) -> Result<WasmDesignSession, String> {
        let config = if config_json.trim().is_empty() {
            DesignerConfig::default()
        } else {
            DesignerConfig::from_json(config_json).map_err(|e| e.to_string())?
        };
        Ok(Self {
            session: DesignSession::new(config, Viewport::new(width, height)),
        })
    }

    /// Replace the design with a document.
    ///
    /// # Errors
    ///
    /// Returns an error string if JSON parsing fails.
    #[wasm_bindgen(js_name = loadDesign)]
    pub fn load_design(&mut self, json: &str) -> Result<(), String> {
        let document = DesignDocument::from_json(json).map_err(|e| e.to_string())?;
        self.session.load_design(document);
        Ok(())
    }

    /// Get the current design as JSON.
    #[wasm_bindgen(js_name = getDesignJson)]
    #[must_use]
    pub fn get_design_json(&self) -> String {
        serde_json::to_string(&self.session.document()).unwrap_or_default()
    }

    /// Change the viewport size.
    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.session.set_viewport(Viewport::new(width, height));
    }

    /// Lay out the design; returns the root results as JSON.
    #[wasm_bindgen(js_name = calculateLayout)]
    pub fn calculate_layout(&mut self) -> String {
        serde_json::to_string(&self.session.calculate_layout()).unwrap_or_default()
    }

    /// Guides and snapped position for dragging a component.
    ///
    /// # Errors
    ///
    /// Returns an error string if the component is unknown or hidden.
    #[wasm_bindgen(js_name = dragPreview)]
    pub fn drag_preview(&mut self, id: &str, x: f32, y: f32) -> Result<String, String> {
        let result = self
            .session
            .drag_preview(&ComponentId::new(id), Point::new(x, y))
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&result).map_err(|e| e.to_string())
    }

    /// Record a finished drag; `x`/`y` are canvas coordinates, as returned
    /// in the preview's `snappedPosition`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the component is unknown or hidden.
    #[wasm_bindgen(js_name = commitMove)]
    pub fn commit_move(&mut self, id: &str, x: f32, y: f32) -> Result<(), String> {
        self.session
            .commit_move(&ComponentId::new(id), Point::new(x, y))
            .map_err(|e| e.to_string())
    }

    /// Undo the last edit.
    #[must_use]
    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    /// Redo the last undone edit.
    #[must_use]
    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    /// Whether undo is available.
    #[wasm_bindgen(js_name = canUndo)]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    /// Whether redo is available.
    #[wasm_bindgen(js_name = canRedo)]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    /// Undo/redo state for toolbar buttons.
    ///
    /// Returns a JS object:
    /// `{ canUndo, canRedo, currentIndex, undoDescription, redoDescription }`.
    /// Descriptions are `null` when there is nothing to undo or redo.
    #[wasm_bindgen(js_name = historyState)]
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // History length is bounded
    pub fn history_state(&self) -> JsValue {
        let history = self.session.history();
        let description = |text: Option<&str>| text.map_or(JsValue::NULL, JsValue::from_str);

        let obj = js_sys::Object::new();
        let fields = [
            ("canUndo", JsValue::from_bool(history.can_undo())),
            ("canRedo", JsValue::from_bool(history.can_redo())),
            ("currentIndex", JsValue::from_f64(history.current_index() as f64)),
            ("undoDescription", description(history.undo_description())),
            ("redoDescription", description(history.redo_description())),
        ];
        for (key, value) in fields {
            let _ = js_sys::Reflect::set(&obj, &JsValue::from_str(key), &value);
        }
        obj.into()
    }

    /// Export the history document.
    ///
    /// # Errors
    ///
    /// Returns an error string if serialization fails.
    #[wasm_bindgen(js_name = exportHistory)]
    pub fn export_history(&self) -> Result<String, String> {
        self.session.export_history().map_err(|e| e.to_string())
    }

    /// Import a history document; `false` if it was rejected.
    #[wasm_bindgen(js_name = importHistory)]
    pub fn import_history(&mut self, json: &str) -> bool {
        self.session.import_history(json)
    }
}
