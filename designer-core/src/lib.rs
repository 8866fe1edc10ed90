//! # Page Designer Core
//!
//! Editing engine for a low-code visual page designer.
//! Compiles to WASM for the browser editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               DesignSession                 │
//! ├─────────────────────────────────────────────┤
//! │  Layout Engine    │  Alignment Engine       │
//! │  - Grid rows/cols │  - Edge/center guides   │
//! │  - Flex boxes     │  - Snap to guide/grid   │
//! │  - Responsive     │  - Spacing validation   │
//! │  - TTL cache      │                         │
//! ├─────────────────────────────────────────────┤
//! │  History Manager  │  Component Model        │
//! │  - Undo/redo      │  - Typed props          │
//! │  - Compression    │  - Styles/breakpoints   │
//! │  - Persistence    │  - Tree validation      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alignment;
pub mod component;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod layout;
pub mod session;
pub mod storage;
pub mod tree;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use alignment::{
    calculate_alignment, AlignmentGuide, AlignmentOptions, AlignmentResult, GuideOrientation,
    GuideStrength, LayoutIssue,
};
pub use component::{
    AlignItems, Breakpoint, ButtonProps, ButtonVariant, CheckboxProps, ColProps, ComponentId,
    ComponentInstance, ComponentProps, ComponentType, Dimension, DividerProps, Display,
    FlexDirection, FlexWrap, ImageProps, InputProps, JustifyContent, Orientation, PositionMode,
    PropsOverride, ResponsiveOverride, RowProps, SelectOption, SelectProps, SortPosition, Spacing,
    Styles, TextProps, WidgetSize,
};
pub use config::DesignerConfig;
pub use error::{DesignerError, DesignerResult, HistoryError, StorageError};
pub use geometry::{ComponentRect, Edge, Point, Rect, Size};
pub use history::{
    DesignSnapshot, HistoryActionType, HistoryConfig, HistoryItem, HistoryManager, NewHistoryItem,
    PersistenceConfig,
};
pub use layout::{
    LayoutCalculationResult, LayoutConfig, LayoutContext, LayoutEngine, LayoutInfo, Viewport,
};
pub use session::{DesignDocument, DesignSession, ValidationReport};
pub use storage::{FileStorage, HistoryStorage, MemoryStorage};
pub use tree::{ComponentMap, ComponentTree, TreeIssue};

/// Designer core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
