//! Part tree engine for model-view-controller editors.
//!
//! A [`Viewer`] keeps a tree of visual parts in step with an application
//! model: content parts are created, reused, reordered and disposed so the
//! tree mirrors the content graph, while adapters bound to each part follow
//! the part's activation. Connections route between anchors whose positions
//! track the geometry of the parts they are bound to, and reversible edits
//! such as bends run through an [`OperationHistory`].

pub mod adapt;
pub mod anchors;
pub mod connection;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod logging;
pub mod metrics;
pub mod operations;
pub mod parts;
pub mod sync;
pub mod toolkit;
pub mod viewer;

pub use adapt::{Activatable, Adapter, AdapterContext, AdapterKey, DEFAULT_ROLE, OwnerBound};
pub use anchors::{Anchor, AnchorId, AnchorKey, AnchorKind, AnchorStore, PositionStrategy};
pub use connection::{
    Connection, ConnectionId, ConnectionLayer, OrthogonalRouter, PositionHints, RouteRequest,
    Router, StraightRouter,
};
pub use error::{MvcError, Result};
pub use geometry::{Bounds, Point};
pub use headless::{HeadlessToolkit, VisualId};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{MetricSnapshot, SyncMetrics};
pub use operations::{BendConnectionOperation, Operation, OperationHistory, OperationStatus};
pub use parts::{
    Content, ContentPart, ContentPartFactory, CreationContext, FactoryParams, LeafPartFactory,
    PartBlueprint, PartId, PartKind,
};
pub use sync::{SyncReport, SyncRole};
pub use toolkit::Toolkit;
pub use viewer::{
    NullViewerAudit, RecordingAudit, Viewer, ViewerAudit, ViewerAuditEvent, ViewerAuditStage,
    ViewerConfig,
};
