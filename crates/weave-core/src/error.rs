//! Error types surfaced by the reconciler and host adapters.

use crate::host::NodeHandle;

/// Failures reported by a [`HostAdapter`](crate::HostAdapter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("node {0:?} missing")]
    MissingNode(NodeHandle),

    #[error("node {0:?} cannot hold children")]
    NotAParent(NodeHandle),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        parent: NodeHandle,
        child: NodeHandle,
    },
}

/// Reasons a render pass was abandoned.
///
/// These never escape the work loop; they are logged and the pass is dropped.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("component `{name}` failed: {source}")]
    Component {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("component `{name}` panicked: {message}")]
    ComponentPanicked { name: &'static str, message: String },

    #[error(
        "component `{name}` called hooks in a different order ({previous} hooks before, {current} now)"
    )]
    HookOrderChanged {
        name: &'static str,
        previous: usize,
        current: usize,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
