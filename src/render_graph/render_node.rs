//! The pass lifecycle trait and what the host hands each pass per call.

use std::fmt;

use glam::UVec2;

use crate::camera::Camera;
use crate::render_graph::{CommandBuffer, TargetDescriptor, TargetError, TargetRef};
use crate::visibility::VisibleSet;

/// Read-only per-frame state owned by the host.
///
/// Passes borrow it for a single `setup` or `execute` call; the lifetime keeps
/// them from holding on to it.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    /// Current camera clip planes.
    pub camera: &'a Camera,
    /// Descriptor of the camera's output, i.e. the native resolution and
    /// colour format.
    pub target: TargetDescriptor,
    /// Culling results for this camera.
    pub visible: &'a VisibleSet,
    /// Where the last pass presents to.
    pub display: TargetRef,
}

impl<'a> FrameContext<'a> {
    pub fn new(camera: &'a Camera, target: TargetDescriptor, visible: &'a VisibleSet) -> Self {
        Self {
            camera,
            target,
            visible,
            display: TargetRef::Display,
        }
    }

    /// Native output size in pixels.
    pub fn native_size(&self) -> UVec2 {
        self.target.size()
    }
}

/// Host side of command submission.
///
/// The host executes recorded commands against the GPU, resolving
/// [`TargetRef::Target`] ids first against its temporaries and then against
/// the pipeline's shared targets, and resolving
/// [`Command::DrawRenderers`](crate::Command::DrawRenderers) against its
/// culling results.
pub trait RenderContext {
    /// Executes and drains `commands`.
    fn execute_commands(&mut self, commands: &mut CommandBuffer);
}

/// Opaque ordering token the host uses to place a pass in its frame.
///
/// The pipeline forwards it untouched; ordering between the pipeline's own
/// passes comes from registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassPriority(pub u32);

impl PassPriority {
    pub const BEFORE_OPAQUES: PassPriority = PassPriority(250);
    pub const AFTER_OPAQUES: PassPriority = PassPriority(300);
    pub const BEFORE_POST_PROCESSING: PassPriority = PassPriority(550);
    pub const AFTER_RENDERING: PassPriority = PassPriority(1000);
}

impl Default for PassPriority {
    fn default() -> Self {
        PassPriority::AFTER_OPAQUES
    }
}

/// Errors a pass can report to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum PassError {
    /// A render target could not be prepared.
    Target { pass: String, source: TargetError },
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassError::Target { pass, source } => write!(f, "pass '{}': {}", pass, source),
        }
    }
}

impl std::error::Error for PassError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PassError::Target { source, .. } => Some(source),
        }
    }
}

/// A stage of the pipeline driven by the host.
///
/// # Caller obligations
///
/// Every frame the host calls, for each enqueued pass and in enqueue order,
/// `setup` once, then `execute` once, then `cleanup` once, and finishes the
/// whole triple before the next pass's `setup`. `cleanup` runs even when
/// `setup` or `execute` failed. Later passes rely on this to read what
/// earlier passes wrote. Passes never call these methods themselves.
///
/// Commands recorded into the buffers given to `setup` and `cleanup` are
/// submitted by the host; `execute` submits its own through the
/// [`RenderContext`].
pub trait RenderPass {
    /// Debug name, also used to label command buffers.
    fn name(&self) -> &str;

    /// Host ordering token.
    fn priority(&self) -> PassPriority {
        PassPriority::default()
    }

    /// Prepares targets for this frame.
    fn setup(
        &mut self,
        _cmd: &mut CommandBuffer,
        _frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        Ok(())
    }

    /// Records and submits this frame's work.
    fn execute(
        &mut self,
        ctx: &mut dyn RenderContext,
        frame: &FrameContext<'_>,
    ) -> Result<(), PassError>;

    /// Releases per-frame resources acquired in `setup`.
    fn cleanup(&mut self, _cmd: &mut CommandBuffer) {}
}
