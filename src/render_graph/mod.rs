//! A small render graph of host-driven passes.
//!
//! Passes implement [`RenderPass`] and are driven by the host: every frame it
//! calls `setup`, `execute` and `cleanup` on each enqueued pass, in order.
//! Passes record [`Command`]s instead of touching the GPU, and share render
//! targets through a [`TargetArena`] by [`TargetId`].
//!
//! # Pass Types
//!
//! - [`RenderObjectsPass`]: draws filtered scene geometry into a temporary
//!   buffer, then composites it into a shared target through a material
//! - [`BlitToScreenPass`]: copies a shared target to the display
//! - [`ScreenTextures`]: keeps full-resolution targets published as globals
//!
//! # Example
//!
//! ```ignore
//! let targets = TargetArena::new(allocator).shared();
//! let output = targets.borrow_mut().register("outline")?;
//! let mut outline = RenderObjectsPass::new(
//!     "outline",
//!     PassConfig::new(LayerMask::from_layers(&[8]))
//!         .with_composite(Some(Material::new("outline/composite"))),
//!     targets.clone(),
//!     output,
//! )?;
//! let mut present = BlitToScreenPass::new("present", output);
//!
//! let mut scheduler = PassScheduler::new();
//! scheduler.enqueue_pass(&mut outline);
//! scheduler.enqueue_pass(&mut present);
//! scheduler.run(&mut host, &frame)?;
//! ```

mod blit_nodes;
mod commands;
mod graph;
mod render_node;
mod render_objects;
mod render_target;
mod screen_textures;

pub use blit_nodes::BlitToScreenPass;
pub use commands::{Command, CommandBuffer, DrawRenderers, SortingCriteria, TargetRef};
pub use graph::{PassQueue, PassScheduler};
pub use render_node::{FrameContext, PassError, PassPriority, RenderContext, RenderPass};
pub use render_objects::{ParameterBinder, PassConfig, RenderObjectsPass, bind_with};
pub use render_target::{
    DepthBits, SharedTarget, SharedTargets, TargetArena, TargetDescriptor, TargetError, TargetId,
    TextureAllocator, TextureHandle,
};
pub use screen_textures::ScreenTextures;
