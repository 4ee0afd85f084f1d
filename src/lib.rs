//! # Pixelation
//!
//! **A low-resolution, multi-pass screen-space render pipeline.**
//!
//! Renders selected scene layers at a reduced resolution, extracts depth and
//! normals at native resolution, blends them through a material and blits the
//! result to the display. The pipeline is a fixed sequence of passes on a
//! tiny render graph; the host renderer drives it once per camera per frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pixelation::*;
//!
//! struct Host;
//!
//! impl RenderContext for Host {
//!     fn execute_commands(&mut self, commands: &mut CommandBuffer) {
//!         for command in commands.take() {
//!             // Translate to GPU work here.
//!             let _ = command;
//!         }
//!     }
//! }
//!
//! let gpu = HeadlessGpu::new().expect("no GPU");
//! let allocator = WgpuTargetAllocator::new(gpu.device.clone());
//! let config = PixelationConfig::new()
//!     .layers(LayerMask::from_layers(&[8]))
//!     .resolution(480, 270);
//! let mut pipeline = PixelationPipeline::build(config, Box::new(allocator)).unwrap();
//!
//! let camera = Camera::default();
//! let visible = VisibleSet::default();
//! let frame = FrameContext::new(
//!     &camera,
//!     TargetDescriptor::new(1920, 1080, wgpu::TextureFormat::Bgra8UnormSrgb),
//!     &visible,
//! );
//!
//! let mut scheduler = PassScheduler::new();
//! pipeline.register(&mut scheduler);
//! scheduler.run(&mut Host, &frame).unwrap();
//! ```
//!
//! ## Design
//!
//! - **Passes record, hosts execute**: passes emit [`Command`]s; the host
//!   turns them into GPU work.
//! - **Targets by name**: shared targets live in a [`TargetArena`] and are
//!   addressed by a name-derived [`TargetId`]; textures are reallocated only
//!   when their descriptor changes.
//! - **Binders, not callbacks on the GPU path**: per-frame shader parameters
//!   are pushed by [`ParameterBinder`]s right before each draw or blit.

mod camera;
mod config;
mod gpu;
mod material;
mod pixelation;
mod render_graph;
mod visibility;

pub use camera::Camera;
pub use config::{ConfigError, DEFAULT_RESOLUTION, PixelationConfig, PixelationSettings};
pub use gpu::{GpuInitError, HeadlessGpu, RenderTexture, WgpuTargetAllocator};
pub use material::{
    DEPTH_TEXTURE_PARAM, FAR_CLIP_PARAM, Material, NORMALS_TEXTURE_PARAM, ParamValue,
    RESOLUTION_PARAM,
};
pub use pixelation::{
    BLIT_PASS, COLOR_PASS, DEPTH_PASS, DEPTH_TARGET, FarClipBinder, NORMALS_PASS, NORMALS_TARGET,
    PixelationPipeline, SCENE_TARGET, SceneBlendBinder,
};
pub use render_graph::{
    BlitToScreenPass, Command, CommandBuffer, DepthBits, DrawRenderers, FrameContext,
    ParameterBinder, PassConfig, PassError, PassPriority, PassQueue, PassScheduler,
    RenderContext, RenderObjectsPass, RenderPass, ScreenTextures, SharedTarget, SharedTargets,
    SortingCriteria, TargetArena, TargetDescriptor, TargetError, TargetId, TargetRef,
    TextureAllocator, TextureHandle, bind_with,
};
pub use visibility::{LayerMask, RenderQueue, ShaderTag, VisibleObject, VisibleSet};

// Re-export the math and GPU crates used in the public API
pub use glam::{UVec2, Vec4};
pub use wgpu;
