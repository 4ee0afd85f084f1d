//! The four-pass pixelation pipeline.
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │    Depth    │──▶│   Normals   │──▶│    Color    │──▶│    Blit     │
//! │  (native)   │   │  (native)   │   │  (low-res)  │   │ (to screen) │
//! └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘
//!       │                 │              ▲  ▲   │
//!       ▼                 ▼              │  │   ▼
//!  depth target ──────────┼──────────────┘  │  scene target ──▶ display
//!                   normals target ─────────┘
//! ```
//!
//! The colour pass samples the depth and normals targets written earlier in
//! the same frame. That only holds because the host runs each pass's
//! setup/execute/cleanup to completion in registration order.

use glam::{UVec2, Vec4};
use log::debug;

use crate::config::PixelationConfig;
use crate::material::{
    DEPTH_TEXTURE_PARAM, FAR_CLIP_PARAM, Material, NORMALS_TEXTURE_PARAM, RESOLUTION_PARAM,
};
use crate::render_graph::{
    BlitToScreenPass, DepthBits, FrameContext, ParameterBinder, PassConfig, PassPriority,
    PassQueue, RenderObjectsPass, RenderPass, SharedTargets, TargetArena, TargetError, TargetId,
    TextureAllocator,
};

pub const DEPTH_TARGET: &str = "pixelation_depth";
pub const NORMALS_TARGET: &str = "pixelation_normals";
pub const SCENE_TARGET: &str = "pixelation_scene";

pub const DEPTH_PASS: &str = "pixelation_depth_pass";
pub const NORMALS_PASS: &str = "pixelation_normals_pass";
pub const COLOR_PASS: &str = "pixelation_color_pass";
pub const BLIT_PASS: &str = "pixelation_blit_pass";

/// Binds the camera's far-clip distance.
#[derive(Clone, Copy, Debug, Default)]
pub struct FarClipBinder;

impl ParameterBinder for FarClipBinder {
    fn bind(&self, material: &mut Material, frame: &FrameContext<'_>) {
        material.set_float(FAR_CLIP_PARAM, frame.camera.far_clip);
    }
}

/// Binds the auxiliary targets and the pixelation resolution for the scene
/// blend.
#[derive(Clone, Copy, Debug)]
pub struct SceneBlendBinder {
    pub depth: TargetId,
    pub normals: TargetId,
    pub resolution: UVec2,
}

impl SceneBlendBinder {
    /// `(width, height, 1/width, 1/height)`.
    pub fn resolution_vector(&self) -> Vec4 {
        let size = self.resolution.as_vec2();
        Vec4::new(size.x, size.y, size.x.recip(), size.y.recip())
    }
}

impl ParameterBinder for SceneBlendBinder {
    fn bind(&self, material: &mut Material, _frame: &FrameContext<'_>) {
        material.set_texture(DEPTH_TEXTURE_PARAM, self.depth);
        material.set_texture(NORMALS_TEXTURE_PARAM, self.normals);
        material.set_vector(RESOLUTION_PARAM, self.resolution_vector());
    }
}

/// Depth, normals, low-res colour and final blit, wired together.
///
/// Owns every shared target. Passes only hold target ids, so the targets
/// live exactly as long as the pipeline; [`teardown`](Self::teardown) (also
/// run on drop) releases their textures.
///
/// # Example
///
/// ```ignore
/// let mut pipeline = PixelationPipeline::build(PixelationConfig::default(), allocator)?;
///
/// // Every frame, for every camera:
/// let mut scheduler = PassScheduler::new();
/// pipeline.register(&mut scheduler);
/// scheduler.run(&mut host, &frame)?;
/// ```
pub struct PixelationPipeline {
    targets: SharedTargets,
    depth_target: TargetId,
    normals_target: TargetId,
    scene_target: TargetId,
    resolution: UVec2,
    passes: Vec<Box<dyn RenderPass>>,
}

impl PixelationPipeline {
    /// Registers the shared targets and constructs the passes in run order.
    ///
    /// A zero width or height in the configured resolution is rejected here,
    /// since the scene target could never be allocated.
    pub fn build(
        config: PixelationConfig,
        allocator: Box<dyn TextureAllocator>,
    ) -> Result<Self, TargetError> {
        if config.resolution.x == 0 || config.resolution.y == 0 {
            return Err(TargetError::ZeroSized {
                name: SCENE_TARGET.to_owned(),
            });
        }
        let targets = TargetArena::new(allocator).shared();
        let (depth_target, normals_target, scene_target) = {
            let mut arena = targets.borrow_mut();
            (
                arena.register(DEPTH_TARGET)?,
                arena.register(NORMALS_TARGET)?,
                arena.register(SCENE_TARGET)?,
            )
        };

        let depth = RenderObjectsPass::new(
            DEPTH_PASS,
            PassConfig::new(config.layers)
                .with_priority(PassPriority::AFTER_OPAQUES)
                .with_depth_bits(DepthBits::D32)
                .with_composite(config.depth_material)
                .with_pre_composite(FarClipBinder),
            targets.clone(),
            depth_target,
        )?;

        let normals = RenderObjectsPass::new(
            NORMALS_PASS,
            PassConfig::new(config.layers)
                .with_priority(PassPriority::AFTER_OPAQUES)
                .with_override(config.normals_material)
                .with_override_required(),
            targets.clone(),
            normals_target,
        )?;

        let color = RenderObjectsPass::new(
            COLOR_PASS,
            PassConfig::new(config.layers)
                .with_priority(PassPriority::AFTER_OPAQUES)
                .with_fixed_resolution(config.resolution)
                .with_composite(config.blend_material)
                .with_pre_composite(SceneBlendBinder {
                    depth: depth_target,
                    normals: normals_target,
                    resolution: config.resolution,
                }),
            targets.clone(),
            scene_target,
        )?;

        let mut blit = BlitToScreenPass::new(BLIT_PASS, color.output());
        if let Some(material) = config.blit_material {
            blit = blit.with_material(material);
        }

        debug!(
            "built pixelation pipeline at {}x{}",
            config.resolution.x, config.resolution.y
        );

        Ok(Self {
            targets,
            depth_target,
            normals_target,
            scene_target,
            resolution: config.resolution,
            passes: vec![
                Box::new(depth),
                Box::new(normals),
                Box::new(color),
                Box::new(blit),
            ],
        })
    }

    /// Enqueues the passes with the host: depth, normals, colour, blit.
    ///
    /// Call once per camera per frame.
    pub fn register<'p>(&'p mut self, queue: &mut dyn PassQueue<'p>) {
        for pass in self.passes.iter_mut() {
            queue.enqueue_pass(pass.as_mut());
        }
    }

    /// The shared target arena, for hosts resolving target ids.
    pub fn targets(&self) -> SharedTargets {
        self.targets.clone()
    }

    pub fn depth_target(&self) -> TargetId {
        self.depth_target
    }

    pub fn normals_target(&self) -> TargetId {
        self.normals_target
    }

    /// The low-res colour target the blit pass presents.
    pub fn scene_target(&self) -> TargetId {
        self.scene_target
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// Pass names in registration order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Releases every shared target's texture. The pipeline stays usable; the
    /// next frame reallocates what it needs.
    pub fn teardown(&mut self) {
        self.targets.borrow_mut().teardown();
    }
}

impl Drop for PixelationPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::render_graph::TargetDescriptor;
    use crate::visibility::VisibleSet;

    #[test]
    fn resolution_vector_carries_reciprocals() {
        let binder = SceneBlendBinder {
            depth: TargetId::from_name(DEPTH_TARGET),
            normals: TargetId::from_name(NORMALS_TARGET),
            resolution: UVec2::new(480, 270),
        };
        let v = binder.resolution_vector();
        assert_eq!(v.x, 480.0);
        assert_eq!(v.y, 270.0);
        assert!((v.z - 1.0 / 480.0).abs() < f32::EPSILON);
        assert!((v.w - 1.0 / 270.0).abs() < f32::EPSILON);
    }

    #[test]
    fn far_clip_binder_reads_the_current_camera() {
        let visible = VisibleSet::default();
        let target = TargetDescriptor::new(16, 16, wgpu::TextureFormat::Rgba8Unorm);
        let mut material = Material::new("depth");

        for far in [100.0, 250.0] {
            let camera = Camera::default().with_clip_planes(0.1, far);
            FarClipBinder.bind(&mut material, &FrameContext::new(&camera, target, &visible));
            assert_eq!(material.float(FAR_CLIP_PARAM), Some(far));
        }
    }
}
