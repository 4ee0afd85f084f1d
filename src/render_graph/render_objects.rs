//! The render-objects pass: draw filtered scene geometry into a temporary
//! buffer, then composite it into a shared output target.

use glam::UVec2;
use log::warn;

use crate::material::{Material, ParamValue};
use crate::render_graph::{
    CommandBuffer, DepthBits, DrawRenderers, FrameContext, PassError, PassPriority,
    RenderContext, RenderPass, SharedTargets, TargetArena, TargetDescriptor, TargetError, TargetId,
    TargetRef,
};
use crate::visibility::LayerMask;

/// Pushes per-frame values into a material right before the GPU uses it.
///
/// A pass invokes its binders at two fixed points: before the draw (on the
/// override material) and before the composite (on the composite material).
/// Closures taking `(&mut Material, &FrameContext)` are binders too.
pub trait ParameterBinder {
    fn bind(&self, material: &mut Material, frame: &FrameContext<'_>);
}

impl<F> ParameterBinder for F
where
    F: Fn(&mut Material, &FrameContext<'_>),
{
    fn bind(&self, material: &mut Material, frame: &FrameContext<'_>) {
        self(material, frame)
    }
}

/// Pins a closure to the binder signature so its argument types are inferred.
pub fn bind_with<F>(binder: F) -> F
where
    F: Fn(&mut Material, &FrameContext<'_>),
{
    binder
}

/// How a [`RenderObjectsPass`] draws and composites.
///
/// Built once with the `with_*` methods and not changed afterwards; only the
/// parameter values the binders write into the materials vary per frame.
pub struct PassConfig {
    pub priority: PassPriority,
    /// Layers whose objects are drawn.
    pub layers: LayerMask,
    /// Depth precision of the temporary buffer. Anything but `None` turns the
    /// temporary into a depth texture used as both colour and depth sink.
    pub depth_bits: DepthBits,
    /// Replaces every drawn object's own material during the draw.
    pub override_material: Option<Material>,
    /// The draw is meaningless without the override; a missing one is
    /// reported.
    pub override_required: bool,
    /// Program for the temporary → output composite. Without it the output
    /// target is never written.
    pub composite_material: Option<Material>,
    /// Working resolution; the camera's native size when `None`.
    pub fixed_resolution: Option<UVec2>,
    pub pre_draw: Option<Box<dyn ParameterBinder>>,
    pub pre_composite: Option<Box<dyn ParameterBinder>>,
}

impl PassConfig {
    pub fn new(layers: LayerMask) -> Self {
        Self {
            priority: PassPriority::default(),
            layers,
            depth_bits: DepthBits::None,
            override_material: None,
            override_required: false,
            composite_material: None,
            fixed_resolution: None,
            pre_draw: None,
            pre_composite: None,
        }
    }

    pub fn with_priority(mut self, priority: PassPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_depth_bits(mut self, depth_bits: DepthBits) -> Self {
        self.depth_bits = depth_bits;
        self
    }

    pub fn with_override(mut self, material: Option<Material>) -> Self {
        self.override_material = material;
        self
    }

    /// Marks the override material as required. Without one the pass still
    /// draws, with each object's own material, and logs a warning once.
    pub fn with_override_required(mut self) -> Self {
        self.override_required = true;
        self
    }

    pub fn with_composite(mut self, material: Option<Material>) -> Self {
        self.composite_material = material;
        self
    }

    pub fn with_fixed_resolution(mut self, resolution: UVec2) -> Self {
        self.fixed_resolution = Some(resolution);
        self
    }

    pub fn with_pre_draw(mut self, binder: impl ParameterBinder + 'static) -> Self {
        self.pre_draw = Some(Box::new(binder));
        self
    }

    pub fn with_pre_composite(mut self, binder: impl ParameterBinder + 'static) -> Self {
        self.pre_composite = Some(Box::new(binder));
        self
    }
}

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
const CLEAR_DEPTH: f32 = 1.0;

/// Draws the objects matching its [`PassConfig`] into a temporary buffer and
/// composites that buffer into a shared output target.
///
/// The output target belongs to the pipeline's arena; the temporary is a
/// host-managed per-frame target acquired in `setup` and released in
/// `cleanup`.
pub struct RenderObjectsPass {
    name: String,
    config: PassConfig,
    targets: SharedTargets,
    output: TargetId,
    temporary: TargetId,
    warned_no_override: bool,
    warned_no_composite: bool,
    warned_unbound_texture: bool,
}

impl RenderObjectsPass {
    /// Creates the pass, writing into the already registered `output` target.
    ///
    /// Reserves `"{name}_temporary"` in the arena for the temporary buffer.
    pub fn new(
        name: impl Into<String>,
        config: PassConfig,
        targets: SharedTargets,
        output: TargetId,
    ) -> Result<Self, TargetError> {
        let name = name.into();
        let temporary = {
            let mut arena = targets.borrow_mut();
            if arena.get(output).is_none() {
                return Err(TargetError::UnknownTarget(output));
            }
            arena.reserve(&format!("{}_temporary", name))?
        };
        Ok(Self {
            name,
            config,
            targets,
            output,
            temporary,
            warned_no_override: false,
            warned_no_composite: false,
            warned_unbound_texture: false,
        })
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// The shared target this pass composites into.
    pub fn output(&self) -> TargetId {
        self.output
    }

    /// Binding key of the per-frame temporary buffer.
    pub fn temporary(&self) -> TargetId {
        self.temporary
    }

    fn resolution(&self, frame: &FrameContext<'_>) -> UVec2 {
        self.config
            .fixed_resolution
            .unwrap_or_else(|| frame.native_size())
    }
}

impl RenderPass for RenderObjectsPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> PassPriority {
        self.config.priority
    }

    fn setup(
        &mut self,
        cmd: &mut CommandBuffer,
        frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        let size = self.resolution(frame);
        let output = TargetDescriptor::new(size.x, size.y, frame.target.format);

        self.targets
            .borrow_mut()
            .configure(self.output, output)
            .map_err(|source| PassError::Target {
                pass: self.name.clone(),
                source,
            })?;

        let temporary = output.with_depth(self.config.depth_bits);
        cmd.get_temporary(self.temporary, temporary);

        let color = TargetRef::Target(self.temporary);
        let depth = if temporary.has_depth() {
            color
        } else {
            TargetRef::CameraDepth
        };
        cmd.set_render_target(color, depth);
        cmd.clear_render_target(CLEAR_COLOR, CLEAR_DEPTH);
        Ok(())
    }

    fn execute(
        &mut self,
        ctx: &mut dyn RenderContext,
        frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        let mut cmd = CommandBuffer::new(self.name.as_str());
        let config = &mut self.config;

        let mut draw = DrawRenderers::new(config.layers);
        match config.override_material.as_mut() {
            Some(material) => {
                if let Some(binder) = &config.pre_draw {
                    binder.bind(material, frame);
                }
                draw = draw.with_override(material.clone());
            }
            None if config.override_required && !self.warned_no_override => {
                warn!(
                    "pass '{}' has no override material; objects draw with their own",
                    self.name
                );
                self.warned_no_override = true;
            }
            None => {}
        }
        cmd.draw_renderers(draw);

        match config.composite_material.as_mut() {
            Some(material) => {
                if let Some(binder) = &config.pre_composite {
                    binder.bind(material, frame);
                }
                match unbound_texture(&self.targets.borrow(), material) {
                    None => cmd.blit(
                        TargetRef::Target(self.temporary),
                        TargetRef::Target(self.output),
                        Some(material.clone()),
                    ),
                    Some(err) => {
                        if !self.warned_unbound_texture {
                            warn!("pass '{}' skips its composite: {}", self.name, err);
                            self.warned_unbound_texture = true;
                        }
                    }
                }
            }
            None if !self.warned_no_composite => {
                warn!(
                    "pass '{}' has no composite material; its output target is never written",
                    self.name
                );
                self.warned_no_composite = true;
            }
            None => {}
        }

        ctx.execute_commands(&mut cmd);
        Ok(())
    }

    fn cleanup(&mut self, cmd: &mut CommandBuffer) {
        cmd.release_temporary(self.output);
        cmd.release_temporary(self.temporary);
    }
}

/// First texture parameter of `material` without a backing texture.
///
/// Temporaries are host-managed and never bound as material inputs, so only
/// shared targets are checked.
fn unbound_texture(arena: &TargetArena, material: &Material) -> Option<TargetError> {
    material.params().find_map(|(_, value)| match value {
        ParamValue::Texture(id) => arena.texture(id).err(),
        _ => None,
    })
}
