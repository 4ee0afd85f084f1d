//! Full-resolution targets published to every material under global names.

use crate::render_graph::{
    CommandBuffer, FrameContext, PassError, PassPriority, RenderContext, RenderPass,
    SharedTargets, TargetDescriptor, TargetError, TargetId,
};

/// Keeps a set of named targets at the camera's native resolution and exposes
/// them as global shader inputs.
///
/// Enqueue it before any pass whose materials sample the globals.
pub struct ScreenTextures {
    targets: SharedTargets,
    textures: Vec<(String, TargetId)>,
}

impl ScreenTextures {
    /// Registers one shared target per name. If any name is taken, nothing
    /// is registered.
    pub fn new<I, S>(targets: SharedTargets, names: I) -> Result<Self, TargetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let ids = targets.borrow_mut().register_all(&names)?;
        let textures = names.into_iter().zip(ids).collect();
        Ok(Self { targets, textures })
    }

    /// Id of the target published as `name`.
    pub fn id(&self, name: &str) -> Option<TargetId> {
        self.textures
            .iter()
            .find(|(texture, _)| texture == name)
            .map(|(_, id)| *id)
    }
}

impl RenderPass for ScreenTextures {
    fn name(&self) -> &str {
        "screen_textures"
    }

    fn priority(&self) -> PassPriority {
        PassPriority::BEFORE_OPAQUES
    }

    fn setup(
        &mut self,
        cmd: &mut CommandBuffer,
        frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        let size = frame.native_size();
        let descriptor = TargetDescriptor::new(size.x, size.y, frame.target.format);
        let mut arena = self.targets.borrow_mut();
        for (name, id) in &self.textures {
            arena
                .configure(*id, descriptor)
                .map_err(|source| PassError::Target {
                    pass: "screen_textures".to_owned(),
                    source,
                })?;
            cmd.set_global_texture(name, *id);
        }
        Ok(())
    }

    fn execute(
        &mut self,
        _ctx: &mut dyn RenderContext,
        _frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::render_graph::render_target::tests::CountingAllocator;
    use crate::render_graph::{Command, TargetArena};
    use crate::visibility::VisibleSet;

    #[test]
    fn tracks_native_size_and_publishes_globals() {
        let targets = TargetArena::new(Box::new(CountingAllocator::default())).shared();
        let mut screen =
            ScreenTextures::new(targets.clone(), ["screen_color", "screen_normals"]).unwrap();
        let camera = Camera::default();
        let visible = VisibleSet::default();

        for (width, height) in [(1280, 720), (1280, 720), (1920, 1080)] {
            let frame = FrameContext::new(
                &camera,
                TargetDescriptor::new(width, height, wgpu::TextureFormat::Rgba16Float),
                &visible,
            );
            let mut cmd = CommandBuffer::new("setup");
            screen.setup(&mut cmd, &frame).unwrap();
            assert_eq!(
                cmd.commands()[0],
                Command::SetGlobalTexture {
                    name: "screen_color".into(),
                    id: screen.id("screen_color").unwrap(),
                }
            );
        }

        let arena = targets.borrow();
        let color = arena.get(screen.id("screen_color").unwrap()).unwrap();
        assert_eq!(color.allocation_count(), 2);
        assert_eq!(color.descriptor().unwrap().width, 1920);
    }

    #[test]
    fn names_must_be_unique() {
        let targets = TargetArena::new(Box::new(CountingAllocator::default())).shared();
        let result = ScreenTextures::new(targets.clone(), ["same", "same"]);
        assert!(matches!(result, Err(TargetError::DuplicateName(_))));
        assert!(targets.borrow().is_empty());
    }

    #[test]
    fn failed_construction_leaves_the_arena_untouched() {
        let targets = TargetArena::new(Box::new(CountingAllocator::default())).shared();
        targets.borrow_mut().register("depth").unwrap();

        let result = ScreenTextures::new(targets.clone(), ["extra", "depth"]);
        assert_eq!(
            result.err(),
            Some(TargetError::DuplicateName("depth".into()))
        );
        assert_eq!(targets.borrow().len(), 1);

        let screen = ScreenTextures::new(targets.clone(), ["extra"]).unwrap();
        assert_eq!(screen.id("extra"), Some(TargetId::from_name("extra")));
        assert_eq!(targets.borrow().len(), 2);
    }
}
