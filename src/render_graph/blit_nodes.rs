//! Terminal pass that copies a shared target to the display.

use crate::material::Material;
use crate::render_graph::{
    CommandBuffer, FrameContext, PassError, PassPriority, RenderContext, RenderPass, TargetId,
    TargetRef,
};

/// Copies a shared target into the frame's display target.
///
/// Stateless: it borrows the source target from the pipeline's arena by id
/// and owns nothing per frame, so `setup` and `cleanup` do nothing.
///
/// # Example
///
/// ```ignore
/// let present = BlitToScreenPass::new("present", scene_target)
///     .with_material(Material::new("pixelation/blit"));
/// ```
pub struct BlitToScreenPass {
    name: String,
    priority: PassPriority,
    source: TargetId,
    /// `None` means a straight copy.
    material: Option<Material>,
}

impl BlitToScreenPass {
    pub fn new(name: impl Into<String>, source: TargetId) -> Self {
        Self {
            name: name.into(),
            priority: PassPriority::BEFORE_POST_PROCESSING,
            source,
            material: None,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_priority(mut self, priority: PassPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn source(&self) -> TargetId {
        self.source
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }
}

impl RenderPass for BlitToScreenPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> PassPriority {
        self.priority
    }

    fn execute(
        &mut self,
        ctx: &mut dyn RenderContext,
        frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        let mut cmd = CommandBuffer::new(self.name.as_str());
        cmd.blit(
            TargetRef::Target(self.source),
            frame.display,
            self.material.clone(),
        );
        ctx.execute_commands(&mut cmd);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::render_graph::{Command, TargetDescriptor};
    use crate::visibility::VisibleSet;

    struct Recorder(Vec<Command>);

    impl RenderContext for Recorder {
        fn execute_commands(&mut self, commands: &mut CommandBuffer) {
            self.0.extend(commands.take());
        }
    }

    fn run(pass: &mut BlitToScreenPass) -> Vec<Command> {
        let camera = Camera::default();
        let visible = VisibleSet::default();
        let frame = FrameContext::new(
            &camera,
            TargetDescriptor::new(800, 600, wgpu::TextureFormat::Bgra8UnormSrgb),
            &visible,
        );

        let mut setup = CommandBuffer::new("setup");
        pass.setup(&mut setup, &frame).unwrap();
        let mut recorder = Recorder(Vec::new());
        pass.execute(&mut recorder, &frame).unwrap();
        let mut cleanup = CommandBuffer::new("cleanup");
        pass.cleanup(&mut cleanup);

        assert!(setup.is_empty());
        assert!(cleanup.is_empty());
        recorder.0
    }

    #[test]
    fn straight_copy_without_material() {
        let source = TargetId::from_name("scene");
        let commands = run(&mut BlitToScreenPass::new("present", source));
        assert_eq!(
            commands,
            vec![Command::Blit {
                source: TargetRef::Target(source),
                destination: TargetRef::Display,
                material: None,
            }]
        );
    }

    #[test]
    fn copies_through_the_configured_material() {
        let source = TargetId::from_name("scene");
        let mut pass = BlitToScreenPass::new("present", source).with_material(Material::new("crt"));
        let commands = run(&mut pass);
        match commands.as_slice() {
            [Command::Blit { material: Some(material), .. }] => assert_eq!(material.name(), "crt"),
            other => panic!("unexpected commands {:?}", other),
        }
    }
}
