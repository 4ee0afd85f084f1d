//! Recorded GPU commands.
//!
//! Passes never talk to the GPU directly. They record [`Command`]s into a
//! [`CommandBuffer`] and hand it to the host through
//! [`RenderContext::execute_commands`](crate::RenderContext::execute_commands).
//! Recording keeps every frame inspectable and makes two frames with the same
//! inputs comparable command for command.

use std::cmp::Ordering;

use crate::material::Material;
use crate::render_graph::{TargetDescriptor, TargetId};
use crate::visibility::{LayerMask, RenderQueue, ShaderTag, VisibleSet};

/// Where a command reads from or writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetRef {
    /// A shared target or a host temporary, by binding key.
    Target(TargetId),
    /// The camera's own colour buffer.
    CameraColor,
    /// The camera's own depth buffer.
    CameraDepth,
    /// The final display target.
    Display,
}

/// Draw order for the objects a [`DrawRenderers`] selects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortingCriteria {
    /// Front to back by camera distance, for early depth rejection.
    #[default]
    CommonOpaque,
    /// Culling order.
    Unsorted,
}

/// Filter, tag set, sort order and optional shading override for one draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRenderers {
    pub layers: LayerMask,
    pub queue: RenderQueue,
    pub tags: Vec<ShaderTag>,
    pub sorting: SortingCriteria,
    /// When set, every selected object is drawn with this material instead of
    /// its own.
    pub override_material: Option<Material>,
}

impl DrawRenderers {
    /// Opaque objects on `layers` with the forward tag set, front to back.
    pub fn new(layers: LayerMask) -> Self {
        Self {
            layers,
            queue: RenderQueue::Opaque,
            tags: ShaderTag::forward_set(),
            sorting: SortingCriteria::CommonOpaque,
            override_material: None,
        }
    }

    pub fn with_sorting(mut self, sorting: SortingCriteria) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn with_override(mut self, material: Material) -> Self {
        self.override_material = Some(material);
        self
    }

    /// Resolves the draw against culling results, returning renderer ids in
    /// draw order. An empty result is still a valid draw.
    pub fn select(&self, visible: &VisibleSet) -> Vec<u32> {
        let mut selected: Vec<_> = visible
            .objects
            .iter()
            .filter(|object| {
                self.layers.contains(object.layer)
                    && object.queue == self.queue
                    && self.tags.contains(&object.shader_tag)
            })
            .collect();

        if self.sorting == SortingCriteria::CommonOpaque {
            selected.sort_by(|a, b| match a.distance.total_cmp(&b.distance) {
                Ordering::Equal => a.renderer.cmp(&b.renderer),
                order => order,
            });
        }

        selected.into_iter().map(|object| object.renderer).collect()
    }
}

/// A single recorded operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Acquire a per-frame temporary target under `id`.
    GetTemporary {
        id: TargetId,
        descriptor: TargetDescriptor,
    },
    /// Drop whatever temporary binding `id` holds. Releasing an id with no
    /// temporary is a no-op.
    ReleaseTemporary { id: TargetId },
    SetRenderTarget { color: TargetRef, depth: TargetRef },
    ClearRenderTarget { color: [f32; 4], depth: f32 },
    DrawRenderers(DrawRenderers),
    /// Full-screen copy from `source` to `destination`, through `material`
    /// when present.
    Blit {
        source: TargetRef,
        destination: TargetRef,
        material: Option<Material>,
    },
    /// Expose a target to every material under a global name.
    SetGlobalTexture { name: String, id: TargetId },
}

/// An ordered list of commands, named after the pass that recorded it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Removes and returns every recorded command.
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn get_temporary(&mut self, id: TargetId, descriptor: TargetDescriptor) {
        self.push(Command::GetTemporary { id, descriptor });
    }

    pub fn release_temporary(&mut self, id: TargetId) {
        self.push(Command::ReleaseTemporary { id });
    }

    pub fn set_render_target(&mut self, color: TargetRef, depth: TargetRef) {
        self.push(Command::SetRenderTarget { color, depth });
    }

    pub fn clear_render_target(&mut self, color: [f32; 4], depth: f32) {
        self.push(Command::ClearRenderTarget { color, depth });
    }

    pub fn draw_renderers(&mut self, draw: DrawRenderers) {
        self.push(Command::DrawRenderers(draw));
    }

    pub fn blit(&mut self, source: TargetRef, destination: TargetRef, material: Option<Material>) {
        self.push(Command::Blit {
            source,
            destination,
            material,
        });
    }

    pub fn set_global_texture(&mut self, name: &str, id: TargetId) {
        self.push(Command::SetGlobalTexture {
            name: name.to_owned(),
            id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::VisibleObject;

    fn scene() -> VisibleSet {
        VisibleSet::new(vec![
            VisibleObject::opaque(1, 0, 30.0),
            VisibleObject::opaque(2, 5, 10.0),
            VisibleObject::opaque(3, 5, 20.0),
            VisibleObject::opaque(4, 5, 10.0),
            VisibleObject::opaque(5, 5, 1.0).with_queue(RenderQueue::Transparent),
            VisibleObject::opaque(6, 5, 2.0).with_tag(ShaderTag::new("ShadowCaster")),
        ])
    }

    #[test]
    fn selects_filtered_objects_front_to_back() {
        let draw = DrawRenderers::new(LayerMask::from_layers(&[5]));
        assert_eq!(draw.select(&scene()), vec![2, 4, 3]);
    }

    #[test]
    fn unsorted_keeps_culling_order() {
        let draw = DrawRenderers::new(LayerMask::from_layers(&[5]))
            .with_sorting(SortingCriteria::Unsorted);
        assert_eq!(draw.select(&scene()), vec![2, 3, 4]);
    }

    #[test]
    fn unmatched_filter_selects_nothing() {
        let draw = DrawRenderers::new(LayerMask::from_layers(&[9]));
        assert!(draw.select(&scene()).is_empty());
    }

    #[test]
    fn take_drains_the_buffer() {
        let mut cmd = CommandBuffer::new("test");
        cmd.release_temporary(TargetId::from_name("a"));
        cmd.clear_render_target([0.0; 4], 1.0);
        assert_eq!(cmd.take().len(), 2);
        assert!(cmd.is_empty());
        assert_eq!(cmd.name(), "test");
    }
}
