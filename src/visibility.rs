//! Culling results as seen by the pipeline.
//!
//! The host owns culling. It hands the pipeline a [`VisibleSet`] each frame,
//! and passes describe what they want drawn from it with
//! [`DrawRenderers`](crate::DrawRenderers).

use std::borrow::Cow;

/// Bitmask over the 32 scene layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Builds a mask from layer indices. Indices above 31 are ignored.
    pub fn from_layers(layers: &[u8]) -> Self {
        LayerMask(
            layers
                .iter()
                .filter(|layer| **layer < 32)
                .fold(0u32, |mask, layer| mask | (1u32 << *layer)),
        )
    }

    pub fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1u32 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Name of a shader pass an object can be drawn with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderTag(pub Cow<'static, str>);

impl ShaderTag {
    pub const DEFAULT_UNLIT: ShaderTag = ShaderTag(Cow::Borrowed("SRPDefaultUnlit"));
    pub const FORWARD: ShaderTag = ShaderTag(Cow::Borrowed("UniversalForward"));
    pub const FORWARD_ONLY: ShaderTag = ShaderTag(Cow::Borrowed("UniversalForwardOnly"));
    pub const LIGHTWEIGHT_FORWARD: ShaderTag = ShaderTag(Cow::Borrowed("LightweightForward"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        ShaderTag(name.into())
    }

    /// The forward-shading tags render-objects passes draw.
    pub fn forward_set() -> Vec<ShaderTag> {
        vec![
            Self::DEFAULT_UNLIT,
            Self::FORWARD,
            Self::FORWARD_ONLY,
            Self::LIGHTWEIGHT_FORWARD,
        ]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which render queue an object belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderQueue {
    #[default]
    Opaque,
    Transparent,
}

/// One object that survived culling.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibleObject {
    /// Host-side renderer id.
    pub renderer: u32,
    pub layer: u8,
    pub shader_tag: ShaderTag,
    pub queue: RenderQueue,
    /// Distance from the camera, used for front-to-back sorting.
    pub distance: f32,
}

impl VisibleObject {
    /// An opaque object drawn with the default forward tag.
    pub fn opaque(renderer: u32, layer: u8, distance: f32) -> Self {
        Self {
            renderer,
            layer,
            shader_tag: ShaderTag::FORWARD,
            queue: RenderQueue::Opaque,
            distance,
        }
    }

    pub fn with_tag(mut self, tag: ShaderTag) -> Self {
        self.shader_tag = tag;
        self
    }

    pub fn with_queue(mut self, queue: RenderQueue) -> Self {
        self.queue = queue;
        self
    }
}

/// The visible geometry of one camera for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleSet {
    pub objects: Vec<VisibleObject>,
}

impl VisibleSet {
    pub fn new(objects: Vec<VisibleObject>) -> Self {
        Self { objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_mask_membership() {
        let mask = LayerMask::from_layers(&[0, 3, 31, 40]);
        assert!(mask.contains(0));
        assert!(mask.contains(3));
        assert!(mask.contains(31));
        assert!(!mask.contains(1));
        assert!(!mask.contains(40));
        assert!(!LayerMask::NONE.contains(0));
        assert!(LayerMask::ALL.contains(17));
    }
}
