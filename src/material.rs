//! Materials: pre-built shader programs plus their named parameters.
//!
//! The pipeline never compiles shaders. A [`Material`] names a program the
//! host already built and carries the parameter values passes push into it
//! right before a draw or blit.

use std::collections::BTreeMap;

use glam::Vec4;

use crate::render_graph::TargetId;

/// Camera far-clip distance, bound for depth linearisation.
pub const FAR_CLIP_PARAM: &str = "far_clip";
/// Depth target sampled by the scene blend.
pub const DEPTH_TEXTURE_PARAM: &str = "depth_tex";
/// Normals target sampled by the scene blend.
pub const NORMALS_TEXTURE_PARAM: &str = "normals_tex";
/// Pixelation resolution as `(width, height, 1/width, 1/height)`.
pub const RESOLUTION_PARAM: &str = "resolution";

/// A single shader parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vector(Vec4),
    /// A render target, referenced by its binding key.
    Texture(TargetId),
}

/// A shader program reference together with its parameter block.
///
/// Parameters are kept sorted by name, so two materials with the same values
/// compare equal and pack to the same uniform bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    name: String,
    params: BTreeMap<String, ParamValue>,
}

impl Material {
    /// References the host program called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.params.insert(name.to_owned(), ParamValue::Float(value));
    }

    pub fn set_vector(&mut self, name: &str, value: Vec4) {
        self.params.insert(name.to_owned(), ParamValue::Vector(value));
    }

    pub fn set_texture(&mut self, name: &str, target: TargetId) {
        self.params
            .insert(name.to_owned(), ParamValue::Texture(target));
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name).copied()
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.param(name)? {
            ParamValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn vector(&self, name: &str) -> Option<Vec4> {
        match self.param(name)? {
            ParamValue::Vector(value) => Some(value),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TargetId> {
        match self.param(name)? {
            ParamValue::Texture(value) => Some(value),
            _ => None,
        }
    }

    /// All parameters in name order.
    pub fn params(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.params.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Packs the scalar and vector parameters into a uniform buffer image.
    ///
    /// Values are laid out in name order; vectors are aligned to 16 bytes and
    /// the total is padded to a multiple of 16 bytes. Textures are skipped,
    /// they are bound separately by the host.
    pub fn uniform_bytes(&self) -> Vec<u8> {
        let mut words: Vec<f32> = Vec::new();
        for value in self.params.values() {
            match value {
                ParamValue::Float(value) => words.push(*value),
                ParamValue::Vector(value) => {
                    pad_to_vec4(&mut words);
                    words.extend_from_slice(&value.to_array());
                }
                ParamValue::Texture(_) => {}
            }
        }
        pad_to_vec4(&mut words);
        bytemuck::cast_slice(&words).to_vec()
    }
}

fn pad_to_vec4(words: &mut Vec<f32>) {
    while words.len() % 4 != 0 {
        words.push(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_overwrite_by_name() {
        let mut material = Material::new("blend");
        material.set_float(FAR_CLIP_PARAM, 100.0);
        material.set_float(FAR_CLIP_PARAM, 250.0);
        assert_eq!(material.float(FAR_CLIP_PARAM), Some(250.0));
        assert_eq!(material.vector(FAR_CLIP_PARAM), None);
        assert_eq!(material.params().count(), 1);
    }

    #[test]
    fn uniform_layout_aligns_vectors() {
        let mut material = Material::new("blend");
        material.set_vector(RESOLUTION_PARAM, Vec4::new(480.0, 270.0, 0.5, 0.25));
        material.set_float(FAR_CLIP_PARAM, 100.0);
        material.set_texture(DEPTH_TEXTURE_PARAM, TargetId::from_name("depth"));

        let bytes = material.uniform_bytes();
        let words: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(words, vec![100.0, 0.0, 0.0, 0.0, 480.0, 270.0, 0.5, 0.25]);
    }

    #[test]
    fn empty_material_packs_to_nothing() {
        assert!(Material::new("copy").uniform_bytes().is_empty());
    }
}
