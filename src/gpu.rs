//! wgpu-backed texture allocation.
//!
//! [`WgpuTargetAllocator`] gives the render-target arena real GPU textures.
//! Each allocation becomes a texture plus a default view that can be used as
//! a render attachment and sampled by later passes.
//!
//! # Example
//!
//! ```no_run
//! use pixelation::{HeadlessGpu, PixelationConfig, PixelationPipeline, WgpuTargetAllocator};
//!
//! let gpu = HeadlessGpu::new().expect("no GPU adapter");
//! let allocator = WgpuTargetAllocator::new(gpu.device.clone());
//! let pipeline = PixelationPipeline::build(PixelationConfig::default(), Box::new(allocator))
//!     .expect("pipeline");
//! ```

use std::fmt;

use fnv::FnvHashMap;

use crate::render_graph::{TargetDescriptor, TargetError, TextureAllocator, TextureHandle};

/// A device and queue without a window surface.
pub struct HeadlessGpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Why no GPU device could be created.
#[derive(Debug)]
pub enum GpuInitError {
    Adapter(wgpu::RequestAdapterError),
    Device(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuInitError::Adapter(e) => write!(f, "no suitable GPU adapter: {}", e),
            GpuInitError::Device(e) => write!(f, "failed to create device: {}", e),
        }
    }
}

impl std::error::Error for GpuInitError {}

impl HeadlessGpu {
    /// Requests a device from the primary backends (Vulkan, Metal, DX12).
    pub fn new() -> Result<Self, GpuInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(GpuInitError::Adapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Pixelation Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(GpuInitError::Device)?;

        Ok(Self { device, queue })
    }
}

/// A GPU texture together with its default view.
pub struct RenderTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// [`TextureAllocator`] that creates wgpu textures.
///
/// Textures are created with `RENDER_ATTACHMENT | TEXTURE_BINDING` so a pass
/// can write one and a later pass can sample it.
pub struct WgpuTargetAllocator {
    device: wgpu::Device,
    textures: FnvHashMap<TextureHandle, RenderTexture>,
    next: u64,
}

impl WgpuTargetAllocator {
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            textures: FnvHashMap::default(),
            next: 0,
        }
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&RenderTexture> {
        self.textures.get(&handle)
    }

    /// View for binding `handle` as an attachment or shader input.
    pub fn view(&self, handle: TextureHandle) -> Option<&wgpu::TextureView> {
        self.get(handle).map(|texture| &texture.view)
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureAllocator for WgpuTargetAllocator {
    fn allocate(
        &mut self,
        label: &str,
        descriptor: &TargetDescriptor,
    ) -> Result<TextureHandle, TargetError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if descriptor.width > max || descriptor.height > max {
            return Err(TargetError::Allocation {
                name: label.to_owned(),
                reason: format!(
                    "{}x{} exceeds the device limit of {}",
                    descriptor.width, descriptor.height, max
                ),
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.next += 1;
        let handle = TextureHandle(self.next);
        self.textures.insert(handle, RenderTexture { texture, view });
        Ok(handle)
    }

    fn release(&mut self, texture: TextureHandle) {
        if let Some(released) = self.textures.remove(&texture) {
            released.texture.destroy();
        }
    }
}
