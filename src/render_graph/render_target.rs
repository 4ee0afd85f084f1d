//! Named render targets shared between passes.
//!
//! Targets live in a [`TargetArena`] owned by the pipeline. Passes never own a
//! target; they hold its [`TargetId`] and ask the arena to (re)configure it
//! during setup. Backing textures come from a [`TextureAllocator`], which is
//! the only place the arena touches the GPU.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hasher;
use std::rc::Rc;

use fnv::{FnvHashMap, FnvHasher};
use glam::UVec2;
use log::debug;

/// Stable identifier derived from a target's name.
///
/// The same name always hashes to the same id, so the id can be used as a
/// binding key on the GPU side (shader texture slots, temporary targets).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Derives the identifier for `name` (FNV-1a over the UTF-8 bytes).
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FnvHasher::default();
        hasher.write(name.as_bytes());
        Self(hasher.finish())
    }

    /// Raw identifier value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Depth buffer precision requested for a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthBits {
    /// Colour only.
    #[default]
    None,
    D16,
    D24,
    D32,
}

impl DepthBits {
    /// Number of depth bits.
    pub fn bits(self) -> u32 {
        match self {
            DepthBits::None => 0,
            DepthBits::D16 => 16,
            DepthBits::D24 => 24,
            DepthBits::D32 => 32,
        }
    }

    /// The depth-carrying texture format for this precision.
    pub fn depth_format(self) -> Option<wgpu::TextureFormat> {
        match self {
            DepthBits::None => None,
            DepthBits::D16 => Some(wgpu::TextureFormat::Depth16Unorm),
            DepthBits::D24 => Some(wgpu::TextureFormat::Depth24Plus),
            DepthBits::D32 => Some(wgpu::TextureFormat::Depth32Float),
        }
    }
}

/// Everything that decides whether a backing texture can be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub depth_bits: DepthBits,
}

impl TargetDescriptor {
    /// A colour-only descriptor.
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            depth_bits: DepthBits::None,
        }
    }

    /// Returns a copy with the given size.
    pub fn with_size(mut self, size: UVec2) -> Self {
        self.width = size.x;
        self.height = size.y;
        self
    }

    /// Requests depth bits. Any value other than [`DepthBits::None`] coerces
    /// the format to the matching depth format.
    pub fn with_depth(mut self, depth_bits: DepthBits) -> Self {
        self.depth_bits = depth_bits;
        if let Some(format) = depth_bits.depth_format() {
            self.format = format;
        }
        self
    }

    /// Size in pixels.
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Whether the target can act as a depth attachment.
    pub fn has_depth(&self) -> bool {
        self.depth_bits != DepthBits::None
    }
}

/// Opaque token for a GPU texture handed out by a [`TextureAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Source of backing textures for the arena.
///
/// Implemented on top of wgpu by [`WgpuTargetAllocator`](crate::WgpuTargetAllocator);
/// tests use an in-memory allocator.
pub trait TextureAllocator {
    /// Allocates a texture matching `descriptor`. `label` is the target name.
    fn allocate(
        &mut self,
        label: &str,
        descriptor: &TargetDescriptor,
    ) -> Result<TextureHandle, TargetError>;

    /// Releases a texture previously returned by [`allocate`](Self::allocate).
    fn release(&mut self, texture: TextureHandle);
}

/// Lets the host keep a handle on the allocator (e.g. to look up texture
/// views) while the arena owns a clone.
impl<A: TextureAllocator> TextureAllocator for Rc<RefCell<A>> {
    fn allocate(
        &mut self,
        label: &str,
        descriptor: &TargetDescriptor,
    ) -> Result<TextureHandle, TargetError> {
        self.borrow_mut().allocate(label, descriptor)
    }

    fn release(&mut self, texture: TextureHandle) {
        self.borrow_mut().release(texture);
    }
}

/// Errors raised while registering or configuring targets.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetError {
    /// A target (or reserved temporary) already uses this name.
    DuplicateName(String),
    /// Two different names hash to the same identifier.
    IdCollision { name: String, existing: String },
    /// No target with this identifier was registered.
    UnknownTarget(TargetId),
    /// The target has no backing texture yet.
    NotAllocated(String),
    /// A zero width or height was requested.
    ZeroSized { name: String },
    /// The allocator could not provide a texture.
    Allocation { name: String, reason: String },
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::DuplicateName(name) => {
                write!(f, "render target name '{}' is already registered", name)
            }
            TargetError::IdCollision { name, existing } => write!(
                f,
                "render target '{}' hashes to the same id as '{}'",
                name, existing
            ),
            TargetError::UnknownTarget(id) => write!(f, "unknown render target {:#x}", id.raw()),
            TargetError::NotAllocated(name) => {
                write!(f, "render target '{}' has no backing texture", name)
            }
            TargetError::ZeroSized { name } => {
                write!(f, "render target '{}' requested a zero-sized texture", name)
            }
            TargetError::Allocation { name, reason } => {
                write!(f, "failed to allocate render target '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for TargetError {}

/// A named render target whose texture is (re)allocated on demand.
#[derive(Debug)]
pub struct SharedTarget {
    name: String,
    id: TargetId,
    descriptor: Option<TargetDescriptor>,
    texture: Option<TextureHandle>,
    allocations: u32,
}

impl SharedTarget {
    fn new(name: &str, id: TargetId) -> Self {
        Self {
            name: name.to_owned(),
            id,
            descriptor: None,
            texture: None,
            allocations: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The binding key for this target.
    pub fn identifier(&self) -> TargetId {
        self.id
    }

    /// Descriptor of the current backing texture, if allocated.
    pub fn descriptor(&self) -> Option<&TargetDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }

    /// How many times a backing texture has been allocated for this target.
    pub fn allocation_count(&self) -> u32 {
        self.allocations
    }
}

struct NameEntry {
    name: String,
    slot: Option<usize>,
}

/// Owner of every shared render target in a pipeline.
pub struct TargetArena {
    targets: Vec<SharedTarget>,
    names: FnvHashMap<TargetId, NameEntry>,
    allocator: Box<dyn TextureAllocator>,
}

/// The arena as shared between a pipeline and its passes.
///
/// Passes borrow it only for the duration of a setup call.
pub type SharedTargets = Rc<RefCell<TargetArena>>;

impl TargetArena {
    pub fn new(allocator: Box<dyn TextureAllocator>) -> Self {
        Self {
            targets: Vec::new(),
            names: FnvHashMap::default(),
            allocator,
        }
    }

    /// Wraps the arena for sharing between passes.
    pub fn shared(self) -> SharedTargets {
        Rc::new(RefCell::new(self))
    }

    /// Registers a shared target. The texture is allocated lazily on the
    /// first [`configure`](Self::configure).
    pub fn register(&mut self, name: &str) -> Result<TargetId, TargetError> {
        let id = self.claim(name)?;
        let slot = self.targets.len();
        self.targets.push(SharedTarget::new(name, id));
        if let Some(entry) = self.names.get_mut(&id) {
            entry.slot = Some(slot);
        }
        Ok(id)
    }

    /// Reserves the identifier of a host-managed temporary target so that no
    /// shared target can collide with it.
    pub fn reserve(&mut self, name: &str) -> Result<TargetId, TargetError> {
        self.claim(name)
    }

    /// Registers several shared targets at once. Either every name is
    /// registered or, on error, none is.
    pub fn register_all<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<Vec<TargetId>, TargetError> {
        let mut pending: FnvHashMap<TargetId, &str> = FnvHashMap::default();
        for name in names {
            let name = name.as_ref();
            let id = self.check_free(name)?;
            if let Some(existing) = pending.insert(id, name) {
                return Err(name_clash(name, existing));
            }
        }
        names.iter().map(|name| self.register(name.as_ref())).collect()
    }

    fn check_free(&self, name: &str) -> Result<TargetId, TargetError> {
        let id = TargetId::from_name(name);
        match self.names.get(&id) {
            Some(entry) => Err(name_clash(name, &entry.name)),
            None => Ok(id),
        }
    }

    fn claim(&mut self, name: &str) -> Result<TargetId, TargetError> {
        let id = self.check_free(name)?;
        self.names.insert(
            id,
            NameEntry {
                name: name.to_owned(),
                slot: None,
            },
        );
        Ok(id)
    }

    /// Looks up a shared target.
    pub fn get(&self, id: TargetId) -> Option<&SharedTarget> {
        let slot = self.names.get(&id)?.slot?;
        self.targets.get(slot)
    }

    /// Name registered or reserved for `id`.
    pub fn name_of(&self, id: TargetId) -> Option<&str> {
        self.names.get(&id).map(|entry| entry.name.as_str())
    }

    fn slot(&self, id: TargetId) -> Result<usize, TargetError> {
        self.names
            .get(&id)
            .and_then(|entry| entry.slot)
            .ok_or(TargetError::UnknownTarget(id))
    }

    /// Makes the target's backing texture match `descriptor`.
    ///
    /// Returns `Ok(true)` when a new texture was allocated and `Ok(false)`
    /// when the existing one already matched. On failure the target is left
    /// without a texture.
    pub fn configure(
        &mut self,
        id: TargetId,
        descriptor: TargetDescriptor,
    ) -> Result<bool, TargetError> {
        let slot = self.slot(id)?;
        let target = &mut self.targets[slot];

        if target.texture.is_some() && target.descriptor == Some(descriptor) {
            return Ok(false);
        }
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(TargetError::ZeroSized {
                name: target.name.clone(),
            });
        }

        if let Some(old) = target.texture.take() {
            self.allocator.release(old);
        }
        target.descriptor = None;

        let texture = self.allocator.allocate(&target.name, &descriptor)?;
        debug!(
            "allocated render target '{}' ({}x{}, {:?}, {} depth bits)",
            target.name,
            descriptor.width,
            descriptor.height,
            descriptor.format,
            descriptor.depth_bits.bits()
        );
        target.texture = Some(texture);
        target.descriptor = Some(descriptor);
        target.allocations += 1;
        Ok(true)
    }

    /// Backing texture of a configured target.
    pub fn texture(&self, id: TargetId) -> Result<TextureHandle, TargetError> {
        let target = &self.targets[self.slot(id)?];
        target
            .texture
            .ok_or_else(|| TargetError::NotAllocated(target.name.clone()))
    }

    /// Iterates over shared targets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Releases every backing texture. Targets stay registered and will be
    /// reallocated by the next `configure`.
    pub fn teardown(&mut self) {
        for target in &mut self.targets {
            if let Some(texture) = target.texture.take() {
                debug!("released render target '{}'", target.name);
                self.allocator.release(texture);
            }
            target.descriptor = None;
        }
    }
}

fn name_clash(name: &str, existing: &str) -> TargetError {
    if name == existing {
        TargetError::DuplicateName(name.to_owned())
    } else {
        TargetError::IdCollision {
            name: name.to_owned(),
            existing: existing.to_owned(),
        }
    }
}
