//! Flag bitsets carried by descriptors and barriers.
//!
//! Bit values follow the WebGPU constants so descriptors serialize by value
//! identically across backends.

use bitflags::bitflags;

bitflags! {
    /// Global RHI behavior switches passed to init.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RhiFlags: u32 {
        const DEBUG = 1 << 0;
        const VALIDATION = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct BufferUsage: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const UNIFORM = 1 << 6;
        const STORAGE = 1 << 7;
        const INDIRECT = 1 << 8;
        const QUERY_RESOLVE = 1 << 9;
        /// Participates in BVH builds; requests a device address.
        const BVH_INPUT = 1 << 10;
        const BVH_STORAGE = 1 << 11;
        const SHADER_DEVICE_ADDRESS = 1 << 12;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const RAYGEN = 1 << 3;
        const MISS = 1 << 4;
        const CLOSEST_HIT = 1 << 5;
        const ANY_HIT = 1 << 6;
        const INTERSECTION = 1 << 7;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWrites {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Pipeline-stage scope of a barrier or a fence wait/signal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BarrierSync: u32 {
        const NONE = 0;
        const DRAW_INDIRECT = 1 << 0;
        const VERTEX_INPUT = 1 << 1;
        const VERTEX_SHADER = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const EARLY_DEPTH_STENCIL = 1 << 4;
        const LATE_DEPTH_STENCIL = 1 << 5;
        const RENDER_TARGET = 1 << 6;
        const COMPUTE = 1 << 7;
        const COPY = 1 << 8;
        const RESOLVE = 1 << 9;
        const BVH_BUILD = 1 << 10;
        const RAYTRACING = 1 << 11;
        const ALL = 1 << 12;
    }
}

bitflags! {
    /// Memory-access scope of a barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BarrierAccess: u32 {
        const NONE = 0;
        const INDIRECT_ARGUMENT = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const VERTEX_BUFFER = 1 << 2;
        const UNIFORM_BUFFER = 1 << 3;
        const SHADER_READ = 1 << 4;
        const SHADER_WRITE = 1 << 5;
        const RENDER_TARGET_READ = 1 << 6;
        const RENDER_TARGET_WRITE = 1 << 7;
        const DEPTH_STENCIL_READ = 1 << 8;
        const DEPTH_STENCIL_WRITE = 1 << 9;
        const COPY_SRC = 1 << 10;
        const COPY_DST = 1 << 11;
        const BVH_READ = 1 << 12;
        const BVH_WRITE = 1 << 13;
        const MEMORY_READ = 1 << 14;
        const MEMORY_WRITE = 1 << 15;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

impl Default for TextureAspect {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Build preferences for acceleration structures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BvhFlags: u32 {
        const ALLOW_UPDATE = 1 << 0;
        const ALLOW_COMPACTION = 1 << 1;
        const PREFER_FAST_TRACE = 1 << 2;
        const PREFER_FAST_BUILD = 1 << 3;
        const LOW_MEMORY = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BvhGeometryFlags: u32 {
        const OPAQUE = 1 << 0;
        const NO_DUPLICATE_ANY_HIT = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_contains() {
        let usage = BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC;
        assert!(usage.contains(BufferUsage::MAP_WRITE));
        assert!(!usage.contains(BufferUsage::UNIFORM));
        assert_eq!(usage & BufferUsage::COPY_SRC, BufferUsage::COPY_SRC);
    }

    #[test]
    fn color_writes_default_to_all_channels() {
        assert_eq!(ColorWrites::default(), ColorWrites::ALL);
        assert!(ColorWrites::default().contains(ColorWrites::ALPHA));
    }

    #[test]
    fn aspect_all_covers_every_plane() {
        assert!(TextureAspect::ALL.contains(TextureAspect::DEPTH | TextureAspect::STENCIL));
    }
}
