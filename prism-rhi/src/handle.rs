//! Typed, opaque GPU object handles.
//!
//! A handle is an object-kind tag plus a 32-bit slot value. Handles never
//! dereference backend memory; they index the backend's pools. The zero state
//! is reserved so a default-constructed handle is distinguishable from any
//! live object.

/// Every object kind the plugin table can create or destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Fence,
    Buffer,
    Texture,
    TextureView,
    Sampler,
    ShaderModule,
    QuerySet,
    Blas,
    Tlas,
    BindGroup,
    BindGroupLayout,
    PipelineLayout,
    RenderPipeline,
    ComputePipeline,
    RayTracingPipeline,
    CommandEncoder,
    Surface,
}

const INVALID: u32 = u32::MAX;

/// Untyped handle payload. Equality is (kind, value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle {
    pub kind: ObjectKind,
    pub value: u32,
}

impl RawHandle {
    pub const fn new(kind: ObjectKind, value: u32) -> Self {
        Self { kind, value }
    }

    pub const fn invalid(kind: ObjectKind) -> Self {
        Self { kind, value: INVALID }
    }

    pub const fn valid(&self) -> bool {
        self.value != INVALID
    }

    pub fn index(&self) -> usize {
        self.value as usize
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident, $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) RawHandle);

        impl $name {
            pub const KIND: ObjectKind = ObjectKind::$kind;

            pub(crate) const fn new(value: u32) -> Self {
                Self(RawHandle::new(Self::KIND, value))
            }

            pub const fn valid(&self) -> bool {
                self.0.valid()
            }

            /// Reset to the invalid state. Used by destroy paths so a stale
            /// copy can be told apart from a live handle.
            pub fn invalidate(&mut self) {
                self.0.value = INVALID;
            }

            pub const fn raw(&self) -> RawHandle {
                self.0
            }

            pub(crate) fn index(&self) -> usize {
                self.0.index()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(RawHandle::invalid(Self::KIND))
            }
        }
    };
}

typed_handle!(FenceHandle, Fence);
typed_handle!(BufferHandle, Buffer);
typed_handle!(TextureHandle, Texture);
typed_handle!(TextureViewHandle, TextureView);
typed_handle!(SamplerHandle, Sampler);
typed_handle!(ShaderModuleHandle, ShaderModule);
typed_handle!(QuerySetHandle, QuerySet);
typed_handle!(BlasHandle, Blas);
typed_handle!(TlasHandle, Tlas);
typed_handle!(
    /// Frame-scoped: indexes the owning frame's descriptor pool, recycled on
    /// the next visit of the same frame slot.
    BindGroupHandle, BindGroup);
typed_handle!(BindGroupLayoutHandle, BindGroupLayout);
typed_handle!(PipelineLayoutHandle, PipelineLayout);
typed_handle!(RenderPipelineHandle, RenderPipeline);
typed_handle!(ComputePipelineHandle, ComputePipeline);
typed_handle!(RayTracingPipelineHandle, RayTracingPipeline);
typed_handle!(
    /// Frame-scoped: indexes the owning frame's encoder list.
    CommandEncoderHandle, CommandEncoder);
typed_handle!(SurfaceHandle, Surface);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_invalid() {
        let handle = BufferHandle::default();
        assert!(!handle.valid());
        assert_eq!(handle.raw().kind, ObjectKind::Buffer);
    }

    #[test]
    fn slot_zero_is_a_live_handle() {
        let handle = BufferHandle::new(0);
        assert!(handle.valid());
        assert_eq!(handle.index(), 0);
    }

    #[test]
    fn equality_is_kind_and_value() {
        assert_eq!(TextureHandle::new(3), TextureHandle::new(3));
        assert_ne!(TextureHandle::new(3), TextureHandle::new(4));
        assert_ne!(TextureHandle::new(3).raw(), TextureViewHandle::new(3).raw());
    }

    #[test]
    fn invalidate_resets_to_default_state() {
        let mut handle = FenceHandle::new(7);
        handle.invalidate();
        assert!(!handle.valid());
        assert_eq!(handle, FenceHandle::default());
    }
}
