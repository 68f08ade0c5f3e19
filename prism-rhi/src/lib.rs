//! prism RHI: backend-agnostic Rendering Hardware Interface.
//!
//! One WebGPU-shaped command/resource model, dispatched through a uniform
//! plugin table to a concrete GPU backend. The Vulkan backend is the
//! reference implementation; the null backend executes the same contract on
//! the CPU for tests and headless runs.
//!
//! The flow per presented frame: [`Rhi::new_frame`] selects a frame slot and
//! recycles its transient pools, the application records command encoders and
//! submits them with explicit fence pairs, [`Surface::acquire_next_frame`]
//! hands out the swapchain image, and [`Surface::present`] returns it.

mod api;
mod backends;
mod descriptors;
mod enums;
pub(crate) mod error;
mod flags;
mod handle;
mod rhi;
mod slotmap;

#[cfg(feature = "vulkan")]
mod vulkan;

pub use api::{AdapterReport, PluginEntry, RenderApi};
pub use descriptors::*;
pub use enums::*;
pub use error::{MemoryDomain, RhiError, RhiResult};
pub use flags::*;
pub use handle::*;
pub use rhi::{
    Adapter, BindGroup, BindGroupLayout, Blas, Buffer, CommandEncoder, ComputePipeline, Device,
    Fence, PipelineLayout, QuerySet, RayTracingPipeline, RenderPipeline, Rhi, Sampler,
    ShaderModule, Surface, Texture, TextureView, Tlas,
};

#[cfg(feature = "dylib")]
pub use api::{plugin_library_name, DynamicPlugin};
