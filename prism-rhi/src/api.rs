//! The plugin table every backend fulfills.
//!
//! A backend exports three entry points: `prepare` (once at load, for global
//! backend state such as the Vulkan loader), `create` (returns a populated
//! [`RenderApi`] by value) and `cleanup` (process exit). The frontend holds a
//! single process-wide copy of the active table and dispatches every
//! operation through it; no frontend code touches backend memory directly.
//!
//! Entries are plain function pointers so tables can cross a dynamic-library
//! boundary. Missing required entries are detected when the table is bound,
//! not when the verb is first called.

use crate::descriptors::*;
use crate::enums::*;
use crate::error::RhiResult;
use crate::flags::*;
use crate::handle::*;

/// One adapter report: identity plus everything `request_adapter` surfaces.
#[derive(Debug, Clone, Default)]
pub struct AdapterReport {
    pub info: AdapterInfo,
    pub features: SupportedFeatures,
    pub limits: SupportedLimits,
    pub properties: Properties,
}

/// The uniform function-pointer table. Every field is optional at the type
/// level; [`RenderApi::missing_required`] enforces the required verb set.
#[derive(Clone, Copy, Default)]
pub struct RenderApi {
    // instance / adapter / device
    pub create_instance: Option<fn(&RhiDescriptor) -> RhiResult<()>>,
    pub delete_instance: Option<fn()>,
    pub create_adapter: Option<fn(&AdapterDescriptor) -> RhiResult<AdapterReport>>,
    pub delete_adapter: Option<fn()>,
    pub create_device: Option<fn(&DeviceDescriptor) -> RhiResult<()>>,
    pub delete_device: Option<fn()>,
    pub wait_idle: Option<fn() -> RhiResult<()>>,

    // surface / swapchain
    pub create_surface: Option<fn(&SurfaceDescriptor) -> RhiResult<SurfaceHandle>>,
    pub delete_surface: Option<fn(SurfaceHandle) -> RhiResult<()>>,
    pub get_surface_extent: Option<fn(SurfaceHandle) -> RhiResult<Extent2d>>,
    pub get_surface_format: Option<fn(SurfaceHandle) -> RhiResult<TextureFormat>>,
    pub get_surface_image_count: Option<fn(SurfaceHandle) -> RhiResult<u32>>,

    // frame pacing
    pub new_frame: Option<fn() -> RhiResult<()>>,
    pub end_frame: Option<fn() -> RhiResult<()>>,
    pub acquire_next_frame: Option<fn(SurfaceHandle) -> RhiResult<SurfaceTexture>>,
    pub present_curr_frame: Option<fn(SurfaceHandle) -> RhiResult<()>>,

    // fences
    pub create_fence: Option<fn(&FenceDescriptor) -> RhiResult<FenceHandle>>,
    pub delete_fence: Option<fn(FenceHandle) -> RhiResult<()>>,
    pub wait_fence: Option<fn(FenceHandle, u64) -> RhiResult<()>>,
    pub signal_fence: Option<fn(FenceHandle, u64) -> RhiResult<()>>,
    pub fence_ready: Option<fn(FenceHandle) -> RhiResult<bool>>,
    pub reset_fence: Option<fn(FenceHandle) -> RhiResult<()>>,
    pub fence_target: Option<fn(FenceHandle) -> RhiResult<u64>>,

    // buffers
    pub create_buffer: Option<fn(&BufferDescriptor) -> RhiResult<BufferHandle>>,
    pub delete_buffer: Option<fn(BufferHandle) -> RhiResult<()>>,
    pub map_buffer: Option<fn(BufferHandle, MapMode, u64, u64) -> RhiResult<()>>,
    pub unmap_buffer: Option<fn(BufferHandle) -> RhiResult<()>>,
    pub get_mapped_range: Option<fn(BufferHandle) -> RhiResult<MappedBufferRange>>,

    // textures / views / samplers / shaders
    pub create_texture: Option<fn(&TextureDescriptor) -> RhiResult<TextureHandle>>,
    pub delete_texture: Option<fn(TextureHandle) -> RhiResult<()>>,
    pub create_texture_view:
        Option<fn(TextureHandle, &TextureViewDescriptor) -> RhiResult<TextureViewHandle>>,
    pub delete_texture_view: Option<fn(TextureViewHandle) -> RhiResult<()>>,
    pub create_sampler: Option<fn(&SamplerDescriptor) -> RhiResult<SamplerHandle>>,
    pub delete_sampler: Option<fn(SamplerHandle) -> RhiResult<()>>,
    pub create_shader_module: Option<fn(&ShaderModuleDescriptor) -> RhiResult<ShaderModuleHandle>>,
    pub delete_shader_module: Option<fn(ShaderModuleHandle) -> RhiResult<()>>,

    // query sets (optional capability)
    pub create_query_set: Option<fn(&QuerySetDescriptor) -> RhiResult<QuerySetHandle>>,
    pub delete_query_set: Option<fn(QuerySetHandle) -> RhiResult<()>>,

    // acceleration structures (optional capability)
    pub create_blas: Option<fn(&BlasDescriptor) -> RhiResult<BlasHandle>>,
    pub delete_blas: Option<fn(BlasHandle) -> RhiResult<()>>,
    pub get_blas_sizes: Option<fn(BlasHandle) -> RhiResult<BvhSizes>>,
    pub create_tlas: Option<fn(&TlasDescriptor) -> RhiResult<TlasHandle>>,
    pub delete_tlas: Option<fn(TlasHandle) -> RhiResult<()>>,
    pub get_tlas_sizes: Option<fn(TlasHandle) -> RhiResult<BvhSizes>>,

    // layouts / bind groups
    pub create_bind_group_layout:
        Option<fn(&BindGroupLayoutDescriptor) -> RhiResult<BindGroupLayoutHandle>>,
    pub delete_bind_group_layout: Option<fn(BindGroupLayoutHandle) -> RhiResult<()>>,
    pub create_pipeline_layout:
        Option<fn(&PipelineLayoutDescriptor) -> RhiResult<PipelineLayoutHandle>>,
    pub delete_pipeline_layout: Option<fn(PipelineLayoutHandle) -> RhiResult<()>>,
    pub create_bind_group: Option<fn(&BindGroupDescriptor) -> RhiResult<BindGroupHandle>>,
    pub delete_bind_group: Option<fn(BindGroupHandle) -> RhiResult<()>>,

    // pipelines
    pub create_render_pipeline:
        Option<fn(&RenderPipelineDescriptor) -> RhiResult<RenderPipelineHandle>>,
    pub delete_render_pipeline: Option<fn(RenderPipelineHandle) -> RhiResult<()>>,
    pub create_compute_pipeline:
        Option<fn(&ComputePipelineDescriptor) -> RhiResult<ComputePipelineHandle>>,
    pub delete_compute_pipeline: Option<fn(ComputePipelineHandle) -> RhiResult<()>>,
    pub create_raytracing_pipeline:
        Option<fn(&RayTracingPipelineDescriptor) -> RhiResult<RayTracingPipelineHandle>>,
    pub delete_raytracing_pipeline: Option<fn(RayTracingPipelineHandle) -> RhiResult<()>>,

    // command buffers
    pub create_command_buffer:
        Option<fn(&CommandBufferDescriptor) -> RhiResult<CommandEncoderHandle>>,
    pub create_command_bundle:
        Option<fn(&CommandBundleDescriptor) -> RhiResult<CommandEncoderHandle>>,
    pub submit_command_buffer: Option<fn(CommandEncoderHandle) -> RhiResult<()>>,

    // recording: synchronization
    pub cmd_wait_fence: Option<fn(CommandEncoderHandle, FenceHandle, BarrierSync) -> RhiResult<()>>,
    pub cmd_signal_fence:
        Option<fn(CommandEncoderHandle, FenceHandle, BarrierSync) -> RhiResult<()>>,
    pub cmd_memory_barrier: Option<fn(CommandEncoderHandle, &[MemoryBarrier]) -> RhiResult<()>>,
    pub cmd_buffer_barrier: Option<fn(CommandEncoderHandle, &[BufferBarrier]) -> RhiResult<()>>,
    pub cmd_texture_barrier: Option<fn(CommandEncoderHandle, &[TextureBarrier]) -> RhiResult<()>>,

    // recording: passes and state
    pub cmd_begin_render_pass:
        Option<fn(CommandEncoderHandle, &RenderPassDescriptor) -> RhiResult<()>>,
    pub cmd_end_render_pass: Option<fn(CommandEncoderHandle) -> RhiResult<()>>,
    pub cmd_set_render_pipeline: Option<
        fn(CommandEncoderHandle, RenderPipelineHandle, PipelineLayoutHandle) -> RhiResult<()>,
    >,
    pub cmd_set_compute_pipeline: Option<
        fn(CommandEncoderHandle, ComputePipelineHandle, PipelineLayoutHandle) -> RhiResult<()>,
    >,
    pub cmd_set_raytracing_pipeline: Option<
        fn(CommandEncoderHandle, RayTracingPipelineHandle, PipelineLayoutHandle) -> RhiResult<()>,
    >,
    pub cmd_set_bind_group:
        Option<fn(CommandEncoderHandle, u32, BindGroupHandle, &[u32]) -> RhiResult<()>>,
    pub cmd_set_push_constants:
        Option<fn(CommandEncoderHandle, ShaderStages, u32, &[u8]) -> RhiResult<()>>,
    pub cmd_set_index_buffer:
        Option<fn(CommandEncoderHandle, BufferHandle, IndexFormat, u64, u64) -> RhiResult<()>>,
    pub cmd_set_vertex_buffer:
        Option<fn(CommandEncoderHandle, u32, BufferHandle, u64, u64) -> RhiResult<()>>,
    pub cmd_set_viewport:
        Option<fn(CommandEncoderHandle, f32, f32, f32, f32, f32, f32) -> RhiResult<()>>,
    pub cmd_set_scissor_rect:
        Option<fn(CommandEncoderHandle, u32, u32, u32, u32) -> RhiResult<()>>,
    pub cmd_set_blend_constant: Option<fn(CommandEncoderHandle, Color) -> RhiResult<()>>,
    pub cmd_set_stencil_reference: Option<fn(CommandEncoderHandle, u32) -> RhiResult<()>>,

    // recording: work
    pub cmd_draw: Option<fn(CommandEncoderHandle, u32, u32, u32, u32) -> RhiResult<()>>,
    pub cmd_draw_indexed:
        Option<fn(CommandEncoderHandle, u32, u32, u32, i32, u32) -> RhiResult<()>>,
    pub cmd_draw_indirect:
        Option<fn(CommandEncoderHandle, BufferHandle, u64, u32) -> RhiResult<()>>,
    pub cmd_draw_indexed_indirect:
        Option<fn(CommandEncoderHandle, BufferHandle, u64, u32) -> RhiResult<()>>,
    pub cmd_dispatch_workgroups: Option<fn(CommandEncoderHandle, u32, u32, u32) -> RhiResult<()>>,
    pub cmd_dispatch_workgroups_indirect:
        Option<fn(CommandEncoderHandle, BufferHandle, u64) -> RhiResult<()>>,

    // recording: copies
    pub cmd_copy_buffer_to_buffer:
        Option<fn(CommandEncoderHandle, BufferHandle, u64, BufferHandle, u64, u64) -> RhiResult<()>>,
    pub cmd_copy_buffer_to_texture: Option<
        fn(CommandEncoderHandle, &TexelCopyBufferInfo, &TexelCopyTextureInfo, Extent3d) -> RhiResult<()>,
    >,
    pub cmd_copy_texture_to_buffer: Option<
        fn(CommandEncoderHandle, &TexelCopyTextureInfo, &TexelCopyBufferInfo, Extent3d) -> RhiResult<()>,
    >,
    pub cmd_copy_texture_to_texture: Option<
        fn(CommandEncoderHandle, &TexelCopyTextureInfo, &TexelCopyTextureInfo, Extent3d) -> RhiResult<()>,
    >,
    pub cmd_clear_buffer: Option<fn(CommandEncoderHandle, BufferHandle, u64, u64) -> RhiResult<()>>,

    // recording: queries (optional capability)
    pub cmd_begin_occlusion_query: Option<fn(CommandEncoderHandle, u32) -> RhiResult<()>>,
    pub cmd_end_occlusion_query: Option<fn(CommandEncoderHandle) -> RhiResult<()>>,
    pub cmd_write_timestamp: Option<fn(CommandEncoderHandle, QuerySetHandle, u32) -> RhiResult<()>>,
    pub cmd_resolve_query_set:
        Option<fn(CommandEncoderHandle, QuerySetHandle, u32, u32, BufferHandle, u64) -> RhiResult<()>>,

    // recording: debug
    pub cmd_insert_debug_marker: Option<fn(CommandEncoderHandle, &str) -> RhiResult<()>>,
    pub cmd_push_debug_group: Option<fn(CommandEncoderHandle, &str) -> RhiResult<()>>,
    pub cmd_pop_debug_group: Option<fn(CommandEncoderHandle) -> RhiResult<()>>,
    pub cmd_execute_bundles:
        Option<fn(CommandEncoderHandle, &[CommandEncoderHandle]) -> RhiResult<()>>,
}

macro_rules! check_required {
    ($table:expr, $missing:expr, $($field:ident),+ $(,)?) => {
        $(if $table.$field.is_none() {
            $missing.push(stringify!($field));
        })+
    };
}

impl RenderApi {
    /// Names of every required verb the table fails to provide. Bound tables
    /// with a non-empty result are rejected before any call is made.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        check_required!(
            self, missing,
            create_instance, delete_instance,
            create_adapter, delete_adapter,
            create_device, delete_device,
            create_surface, delete_surface,
            create_buffer, delete_buffer,
            create_texture, delete_texture,
            create_texture_view, delete_texture_view,
            create_sampler, delete_sampler,
            create_shader_module, delete_shader_module,
            create_render_pipeline, delete_render_pipeline,
            create_compute_pipeline, delete_compute_pipeline,
            create_bind_group_layout, delete_bind_group_layout,
            create_pipeline_layout, delete_pipeline_layout,
            create_bind_group, delete_bind_group,
            create_command_buffer, submit_command_buffer,
            create_fence, delete_fence, wait_fence,
            acquire_next_frame, present_curr_frame,
            wait_idle,
        );
        missing
    }
}

/// The three symbols a backend plugin exports.
#[derive(Clone, Copy)]
pub struct PluginEntry {
    /// Called once at load, before the first `create`.
    pub prepare: fn(),
    /// Returns a fully populated table by value.
    pub create: fn() -> RenderApi,
    /// Called at process shutdown.
    pub cleanup: fn(),
}

/// Conventional dynamic-library name for a backend plugin, resolved relative
/// to the executable's search path.
#[cfg(feature = "dylib")]
pub fn plugin_library_name(backend: crate::Backend) -> String {
    let stem = match backend {
        crate::Backend::Vulkan => "prism_vulkan",
        crate::Backend::D3d12 => "prism_d3d12",
        crate::Backend::Metal => "prism_metal",
        crate::Backend::Null => "prism_null",
    };
    libloading::library_filename(stem).to_string_lossy().into_owned()
}

/// Plugin loaded from a dynamic library. The library must stay alive for as
/// long as its table is active, so the loader keeps it boxed beside the
/// entry points. Plugins must be built with the same toolchain as the host.
#[cfg(feature = "dylib")]
pub struct DynamicPlugin {
    pub entry: PluginEntry,
    _library: libloading::Library,
}

#[cfg(feature = "dylib")]
impl DynamicPlugin {
    pub fn load(backend: crate::Backend) -> crate::error::RhiResult<Self> {
        use crate::error::RhiError;

        let name = plugin_library_name(backend);
        let library = unsafe { libloading::Library::new(&name) }.map_err(|err| {
            log::warn!("failed to load backend plugin {name}: {err}");
            RhiError::BackendUnavailable(backend)
        })?;
        let entry = unsafe {
            PluginEntry {
                prepare: *library
                    .get::<fn()>(b"prepare\0")
                    .map_err(|_| RhiError::BackendUnavailable(backend))?,
                create: *library
                    .get::<fn() -> RenderApi>(b"create\0")
                    .map_err(|_| RhiError::BackendUnavailable(backend))?,
                cleanup: *library
                    .get::<fn()>(b"cleanup\0")
                    .map_err(|_| RhiError::BackendUnavailable(backend))?,
            }
        };
        Ok(Self { entry, _library: library })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_reports_every_required_verb() {
        let missing = RenderApi::default().missing_required();
        assert!(missing.contains(&"create_buffer"));
        assert!(missing.contains(&"acquire_next_frame"));
        assert!(missing.contains(&"wait_idle"));
        // optional capabilities are not in the required set
        assert!(!missing.contains(&"create_raytracing_pipeline"));
        assert!(!missing.contains(&"cmd_write_timestamp"));
    }
}
