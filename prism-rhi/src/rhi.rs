//! Frontend façade: the single-entry [`Rhi`] plus the thin object wrappers
//! applications hold.
//!
//! Frontend objects are values: a handle, the label, and the slice of
//! descriptor state the frontend promises to surface. They own no backend
//! memory; the backend's pools do. Every method dispatches through the
//! process-wide plugin table.

use std::sync::Mutex;

use crate::api::{AdapterReport, PluginEntry, RenderApi};
use crate::backends;
use crate::descriptors::*;
use crate::enums::*;
use crate::error::{fatal, RhiError, RhiResult};
use crate::flags::*;
use crate::handle::*;

struct ActiveRhi {
    backend: Backend,
    api: RenderApi,
    cleanup: fn(),
    #[cfg(feature = "dylib")]
    _dynamic: Option<crate::api::DynamicPlugin>,
}

static ACTIVE: Mutex<Option<ActiveRhi>> = Mutex::new(None);

/// Copy of the active table. The table is the single place where backend
/// dispatch crosses into frontend code.
pub(crate) fn api() -> RenderApi {
    match ACTIVE.lock().unwrap().as_ref() {
        Some(active) => active.api,
        None => fatal!("RHI used before init"),
    }
}

pub(crate) fn active_backend() -> RhiResult<Backend> {
    ACTIVE
        .lock()
        .unwrap()
        .as_ref()
        .map(|active| active.backend)
        .ok_or(RhiError::NotInitialized)
}

/// Call a required table entry. Required entries are checked at bind time, so
/// a null one here is a broken plugin, not a user error.
macro_rules! dispatch {
    ($field:ident) => {
        match crate::rhi::api().$field {
            Some(f) => f,
            None => crate::error::fatal!("required plugin entry {} is null", stringify!($field)),
        }
    };
}
pub(crate) use dispatch;

/// Call an optional table entry, reporting `NotImplemented` when the active
/// backend leaves it empty.
macro_rules! dispatch_opt {
    ($field:ident $(, $arg:expr)* $(,)?) => {
        match crate::rhi::api().$field {
            Some(f) => f($($arg),*),
            None => Err(crate::error::RhiError::NotImplemented {
                op: stringify!($field),
                backend: crate::rhi::active_backend()?,
            }),
        }
    };
}
pub(crate) use dispatch_opt;

/// Root of the API. Init is callable once per process; re-entry fails with
/// `AlreadyInitialized` until the owner calls [`Rhi::destroy`].
pub struct Rhi {
    pub backend: Backend,
    pub flags: RhiFlags,
    pub window: WindowHandle,
}

impl Rhi {
    pub fn init(descriptor: &RhiDescriptor) -> RhiResult<Rhi> {
        let mut active = ACTIVE.lock().unwrap();
        if active.is_some() {
            return Err(RhiError::AlreadyInitialized);
        }

        let backend = descriptor.backend.unwrap_or(backends::default_backend());
        let bound = backends::bind(backend)?;
        (bound.entry.prepare)();
        let api = (bound.entry.create)();

        let missing = api.missing_required();
        if !missing.is_empty() {
            fatal!("backend {backend:?} plugin table is missing required entries: {missing:?}");
        }

        log::info!("RHI initialized with {backend:?} backend (flags {:?})", descriptor.flags);

        let create_instance = match api.create_instance {
            Some(f) => f,
            None => unreachable!("checked by missing_required"),
        };
        create_instance(descriptor)?;

        *active = Some(ActiveRhi {
            backend,
            api,
            cleanup: bound.entry.cleanup,
            #[cfg(feature = "dylib")]
            _dynamic: bound.dynamic,
        });

        Ok(Rhi { backend, flags: descriptor.flags, window: descriptor.window })
    }

    /// Tear down in reverse creation order: device, adapter, instance, then
    /// release the plugin. Surfaces still alive are destroyed by the device.
    pub fn destroy(self) {
        let mut active = ACTIVE.lock().unwrap();
        if let Some(current) = active.take() {
            if let Some(f) = current.api.delete_device {
                f();
            }
            if let Some(f) = current.api.delete_adapter {
                f();
            }
            if let Some(f) = current.api.delete_instance {
                f();
            }
            (current.cleanup)();
            log::info!("RHI destroyed");
        }
    }

    pub fn request_adapter(&self, descriptor: &AdapterDescriptor) -> RhiResult<Adapter> {
        let report = dispatch!(create_adapter)(descriptor)?;
        Ok(Adapter::from_report(report))
    }

    pub fn request_surface(&self, descriptor: &SurfaceDescriptor) -> RhiResult<Surface> {
        let handle = dispatch!(create_surface)(descriptor)?;
        Ok(Surface { handle, label: descriptor.label.clone() })
    }

    /// Enter the next frame slot: waits the slot's inflight fence and resets
    /// its command and descriptor pools.
    pub fn new_frame() -> RhiResult<()> {
        dispatch_opt!(new_frame)
    }

    /// Leave the current frame slot, advancing the frame counter.
    pub fn end_frame() -> RhiResult<()> {
        dispatch_opt!(end_frame)
    }

    /// Block until every queue drained.
    pub fn wait() -> RhiResult<()> {
        dispatch!(wait_idle)()
    }
}

/// A physical GPU exposed to the process.
#[derive(Debug, Clone)]
pub struct Adapter {
    pub info: AdapterInfo,
    pub features: SupportedFeatures,
    pub limits: SupportedLimits,
    pub properties: Properties,
}

impl Adapter {
    /// Feature checks happen before the backend is asked to create anything,
    /// so a failing request leaves no partial device behind.
    pub fn request_device(&self, descriptor: &DeviceDescriptor) -> RhiResult<Device> {
        for feature in &descriptor.required_features {
            if !self.features.supports(*feature) {
                return Err(RhiError::FeatureUnsupported(feature.as_str()));
            }
        }
        dispatch!(create_device)(descriptor)?;
        Ok(Device {
            adapter_info: self.info.clone(),
            features: self.features,
            limits: self.limits,
            properties: self.properties,
        })
    }

    pub(crate) fn from_report(report: AdapterReport) -> Self {
        Self {
            info: report.info,
            features: report.features,
            limits: report.limits,
            properties: report.properties,
        }
    }
}

/// A logical connection to an adapter, owning queues and resources.
#[derive(Debug, Clone)]
pub struct Device {
    pub adapter_info: AdapterInfo,
    pub features: SupportedFeatures,
    pub limits: SupportedLimits,
    pub properties: Properties,
}

impl Device {
    pub fn create_fence(&self) -> RhiResult<Fence> {
        let desc = FenceDescriptor::default();
        Ok(Fence { handle: dispatch!(create_fence)(&desc)? })
    }

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> RhiResult<Buffer> {
        if descriptor.size == 0 {
            return Err(RhiError::DescriptorInvalid { field: "size", reason: "buffer size must be nonzero" });
        }
        let handle = dispatch!(create_buffer)(descriptor)?;
        Ok(Buffer {
            handle,
            size: descriptor.size,
            usage: descriptor.usage,
            label: descriptor.label.clone(),
        })
    }

    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> RhiResult<Texture> {
        let handle = dispatch!(create_texture)(descriptor)?;
        Ok(Texture {
            handle,
            width: descriptor.size.width,
            height: descriptor.size.height,
            depth: descriptor.size.depth,
            array_layers: descriptor.array_layers,
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count,
            dimension: descriptor.dimension,
            format: descriptor.format,
            usage: descriptor.usage,
            label: descriptor.label.clone(),
        })
    }

    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> RhiResult<Sampler> {
        Ok(Sampler { handle: dispatch!(create_sampler)(descriptor)?, label: descriptor.label.clone() })
    }

    pub fn create_shader_module(&self, descriptor: &ShaderModuleDescriptor) -> RhiResult<ShaderModule> {
        Ok(ShaderModule {
            handle: dispatch!(create_shader_module)(descriptor)?,
            label: descriptor.label.clone(),
        })
    }

    pub fn create_query_set(&self, descriptor: &QuerySetDescriptor) -> RhiResult<QuerySet> {
        let handle = dispatch_opt!(create_query_set, descriptor)?;
        Ok(QuerySet { handle, kind: descriptor.kind, count: descriptor.count })
    }

    pub fn create_blas(&self, descriptor: &BlasDescriptor) -> RhiResult<Blas> {
        Ok(Blas { handle: dispatch_opt!(create_blas, descriptor)? })
    }

    pub fn create_tlas(&self, descriptor: &TlasDescriptor) -> RhiResult<Tlas> {
        Ok(Tlas { handle: dispatch_opt!(create_tlas, descriptor)? })
    }

    pub fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> RhiResult<BindGroupLayout> {
        Ok(BindGroupLayout { handle: dispatch!(create_bind_group_layout)(descriptor)? })
    }

    pub fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> RhiResult<PipelineLayout> {
        Ok(PipelineLayout { handle: dispatch!(create_pipeline_layout)(descriptor)? })
    }

    /// Bind groups come out of the current frame's descriptor pool and are
    /// valid only for that frame's lifetime.
    pub fn create_bind_group(&self, descriptor: &BindGroupDescriptor) -> RhiResult<BindGroup> {
        Ok(BindGroup { handle: dispatch!(create_bind_group)(descriptor)? })
    }

    pub fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> RhiResult<RenderPipeline> {
        Ok(RenderPipeline {
            handle: dispatch!(create_render_pipeline)(descriptor)?,
            layout: descriptor.layout,
        })
    }

    pub fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> RhiResult<ComputePipeline> {
        Ok(ComputePipeline {
            handle: dispatch!(create_compute_pipeline)(descriptor)?,
            layout: descriptor.layout,
        })
    }

    pub fn create_raytracing_pipeline(
        &self,
        descriptor: &RayTracingPipelineDescriptor,
    ) -> RhiResult<RayTracingPipeline> {
        Ok(RayTracingPipeline {
            handle: dispatch_opt!(create_raytracing_pipeline, descriptor)?,
            layout: descriptor.layout,
        })
    }

    /// Allocate a primary command buffer from the current frame's pool for
    /// the requested queue, already begun for one-time submission.
    pub fn create_command_buffer(
        &self,
        descriptor: &CommandBufferDescriptor,
    ) -> RhiResult<CommandEncoder> {
        Ok(CommandEncoder {
            handle: dispatch!(create_command_buffer)(descriptor)?,
            queue: descriptor.queue,
        })
    }

    pub fn create_command_bundle(
        &self,
        descriptor: &CommandBundleDescriptor,
    ) -> RhiResult<CommandEncoder> {
        Ok(CommandEncoder {
            handle: dispatch_opt!(create_command_bundle, descriptor)?,
            queue: descriptor.queue,
        })
    }

    pub fn wait(&self) -> RhiResult<()> {
        dispatch!(wait_idle)()
    }

    pub fn wait_fence(&self, fence: &Fence) -> RhiResult<()> {
        dispatch!(wait_fence)(fence.handle, u64::MAX)
    }
}

/// The bridge between a window and a swapchain. A surface created without a
/// window is headless and drives an offscreen render target.
#[derive(Debug)]
pub struct Surface {
    handle: SurfaceHandle,
    pub label: Option<String>,
}

impl Surface {
    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    /// Acquire the next image of the swapchain ring. At most one outstanding
    /// acquire per surface; present releases it.
    pub fn acquire_next_frame(&self) -> RhiResult<SurfaceTexture> {
        dispatch!(acquire_next_frame)(self.handle)
    }

    pub fn present(&self) -> RhiResult<()> {
        dispatch!(present_curr_frame)(self.handle)
    }

    pub fn extent(&self) -> RhiResult<Extent2d> {
        dispatch_opt!(get_surface_extent, self.handle)
    }

    pub fn format(&self) -> RhiResult<TextureFormat> {
        dispatch_opt!(get_surface_format, self.handle)
    }

    pub fn image_count(&self) -> RhiResult<u32> {
        dispatch_opt!(get_surface_image_count, self.handle)
    }

    pub fn destroy(mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_surface)(handle)
    }
}

/// Timeline synchronization primitive. On Vulkan this is a timeline
/// semaphore; the binary flavor exists only for swapchain acquisition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fence {
    pub(crate) handle: FenceHandle,
}

impl From<FenceHandle> for Fence {
    /// Wrap a fence handle handed back by the backend (e.g. the fences in a
    /// [`SurfaceTexture`]). The surface owns these; do not destroy them.
    fn from(handle: FenceHandle) -> Self {
        Self { handle }
    }
}

impl Fence {
    pub fn handle(&self) -> FenceHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }

    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        dispatch!(wait_fence)(self.handle, timeout)
    }

    pub fn signal(&self, value: u64) -> RhiResult<()> {
        dispatch_opt!(signal_fence, self.handle, value)
    }

    /// True when the counter has reached the current target.
    pub fn ready(&self) -> RhiResult<bool> {
        dispatch_opt!(fence_ready, self.handle)
    }

    /// Advance the target past the current counter value.
    pub fn reset(&self) -> RhiResult<()> {
        dispatch_opt!(reset_fence, self.handle)
    }

    pub fn target(&self) -> RhiResult<u64> {
        dispatch_opt!(fence_target, self.handle)
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_fence)(handle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub(crate) handle: BufferHandle,
    pub size: u64,
    pub usage: BufferUsage,
    pub label: Option<String>,
}

impl Buffer {
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }

    pub fn map(&self, mode: MapMode, offset: u64, size: u64) -> RhiResult<()> {
        dispatch_opt!(map_buffer, self.handle, mode, offset, size)
    }

    pub fn unmap(&self) -> RhiResult<()> {
        dispatch_opt!(unmap_buffer, self.handle)
    }

    /// The range is valid until unmap; the typed helpers on it bounds-check.
    pub fn mapped_range(&self) -> RhiResult<MappedBufferRange> {
        dispatch_opt!(get_mapped_range, self.handle)
    }

    pub fn map_state(&self) -> MapState {
        match crate::rhi::api().get_mapped_range {
            Some(f) => match f(self.handle) {
                Ok(_) => MapState::Mapped,
                Err(_) => MapState::Unmapped,
            },
            None => MapState::Unmapped,
        }
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_buffer)(handle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub(crate) handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_layers: u32,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub label: Option<String>,
}

impl Texture {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }

    /// View with every argument defaulted from this texture.
    pub fn create_view(&self) -> RhiResult<TextureView> {
        self.create_view_with(&TextureViewDescriptor::default())
    }

    pub fn create_view_with(&self, descriptor: &TextureViewDescriptor) -> RhiResult<TextureView> {
        let mut resolved = descriptor.clone();
        if resolved.format.is_none() {
            resolved.format = Some(self.format);
        }
        if resolved.dimension.is_none() {
            resolved.dimension = Some(match self.dimension {
                TextureDimension::D1 => TextureViewDimension::D1,
                TextureDimension::D2 => TextureViewDimension::D2,
                TextureDimension::D3 => TextureViewDimension::D3,
            });
        }
        if resolved.mip_level_count == 0 {
            let full_chain = 31 - self.width.min(self.height).max(1).leading_zeros();
            resolved.mip_level_count = self.mip_level_count.min(full_chain).max(1);
        }
        if resolved.array_layer_count == 0 {
            resolved.array_layer_count = self.array_layers;
        }
        let handle = dispatch!(create_texture_view)(self.handle, &resolved)?;
        Ok(TextureView { handle, label: resolved.label.clone() })
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_texture)(handle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextureView {
    pub(crate) handle: TextureViewHandle,
    pub label: Option<String>,
}

impl TextureView {
    pub fn handle(&self) -> TextureViewHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_texture_view)(handle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sampler {
    pub(crate) handle: SamplerHandle,
    pub label: Option<String>,
}

impl Sampler {
    pub fn handle(&self) -> SamplerHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_sampler)(handle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShaderModule {
    pub(crate) handle: ShaderModuleHandle,
    pub label: Option<String>,
}

impl ShaderModule {
    pub fn handle(&self) -> ShaderModuleHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_shader_module)(handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuerySet {
    pub(crate) handle: QuerySetHandle,
    pub kind: QueryType,
    pub count: u32,
}

impl QuerySet {
    pub fn handle(&self) -> QuerySetHandle {
        self.handle
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch_opt!(delete_query_set, handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Blas {
    pub(crate) handle: BlasHandle,
}

impl Blas {
    pub fn handle(&self) -> BlasHandle {
        self.handle
    }

    pub fn sizes(&self) -> RhiResult<BvhSizes> {
        dispatch_opt!(get_blas_sizes, self.handle)
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch_opt!(delete_blas, handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tlas {
    pub(crate) handle: TlasHandle,
}

impl Tlas {
    pub fn handle(&self) -> TlasHandle {
        self.handle
    }

    pub fn sizes(&self) -> RhiResult<BvhSizes> {
        dispatch_opt!(get_tlas_sizes, self.handle)
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch_opt!(delete_tlas, handle)
    }
}

/// Frame-scoped: recycled automatically when its frame slot is reentered.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindGroup {
    pub(crate) handle: BindGroupHandle,
}

impl BindGroup {
    pub fn handle(&self) -> BindGroupHandle {
        self.handle
    }

    pub fn valid(&self) -> bool {
        self.handle.valid()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BindGroupLayout {
    pub(crate) handle: BindGroupLayoutHandle,
}

impl BindGroupLayout {
    pub fn handle(&self) -> BindGroupLayoutHandle {
        self.handle
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_bind_group_layout)(handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineLayout {
    pub(crate) handle: PipelineLayoutHandle,
}

impl PipelineLayout {
    pub fn handle(&self) -> PipelineLayoutHandle {
        self.handle
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_pipeline_layout)(handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderPipeline {
    pub(crate) handle: RenderPipelineHandle,
    pub(crate) layout: PipelineLayoutHandle,
}

impl RenderPipeline {
    pub fn handle(&self) -> RenderPipelineHandle {
        self.handle
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_render_pipeline)(handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComputePipeline {
    pub(crate) handle: ComputePipelineHandle,
    pub(crate) layout: PipelineLayoutHandle,
}

impl ComputePipeline {
    pub fn handle(&self) -> ComputePipelineHandle {
        self.handle
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch!(delete_compute_pipeline)(handle)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RayTracingPipeline {
    pub(crate) handle: RayTracingPipelineHandle,
    pub(crate) layout: PipelineLayoutHandle,
}

impl RayTracingPipeline {
    pub fn handle(&self) -> RayTracingPipelineHandle {
        self.handle
    }

    pub fn destroy(&mut self) -> RhiResult<()> {
        let handle = self.handle;
        self.handle.invalidate();
        dispatch_opt!(delete_raytracing_pipeline, handle)
    }
}

/// Records commands against the current frame. Submittable only while the
/// frame that allocated it is current; the backend rejects anything else.
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoder {
    pub(crate) handle: CommandEncoderHandle,
    pub queue: QueueType,
}

impl CommandEncoder {
    pub fn handle(&self) -> CommandEncoderHandle {
        self.handle
    }

    pub fn wait(&self, fence: &Fence, sync: BarrierSync) -> RhiResult<()> {
        dispatch_opt!(cmd_wait_fence, self.handle, fence.handle, sync)
    }

    pub fn signal(&self, fence: &Fence, sync: BarrierSync) -> RhiResult<()> {
        dispatch_opt!(cmd_signal_fence, self.handle, fence.handle, sync)
    }

    pub fn begin_render_pass(&self, descriptor: &RenderPassDescriptor) -> RhiResult<()> {
        dispatch_opt!(cmd_begin_render_pass, self.handle, descriptor)
    }

    pub fn end_render_pass(&self) -> RhiResult<()> {
        dispatch_opt!(cmd_end_render_pass, self.handle)
    }

    pub fn set_render_pipeline(&self, pipeline: &RenderPipeline) -> RhiResult<()> {
        dispatch_opt!(cmd_set_render_pipeline, self.handle, pipeline.handle, pipeline.layout)
    }

    pub fn set_compute_pipeline(&self, pipeline: &ComputePipeline) -> RhiResult<()> {
        dispatch_opt!(cmd_set_compute_pipeline, self.handle, pipeline.handle, pipeline.layout)
    }

    pub fn set_raytracing_pipeline(&self, pipeline: &RayTracingPipeline) -> RhiResult<()> {
        dispatch_opt!(cmd_set_raytracing_pipeline, self.handle, pipeline.handle, pipeline.layout)
    }

    pub fn set_bind_group(
        &self,
        index: u32,
        bind_group: &BindGroup,
        dynamic_offsets: &[u32],
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_set_bind_group, self.handle, index, bind_group.handle, dynamic_offsets)
    }

    pub fn set_push_constants(&self, visibility: ShaderStages, offset: u32, data: &[u8]) -> RhiResult<()> {
        dispatch_opt!(cmd_set_push_constants, self.handle, visibility, offset, data)
    }

    pub fn set_index_buffer(
        &self,
        buffer: &Buffer,
        format: IndexFormat,
        offset: u64,
        size: u64,
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_set_index_buffer, self.handle, buffer.handle, format, offset, size)
    }

    pub fn set_vertex_buffer(&self, slot: u32, buffer: &Buffer, offset: u64, size: u64) -> RhiResult<()> {
        dispatch_opt!(cmd_set_vertex_buffer, self.handle, slot, buffer.handle, offset, size)
    }

    pub fn set_viewport(&self, x: f32, y: f32, w: f32, h: f32, min_depth: f32, max_depth: f32) -> RhiResult<()> {
        dispatch_opt!(cmd_set_viewport, self.handle, x, y, w, h, min_depth, max_depth)
    }

    pub fn set_scissor_rect(&self, x: u32, y: u32, w: u32, h: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_set_scissor_rect, self.handle, x, y, w, h)
    }

    pub fn set_blend_constant(&self, color: Color) -> RhiResult<()> {
        dispatch_opt!(cmd_set_blend_constant, self.handle, color)
    }

    pub fn set_stencil_reference(&self, reference: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_set_stencil_reference, self.handle, reference)
    }

    pub fn draw(&self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_draw, self.handle, vertex_count, instance_count, first_vertex, first_instance)
    }

    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_draw_indexed, self.handle, index_count, instance_count, first_index, base_vertex, first_instance)
    }

    pub fn draw_indirect(&self, buffer: &Buffer, offset: u64, draw_count: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_draw_indirect, self.handle, buffer.handle, offset, draw_count)
    }

    pub fn draw_indexed_indirect(&self, buffer: &Buffer, offset: u64, draw_count: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_draw_indexed_indirect, self.handle, buffer.handle, offset, draw_count)
    }

    pub fn dispatch_workgroups(&self, x: u32, y: u32, z: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_dispatch_workgroups, self.handle, x, y, z)
    }

    pub fn dispatch_workgroups_indirect(&self, buffer: &Buffer, offset: u64) -> RhiResult<()> {
        dispatch_opt!(cmd_dispatch_workgroups_indirect, self.handle, buffer.handle, offset)
    }

    pub fn copy_buffer_to_buffer(
        &self,
        src: &Buffer,
        src_offset: u64,
        dst: &Buffer,
        dst_offset: u64,
        size: u64,
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_copy_buffer_to_buffer, self.handle, src.handle, src_offset, dst.handle, dst_offset, size)
    }

    pub fn copy_buffer_to_texture(
        &self,
        src: &TexelCopyBufferInfo,
        dst: &TexelCopyTextureInfo,
        size: Extent3d,
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_copy_buffer_to_texture, self.handle, src, dst, size)
    }

    pub fn copy_texture_to_buffer(
        &self,
        src: &TexelCopyTextureInfo,
        dst: &TexelCopyBufferInfo,
        size: Extent3d,
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_copy_texture_to_buffer, self.handle, src, dst, size)
    }

    pub fn copy_texture_to_texture(
        &self,
        src: &TexelCopyTextureInfo,
        dst: &TexelCopyTextureInfo,
        size: Extent3d,
    ) -> RhiResult<()> {
        dispatch_opt!(cmd_copy_texture_to_texture, self.handle, src, dst, size)
    }

    pub fn clear_buffer(&self, buffer: &Buffer, offset: u64, size: u64) -> RhiResult<()> {
        dispatch_opt!(cmd_clear_buffer, self.handle, buffer.handle, offset, size)
    }

    pub fn memory_barrier(&self, barriers: &[MemoryBarrier]) -> RhiResult<()> {
        dispatch_opt!(cmd_memory_barrier, self.handle, barriers)
    }

    pub fn buffer_barrier(&self, barriers: &[BufferBarrier]) -> RhiResult<()> {
        dispatch_opt!(cmd_buffer_barrier, self.handle, barriers)
    }

    pub fn texture_barrier(&self, barriers: &[TextureBarrier]) -> RhiResult<()> {
        dispatch_opt!(cmd_texture_barrier, self.handle, barriers)
    }

    pub fn begin_occlusion_query(&self, query_index: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_begin_occlusion_query, self.handle, query_index)
    }

    pub fn end_occlusion_query(&self) -> RhiResult<()> {
        dispatch_opt!(cmd_end_occlusion_query, self.handle)
    }

    pub fn write_timestamp(&self, query_set: &QuerySet, query_index: u32) -> RhiResult<()> {
        dispatch_opt!(cmd_write_timestamp, self.handle, query_set.handle, query_index)
    }

    pub fn resolve_query_set(
        &self,
        query_set: &QuerySet,
        first_query: u32,
        query_count: u32,
        destination: &Buffer,
        destination_offset: u64,
    ) -> RhiResult<()> {
        dispatch_opt!(
            cmd_resolve_query_set,
            self.handle,
            query_set.handle,
            first_query,
            query_count,
            destination.handle,
            destination_offset
        )
    }

    pub fn insert_debug_marker(&self, label: &str) -> RhiResult<()> {
        dispatch_opt!(cmd_insert_debug_marker, self.handle, label)
    }

    pub fn push_debug_group(&self, label: &str) -> RhiResult<()> {
        dispatch_opt!(cmd_push_debug_group, self.handle, label)
    }

    pub fn pop_debug_group(&self) -> RhiResult<()> {
        dispatch_opt!(cmd_pop_debug_group, self.handle)
    }

    pub fn execute_bundles(&self, bundles: &[CommandEncoder]) -> RhiResult<()> {
        let handles: Vec<CommandEncoderHandle> = bundles.iter().map(|b| b.handle).collect();
        dispatch_opt!(cmd_execute_bundles, self.handle, &handles)
    }

    /// Close the encoder and hand it to its queue together with the
    /// accumulated wait/signal fence pairs.
    pub fn submit(self) -> RhiResult<()> {
        dispatch!(submit_command_buffer)(self.handle)
    }
}

pub(crate) struct BoundPlugin {
    pub entry: PluginEntry,
    #[cfg(feature = "dylib")]
    pub dynamic: Option<crate::api::DynamicPlugin>,
}
