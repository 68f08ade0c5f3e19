//! CPU-side conformance backend.
//!
//! Fulfills the complete required plugin table without touching a GPU:
//! buffers are byte vectors with real copy and map semantics, fences are
//! counters with real signal/wait/ready behavior, swapchains are rings of
//! plain images honoring the resize-preservation rules. Submitted work
//! executes synchronously at submit, so ordering observations made by tests
//! match what a queue would produce.

use std::sync::Mutex;

use crate::api::{AdapterReport, PluginEntry, RenderApi};
use crate::descriptors::*;
use crate::enums::*;
use crate::error::{fatal, RhiError, RhiResult};
use crate::flags::*;
use crate::handle::*;
use crate::slotmap::{PoolObject, Slotmap};

const FRAME_COUNT: u64 = 2;
const SETS_PER_POOL: u32 = 512;

// ---------------------------------------------------------------------------
// backend objects
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NullFence {
    live: bool,
    counter: u64,
    target: u64,
}

impl PoolObject for NullFence {
    fn live(&self) -> bool {
        self.live
    }
}

#[derive(Default)]
struct NullBuffer {
    data: Vec<u8>,
    usage: BufferUsage,
    mapped: Option<(u64, u64)>,
}

impl PoolObject for NullBuffer {
    fn live(&self) -> bool {
        !self.data.is_empty()
    }
}

#[derive(Default)]
struct NullTexture {
    live: bool,
    data: Vec<u8>,
    size: Extent3d,
    array_layers: u32,
    mip_level_count: u32,
    format: Option<TextureFormat>,
}

impl PoolObject for NullTexture {
    fn live(&self) -> bool {
        self.live
    }
}

#[derive(Default)]
struct NullTextureView {
    live: bool,
    texture: TextureHandle,
    extent: Extent2d,
}

impl PoolObject for NullTextureView {
    fn live(&self) -> bool {
        self.live
    }
}

#[derive(Default)]
struct NullObject {
    live: bool,
}

impl PoolObject for NullObject {
    fn live(&self) -> bool {
        self.live
    }
}

#[derive(Default)]
struct NullBindGroupLayout {
    live: bool,
    entry_count: u32,
}

impl PoolObject for NullBindGroupLayout {
    fn live(&self) -> bool {
        self.live
    }
}

#[derive(Default)]
struct NullPipeline {
    live: bool,
    layout: PipelineLayoutHandle,
}

impl PoolObject for NullPipeline {
    fn live(&self) -> bool {
        self.live
    }
}

/// One per-image entry of a surface ring.
struct SurfaceImage {
    texture: TextureHandle,
    view: TextureViewHandle,
    complete: FenceHandle,
}

#[derive(Default)]
struct NullSurface {
    live: bool,
    window: WindowHandle,
    extent: Extent2d,
    format: Option<TextureFormat>,
    images: Vec<SurfaceImage>,
    /// Keyed by logical frame index, not image index.
    available: Vec<FenceHandle>,
    current_image: Option<u32>,
}

impl PoolObject for NullSurface {
    fn live(&self) -> bool {
        self.live
    }
}

/// Deferred work recorded by an encoder, executed at submit.
enum NullCmd {
    CopyBufferToBuffer { src: BufferHandle, src_offset: u64, dst: BufferHandle, dst_offset: u64, size: u64 },
    CopyBufferToTexture { src: TexelCopyBufferInfo, dst: TexelCopyTextureInfo, size: Extent3d },
    CopyTextureToBuffer { src: TexelCopyTextureInfo, dst: TexelCopyBufferInfo, size: Extent3d },
    ClearBuffer { buffer: BufferHandle, offset: u64, size: u64 },
}

struct NullEncoder {
    live: bool,
    frame_id: u64,
    commands: Vec<NullCmd>,
    waits: Vec<FenceHandle>,
    signals: Vec<FenceHandle>,
}

/// Per-frame descriptor pool emulation: a list of pool occupancy counters
/// and a cursor, so growth behavior matches the real allocator.
#[derive(Default)]
struct NullDescriptorPool {
    pools: Vec<u32>,
    cursor: usize,
    allocated: Vec<BindGroupLayoutHandle>,
}

impl NullDescriptorPool {
    fn reset(&mut self) {
        self.cursor = 0;
        self.allocated.clear();
        for count in &mut self.pools {
            *count = 0;
        }
    }

    fn allocate(&mut self, layout: BindGroupLayoutHandle) -> BindGroupHandle {
        while self.cursor < self.pools.len() && self.pools[self.cursor] >= SETS_PER_POOL {
            self.cursor += 1;
        }
        if self.cursor >= self.pools.len() {
            self.pools.push(0);
        }
        self.pools[self.cursor] += 1;
        let handle = BindGroupHandle::new(self.allocated.len() as u32);
        self.allocated.push(layout);
        handle
    }
}

#[derive(Default)]
struct NullFrame {
    frame_id: u64,
    encoders: Vec<NullEncoder>,
    descriptor_pool: NullDescriptorPool,
    submitted_any: bool,
}

impl NullFrame {
    fn reset(&mut self, frame_id: u64) {
        self.frame_id = frame_id;
        self.encoders.clear();
        self.descriptor_pool.reset();
        self.submitted_any = false;
    }
}

struct NullState {
    frames: Vec<NullFrame>,
    current_frame_index: u64,
    in_frame: bool,
    fences: Slotmap<NullFence>,
    buffers: Slotmap<NullBuffer>,
    textures: Slotmap<NullTexture>,
    views: Slotmap<NullTextureView>,
    samplers: Slotmap<NullObject>,
    shaders: Slotmap<NullObject>,
    query_sets: Slotmap<NullObject>,
    bind_group_layouts: Slotmap<NullBindGroupLayout>,
    pipeline_layouts: Slotmap<NullObject>,
    render_pipelines: Slotmap<NullPipeline>,
    compute_pipelines: Slotmap<NullPipeline>,
    surfaces: Slotmap<NullSurface>,
}

impl NullState {
    fn new() -> Self {
        let mut frames = Vec::new();
        for _ in 0..FRAME_COUNT {
            frames.push(NullFrame::default());
        }
        Self {
            frames,
            current_frame_index: 0,
            in_frame: false,
            fences: Slotmap::new(ObjectKind::Fence, |_| {}),
            buffers: Slotmap::new(ObjectKind::Buffer, |_| {}),
            textures: Slotmap::new(ObjectKind::Texture, |_| {}),
            views: Slotmap::new(ObjectKind::TextureView, |_| {}),
            samplers: Slotmap::new(ObjectKind::Sampler, |_| {}),
            shaders: Slotmap::new(ObjectKind::ShaderModule, |_| {}),
            query_sets: Slotmap::new(ObjectKind::QuerySet, |_| {}),
            bind_group_layouts: Slotmap::new(ObjectKind::BindGroupLayout, |_| {}),
            pipeline_layouts: Slotmap::new(ObjectKind::PipelineLayout, |_| {}),
            render_pipelines: Slotmap::new(ObjectKind::RenderPipeline, |_| {}),
            compute_pipelines: Slotmap::new(ObjectKind::ComputePipeline, |_| {}),
            surfaces: Slotmap::new(ObjectKind::Surface, |_| {}),
        }
    }

    fn current_frame(&mut self) -> &mut NullFrame {
        let slot = (self.current_frame_index % FRAME_COUNT) as usize;
        &mut self.frames[slot]
    }

    fn encoder(&mut self, handle: CommandEncoderHandle) -> RhiResult<&mut NullEncoder> {
        let frame_id = self.current_frame_index;
        let frame = self.current_frame();
        debug_assert_eq!(frame.frame_id, frame_id);
        let encoder = frame
            .encoders
            .get_mut(handle.index())
            .ok_or(RhiError::HandleInvalid(ObjectKind::CommandEncoder))?;
        if !encoder.live {
            return Err(RhiError::ObjectInInvalidState(ObjectKind::CommandEncoder));
        }
        if encoder.frame_id != frame_id {
            fatal!("command encoder recorded in frame {} submitted in frame {frame_id}", encoder.frame_id);
        }
        Ok(encoder)
    }
}

static STATE: Mutex<Option<NullState>> = Mutex::new(None);

fn with_state<T>(f: impl FnOnce(&mut NullState) -> RhiResult<T>) -> RhiResult<T> {
    let mut guard = STATE.lock().unwrap();
    let state = guard.as_mut().ok_or(RhiError::NotInitialized)?;
    f(state)
}

// ---------------------------------------------------------------------------
// instance / adapter / device
// ---------------------------------------------------------------------------

fn create_instance(descriptor: &RhiDescriptor) -> RhiResult<()> {
    let mut guard = STATE.lock().unwrap();
    *guard = Some(NullState::new());
    log::debug!("null backend instance created (flags {:?})", descriptor.flags);
    Ok(())
}

fn delete_instance() {
    *STATE.lock().unwrap() = None;
}

fn create_adapter(_descriptor: &AdapterDescriptor) -> RhiResult<AdapterReport> {
    let mut report = AdapterReport::default();
    report.info.device = "prism null adapter".to_string();
    report.info.vendor = "prism".to_string();
    // the null adapter claims everything except hardware raytracing
    report.features = SupportedFeatures {
        bindless: true,
        raytracing: false,
        shader_f16: true,
        float32_blendable: true,
        float32_filterable: true,
        timestamp_query: true,
        depth_clip_control: true,
        depth32float_stencil8: true,
        indirect_first_instance: true,
        dual_source_blending: false,
        rg11b10ufloat_renderable: true,
        bgra8unorm_storage: true,
        clip_distances: true,
        subgroups: false,
        texture_compression_bc: false,
        texture_compression_etc2: false,
        texture_compression_astc: false,
    };
    report.properties.texture_row_pitch_alignment = 256;
    Ok(report)
}

fn delete_adapter() {}

fn create_device(descriptor: &DeviceDescriptor) -> RhiResult<()> {
    with_state(|_state| {
        log::debug!("null device created ({} required features)", descriptor.required_features.len());
        Ok(())
    })
}

fn delete_device() {
    let _ = with_state(|state| {
        state.surfaces.clear();
        state.buffers.clear();
        state.textures.clear();
        state.views.clear();
        state.samplers.clear();
        state.shaders.clear();
        state.query_sets.clear();
        state.bind_group_layouts.clear();
        state.pipeline_layouts.clear();
        state.render_pipelines.clear();
        state.compute_pipelines.clear();
        state.fences.clear();
        Ok(())
    });
}

fn wait_idle() -> RhiResult<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// fences
// ---------------------------------------------------------------------------

fn create_fence(descriptor: &FenceDescriptor) -> RhiResult<FenceHandle> {
    with_state(|state| {
        log::trace!("null fence created ({:?})", descriptor.kind);
        let slot = state.fences.add(NullFence { live: true, counter: 0, target: 0 });
        Ok(FenceHandle::new(slot))
    })
}

fn delete_fence(handle: FenceHandle) -> RhiResult<()> {
    with_state(|state| state.fences.remove(handle.0.value))
}

fn wait_fence(handle: FenceHandle, _timeout: u64) -> RhiResult<()> {
    // Submission completes synchronously here, so an unsatisfied wait can
    // never be satisfied later: report it as a timeout instead of hanging.
    with_state(|state| {
        let fence = state.fences.get(handle.0.value)?;
        if fence.counter >= fence.target {
            Ok(())
        } else {
            Err(RhiError::Timeout)
        }
    })
}

fn signal_fence(handle: FenceHandle, value: u64) -> RhiResult<()> {
    with_state(|state| {
        let fence = state.fences.get_mut(handle.0.value)?;
        fence.counter = fence.counter.max(value);
        Ok(())
    })
}

fn fence_ready(handle: FenceHandle) -> RhiResult<bool> {
    with_state(|state| {
        let fence = state.fences.get(handle.0.value)?;
        Ok(fence.counter >= fence.target)
    })
}

fn reset_fence(handle: FenceHandle) -> RhiResult<()> {
    with_state(|state| {
        let fence = state.fences.get_mut(handle.0.value)?;
        fence.target = fence.counter + 1;
        Ok(())
    })
}

fn fence_target(handle: FenceHandle) -> RhiResult<u64> {
    with_state(|state| Ok(state.fences.get(handle.0.value)?.target))
}

// ---------------------------------------------------------------------------
// buffers
// ---------------------------------------------------------------------------

fn create_buffer(descriptor: &BufferDescriptor) -> RhiResult<BufferHandle> {
    with_state(|state| {
        let mut buffer = NullBuffer {
            data: vec![0u8; descriptor.size as usize],
            usage: descriptor.usage,
            mapped: None,
        };
        if descriptor.mapped_at_creation {
            buffer.mapped = Some((0, descriptor.size));
        }
        Ok(BufferHandle::new(state.buffers.add(buffer)))
    })
}

fn delete_buffer(handle: BufferHandle) -> RhiResult<()> {
    with_state(|state| state.buffers.remove(handle.0.value))
}

fn map_buffer(handle: BufferHandle, mode: MapMode, offset: u64, size: u64) -> RhiResult<()> {
    with_state(|state| {
        let buffer = state.buffers.get_mut(handle.0.value)?;
        let wanted = match mode {
            MapMode::Read => BufferUsage::MAP_READ,
            MapMode::Write => BufferUsage::MAP_WRITE,
        };
        if !buffer.usage.contains(wanted) {
            return Err(RhiError::DescriptorInvalid {
                field: "usage",
                reason: "buffer is not mappable for the requested mode",
            });
        }
        let len = if size == 0 { buffer.data.len() as u64 - offset } else { size };
        buffer.mapped = Some((offset, len));
        Ok(())
    })
}

fn unmap_buffer(handle: BufferHandle) -> RhiResult<()> {
    with_state(|state| {
        state.buffers.get_mut(handle.0.value)?.mapped = None;
        Ok(())
    })
}

fn get_mapped_range(handle: BufferHandle) -> RhiResult<MappedBufferRange> {
    with_state(|state| {
        let buffer = state.buffers.get_mut(handle.0.value)?;
        let (offset, len) = buffer
            .mapped
            .ok_or(RhiError::ObjectInInvalidState(ObjectKind::Buffer))?;
        Ok(MappedBufferRange {
            ptr: unsafe { buffer.data.as_mut_ptr().add(offset as usize) },
            len: len as usize,
        })
    })
}

// ---------------------------------------------------------------------------
// textures / views / samplers / shaders / query sets
// ---------------------------------------------------------------------------

fn texture_storage_size(descriptor: &TextureDescriptor) -> usize {
    let texel = descriptor.format.texel_size().unwrap_or(0) as usize;
    let Extent3d { width, height, depth } = descriptor.size;
    texel * width as usize * height as usize * depth as usize * descriptor.array_layers as usize
}

fn create_texture(descriptor: &TextureDescriptor) -> RhiResult<TextureHandle> {
    with_state(|state| {
        let texture = NullTexture {
            live: true,
            data: vec![0u8; texture_storage_size(descriptor)],
            size: descriptor.size,
            array_layers: descriptor.array_layers,
            mip_level_count: descriptor.mip_level_count,
            format: Some(descriptor.format),
        };
        Ok(TextureHandle::new(state.textures.add(texture)))
    })
}

fn delete_texture(handle: TextureHandle) -> RhiResult<()> {
    with_state(|state| state.textures.remove(handle.0.value))
}

fn create_texture_view(
    texture: TextureHandle,
    descriptor: &TextureViewDescriptor,
) -> RhiResult<TextureViewHandle> {
    with_state(|state| {
        let parent = state.textures.get(texture.0.value)?;
        if descriptor.base_mip_level >= parent.mip_level_count.max(1) {
            return Err(RhiError::DescriptorInvalid {
                field: "base_mip_level",
                reason: "past the texture's mip chain",
            });
        }
        if descriptor.base_array_layer >= parent.array_layers.max(1) {
            return Err(RhiError::DescriptorInvalid {
                field: "base_array_layer",
                reason: "past the texture's layer range",
            });
        }
        let extent = Extent2d { width: parent.size.width, height: parent.size.height };
        let view = NullTextureView { live: true, texture, extent };
        Ok(TextureViewHandle::new(state.views.add(view)))
    })
}

fn delete_texture_view(handle: TextureViewHandle) -> RhiResult<()> {
    with_state(|state| state.views.remove(handle.0.value))
}

fn create_sampler(_descriptor: &SamplerDescriptor) -> RhiResult<SamplerHandle> {
    with_state(|state| Ok(SamplerHandle::new(state.samplers.add(NullObject { live: true }))))
}

fn delete_sampler(handle: SamplerHandle) -> RhiResult<()> {
    with_state(|state| state.samplers.remove(handle.0.value))
}

fn create_shader_module(descriptor: &ShaderModuleDescriptor) -> RhiResult<ShaderModuleHandle> {
    if descriptor.code.is_empty() {
        return Err(RhiError::DescriptorInvalid { field: "code", reason: "shader blob is empty" });
    }
    with_state(|state| Ok(ShaderModuleHandle::new(state.shaders.add(NullObject { live: true }))))
}

fn delete_shader_module(handle: ShaderModuleHandle) -> RhiResult<()> {
    with_state(|state| state.shaders.remove(handle.0.value))
}

fn create_query_set(_descriptor: &QuerySetDescriptor) -> RhiResult<QuerySetHandle> {
    with_state(|state| Ok(QuerySetHandle::new(state.query_sets.add(NullObject { live: true }))))
}

fn delete_query_set(handle: QuerySetHandle) -> RhiResult<()> {
    with_state(|state| state.query_sets.remove(handle.0.value))
}

// ---------------------------------------------------------------------------
// layouts / bind groups / pipelines
// ---------------------------------------------------------------------------

fn create_bind_group_layout(
    descriptor: &BindGroupLayoutDescriptor,
) -> RhiResult<BindGroupLayoutHandle> {
    with_state(|state| {
        let layout = NullBindGroupLayout { live: true, entry_count: descriptor.entries.len() as u32 };
        Ok(BindGroupLayoutHandle::new(state.bind_group_layouts.add(layout)))
    })
}

fn delete_bind_group_layout(handle: BindGroupLayoutHandle) -> RhiResult<()> {
    with_state(|state| state.bind_group_layouts.remove(handle.0.value))
}

fn create_pipeline_layout(descriptor: &PipelineLayoutDescriptor) -> RhiResult<PipelineLayoutHandle> {
    with_state(|state| {
        for layout in &descriptor.bind_group_layouts {
            state.bind_group_layouts.get(layout.0.value)?;
        }
        Ok(PipelineLayoutHandle::new(state.pipeline_layouts.add(NullObject { live: true })))
    })
}

fn delete_pipeline_layout(handle: PipelineLayoutHandle) -> RhiResult<()> {
    with_state(|state| state.pipeline_layouts.remove(handle.0.value))
}

fn create_bind_group(descriptor: &BindGroupDescriptor) -> RhiResult<BindGroupHandle> {
    with_state(|state| {
        let layout = state.bind_group_layouts.get(descriptor.layout.0.value)?;
        if descriptor.entries.len() as u32 > layout.entry_count {
            return Err(RhiError::DescriptorInvalid {
                field: "entries",
                reason: "more entries than the layout declares",
            });
        }
        if !state.in_frame {
            fatal!("bind group created outside a frame");
        }
        let layout = descriptor.layout;
        Ok(state.current_frame().descriptor_pool.allocate(layout))
    })
}

fn delete_bind_group(_handle: BindGroupHandle) -> RhiResult<()> {
    // frame-scoped: recycled wholesale when the frame slot is reentered
    Ok(())
}

fn create_render_pipeline(descriptor: &RenderPipelineDescriptor) -> RhiResult<RenderPipelineHandle> {
    with_state(|state| {
        state.pipeline_layouts.get(descriptor.layout.0.value)?;
        state.shaders.get(descriptor.vertex.stage.module.0.value)?;
        let pipeline = NullPipeline { live: true, layout: descriptor.layout };
        Ok(RenderPipelineHandle::new(state.render_pipelines.add(pipeline)))
    })
}

fn delete_render_pipeline(handle: RenderPipelineHandle) -> RhiResult<()> {
    with_state(|state| state.render_pipelines.remove(handle.0.value))
}

fn create_compute_pipeline(
    descriptor: &ComputePipelineDescriptor,
) -> RhiResult<ComputePipelineHandle> {
    with_state(|state| {
        state.pipeline_layouts.get(descriptor.layout.0.value)?;
        state.shaders.get(descriptor.stage.module.0.value)?;
        let pipeline = NullPipeline { live: true, layout: descriptor.layout };
        Ok(ComputePipelineHandle::new(state.compute_pipelines.add(pipeline)))
    })
}

fn delete_compute_pipeline(handle: ComputePipelineHandle) -> RhiResult<()> {
    with_state(|state| state.compute_pipelines.remove(handle.0.value))
}

// ---------------------------------------------------------------------------
// frame pacing / surfaces
// ---------------------------------------------------------------------------

fn new_frame() -> RhiResult<()> {
    with_state(|state| {
        if state.in_frame {
            fatal!("new_frame called while a frame is already current");
        }
        state.in_frame = true;
        let frame_id = state.current_frame_index;
        state.current_frame().reset(frame_id);
        Ok(())
    })
}

fn end_frame() -> RhiResult<()> {
    with_state(|state| {
        if !state.in_frame {
            fatal!("end_frame called without a current frame");
        }
        state.in_frame = false;
        state.current_frame_index += 1;
        Ok(())
    })
}

fn create_surface(descriptor: &SurfaceDescriptor) -> RhiResult<SurfaceHandle> {
    with_state(|state| {
        // a second request for the same window rebuilds in place (resize)
        let existing = state
            .surfaces
            .iter()
            .find(|(_, s)| s.window == descriptor.window)
            .map(|(slot, _)| slot);
        if let Some(slot) = existing {
            resize_surface(state, slot, descriptor)?;
            return Ok(SurfaceHandle::new(slot));
        }

        let image_count = descriptor.frames.max(2);
        let mut surface = NullSurface {
            live: true,
            window: descriptor.window,
            extent: descriptor.size,
            format: Some(descriptor.format),
            images: Vec::new(),
            available: Vec::new(),
            current_image: None,
        };
        build_surface_images(state, &mut surface, descriptor, image_count)?;
        for _ in 0..FRAME_COUNT {
            let fence = state.fences.add(NullFence { live: true, counter: 0, target: 0 });
            surface.available.push(FenceHandle::new(fence));
        }
        Ok(SurfaceHandle::new(state.surfaces.add(surface)))
    })
}

fn build_surface_images(
    state: &mut NullState,
    surface: &mut NullSurface,
    descriptor: &SurfaceDescriptor,
    image_count: u32,
) -> RhiResult<()> {
    for _ in 0..image_count {
        let texture_desc = TextureDescriptor {
            label: None,
            size: Extent3d { width: descriptor.size.width, height: descriptor.size.height, depth: 1 },
            array_layers: 1,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: descriptor.format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
        };
        let texture = NullTexture {
            live: true,
            data: vec![0u8; texture_storage_size(&texture_desc)],
            size: texture_desc.size,
            array_layers: 1,
            mip_level_count: 1,
            format: Some(descriptor.format),
        };
        let texture = TextureHandle::new(state.textures.add(texture));
        let view = NullTextureView { live: true, texture, extent: descriptor.size };
        let view = TextureViewHandle::new(state.views.add(view));
        let complete = state.fences.add(NullFence { live: true, counter: 0, target: 0 });
        surface.images.push(SurfaceImage { texture, view, complete: FenceHandle::new(complete) });
    }
    Ok(())
}

/// Views and textures are rebuilt in every case; image-available and
/// render-complete fences are preserved iff the image count is unchanged.
fn resize_surface(state: &mut NullState, slot: u32, descriptor: &SurfaceDescriptor) -> RhiResult<()> {
    let new_count = descriptor.frames.max(2);

    let (old_images, mut available, window) = {
        let surface = state.surfaces.get_mut(slot)?;
        (std::mem::take(&mut surface.images), std::mem::take(&mut surface.available), surface.window)
    };
    let old_count = old_images.len() as u32;

    let mut kept_fences = Vec::new();
    for image in old_images {
        state.textures.remove(image.texture.0.value)?;
        state.views.remove(image.view.0.value)?;
        if new_count == old_count {
            kept_fences.push(image.complete);
        } else {
            state.fences.remove(image.complete.0.value)?;
        }
    }
    if new_count != old_count {
        for fence in available.drain(..) {
            state.fences.remove(fence.0.value)?;
        }
        for _ in 0..FRAME_COUNT {
            let fence = state.fences.add(NullFence { live: true, counter: 0, target: 0 });
            available.push(FenceHandle::new(fence));
        }
    }

    let mut rebuilt = NullSurface {
        live: true,
        window,
        extent: descriptor.size,
        format: Some(descriptor.format),
        images: Vec::new(),
        available,
        current_image: None,
    };
    build_surface_images(state, &mut rebuilt, descriptor, new_count)?;
    if new_count == old_count {
        for (image, fence) in rebuilt.images.iter_mut().zip(kept_fences) {
            // keep the preserved render-complete fences, dropping the ones
            // build_surface_images just made
            state.fences.remove(image.complete.0.value)?;
            image.complete = fence;
        }
    }

    *state.surfaces.get_mut(slot)? = rebuilt;
    log::debug!("null surface {slot} rebuilt at {}x{}", descriptor.size.width, descriptor.size.height);
    Ok(())
}

fn delete_surface(handle: SurfaceHandle) -> RhiResult<()> {
    with_state(|state| {
        let (images, available) = {
            let surface = state.surfaces.get_mut(handle.0.value)?;
            (std::mem::take(&mut surface.images), std::mem::take(&mut surface.available))
        };
        for image in images {
            state.textures.remove(image.texture.0.value)?;
            state.views.remove(image.view.0.value)?;
            state.fences.remove(image.complete.0.value)?;
        }
        for fence in available {
            state.fences.remove(fence.0.value)?;
        }
        state.surfaces.remove(handle.0.value)
    })
}

fn get_surface_extent(handle: SurfaceHandle) -> RhiResult<Extent2d> {
    with_state(|state| Ok(state.surfaces.get(handle.0.value)?.extent))
}

fn get_surface_format(handle: SurfaceHandle) -> RhiResult<TextureFormat> {
    with_state(|state| {
        state
            .surfaces
            .get(handle.0.value)?
            .format
            .ok_or(RhiError::ObjectInInvalidState(ObjectKind::Surface))
    })
}

fn get_surface_image_count(handle: SurfaceHandle) -> RhiResult<u32> {
    with_state(|state| Ok(state.surfaces.get(handle.0.value)?.images.len() as u32))
}

fn acquire_next_frame(handle: SurfaceHandle) -> RhiResult<SurfaceTexture> {
    with_state(|state| {
        if !state.in_frame {
            fatal!("acquire_next_frame called without a current frame");
        }
        let frame_index = state.current_frame_index;
        let surface = state.surfaces.get_mut(handle.0.value)?;
        if surface.current_image.is_some() {
            fatal!("acquire_next_frame called with an un-presented image outstanding");
        }
        let image_count = surface.images.len() as u64;
        let image_index = (frame_index % image_count) as u32;
        surface.current_image = Some(image_index);

        let available = surface.available[(frame_index % FRAME_COUNT) as usize];
        let image = &surface.images[image_index as usize];
        let out = SurfaceTexture {
            surface: handle,
            texture: image.texture,
            view: image.view,
            available,
            complete: image.complete,
            suboptimal: false,
        };
        // consume the image-available fence for this logical frame
        let fence = state.fences.get_mut(available.0.value)?;
        fence.target = fence.counter + 1;
        Ok(out)
    })
}

fn present_curr_frame(handle: SurfaceHandle) -> RhiResult<()> {
    with_state(|state| {
        let frame_index = state.current_frame_index;
        if !state.current_frame().submitted_any {
            log::trace!("presenting a frame with no submissions");
        }
        let surface = state.surfaces.get_mut(handle.0.value)?;
        let Some(image_index) = surface.current_image.take() else {
            fatal!("present called without a matching acquire");
        };
        let available = surface.available[(frame_index % FRAME_COUNT) as usize];
        let complete = surface.images[image_index as usize].complete;

        // nothing submitted this frame: stand in for the dummy present
        // submission by completing the fence pair directly
        let fence = state.fences.get_mut(available.0.value)?;
        fence.counter = fence.target;
        let fence = state.fences.get_mut(complete.0.value)?;
        fence.counter = fence.target;
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// command recording
// ---------------------------------------------------------------------------

fn create_command_buffer(_descriptor: &CommandBufferDescriptor) -> RhiResult<CommandEncoderHandle> {
    with_state(|state| {
        if !state.in_frame {
            fatal!("command buffer created outside a frame");
        }
        let frame_id = state.current_frame_index;
        let frame = state.current_frame();
        let handle = CommandEncoderHandle::new(frame.encoders.len() as u32);
        frame.encoders.push(NullEncoder {
            live: true,
            frame_id,
            commands: Vec::new(),
            waits: Vec::new(),
            signals: Vec::new(),
        });
        Ok(handle)
    })
}

fn create_command_bundle(descriptor: &CommandBundleDescriptor) -> RhiResult<CommandEncoderHandle> {
    create_command_buffer(&CommandBufferDescriptor {
        label: descriptor.label.clone(),
        queue: descriptor.queue,
    })
}

fn submit_command_buffer(handle: CommandEncoderHandle) -> RhiResult<()> {
    with_state(|state| {
        let encoder = state.encoder(handle)?;
        encoder.live = false;
        let commands = std::mem::take(&mut encoder.commands);
        let waits = std::mem::take(&mut encoder.waits);
        let signals = std::mem::take(&mut encoder.signals);
        state.current_frame().submitted_any = true;

        for fence in waits {
            let fence = state.fences.get(fence.0.value)?;
            if fence.counter < fence.target {
                // a real queue would stall here; synchronous execution means
                // the signal this wait depends on was already submitted
                log::warn!("null submit waiting on an unsignaled fence");
            }
        }
        for command in commands {
            execute(state, command)?;
        }
        for fence in signals {
            let fence = state.fences.get_mut(fence.0.value)?;
            fence.counter = fence.counter.max(fence.target);
        }
        Ok(())
    })
}

fn execute(state: &mut NullState, command: NullCmd) -> RhiResult<()> {
    match command {
        NullCmd::CopyBufferToBuffer { src, src_offset, dst, dst_offset, size } => {
            let bytes = {
                let src = state.buffers.get(src.0.value)?;
                src.data[src_offset as usize..(src_offset + size) as usize].to_vec()
            };
            let dst = state.buffers.get_mut(dst.0.value)?;
            dst.data[dst_offset as usize..(dst_offset + size) as usize].copy_from_slice(&bytes);
        }
        NullCmd::CopyBufferToTexture { src, dst, size } => {
            let texel = {
                let texture = state.textures.get(dst.texture.0.value)?;
                texture.format.and_then(|f| f.texel_size()).unwrap_or(0) as u64
            };
            let rows = copy_rows(state, &src, size, texel)?;
            let texture = state.textures.get_mut(dst.texture.0.value)?;
            let row_bytes = size.width as usize * texel as usize;
            let tex_row_bytes = texture.size.width as usize * texel as usize;
            for (row, bytes) in rows.into_iter().enumerate() {
                let y = dst.origin.y as usize + row;
                let start = y * tex_row_bytes + dst.origin.x as usize * texel as usize;
                texture.data[start..start + row_bytes].copy_from_slice(&bytes);
            }
        }
        NullCmd::CopyTextureToBuffer { src, dst, size } => {
            let (rows, texel) = {
                let texture = state.textures.get(src.texture.0.value)?;
                let texel = texture.format.and_then(|f| f.texel_size()).unwrap_or(0) as usize;
                let row_bytes = size.width as usize * texel;
                let tex_row_bytes = texture.size.width as usize * texel;
                let mut rows = Vec::new();
                for row in 0..size.height as usize {
                    let y = src.origin.y as usize + row;
                    let start = y * tex_row_bytes + src.origin.x as usize * texel;
                    rows.push(texture.data[start..start + row_bytes].to_vec());
                }
                (rows, texel)
            };
            let buffer = state.buffers.get_mut(dst.buffer.0.value)?;
            let row_bytes = size.width as usize * texel;
            for (row, bytes) in rows.into_iter().enumerate() {
                let start = dst.offset as usize + row * dst.bytes_per_row as usize;
                buffer.data[start..start + row_bytes].copy_from_slice(&bytes);
            }
        }
        NullCmd::ClearBuffer { buffer, offset, size } => {
            let buffer = state.buffers.get_mut(buffer.0.value)?;
            let end = if size == 0 { buffer.data.len() } else { (offset + size) as usize };
            buffer.data[offset as usize..end].fill(0);
        }
    }
    Ok(())
}

fn copy_rows(
    state: &mut NullState,
    src: &TexelCopyBufferInfo,
    size: Extent3d,
    texel: u64,
) -> RhiResult<Vec<Vec<u8>>> {
    let buffer = state.buffers.get(src.buffer.0.value)?;
    let row_bytes = (size.width * texel as u32) as usize;
    let mut rows = Vec::new();
    for row in 0..size.height as usize {
        let start = src.offset as usize + row * src.bytes_per_row as usize;
        rows.push(buffer.data[start..start + row_bytes].to_vec());
    }
    Ok(rows)
}

fn record(handle: CommandEncoderHandle, command: NullCmd) -> RhiResult<()> {
    with_state(|state| {
        state.encoder(handle)?.commands.push(command);
        Ok(())
    })
}

fn cmd_wait_fence(handle: CommandEncoderHandle, fence: FenceHandle, _sync: BarrierSync) -> RhiResult<()> {
    with_state(|state| {
        state.fences.get(fence.0.value)?;
        state.encoder(handle)?.waits.push(fence);
        Ok(())
    })
}

fn cmd_signal_fence(handle: CommandEncoderHandle, fence: FenceHandle, _sync: BarrierSync) -> RhiResult<()> {
    with_state(|state| {
        state.fences.get(fence.0.value)?;
        state.encoder(handle)?.signals.push(fence);
        Ok(())
    })
}

fn cmd_noop(handle: CommandEncoderHandle) -> RhiResult<()> {
    with_state(|state| {
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_begin_render_pass(handle: CommandEncoderHandle, descriptor: &RenderPassDescriptor) -> RhiResult<()> {
    with_state(|state| {
        for attachment in &descriptor.color_attachments {
            let view = state.views.get(attachment.view.0.value)?;
            let parent = view.texture;
            let extent = view.extent;
            state.textures.get(parent.0.value)?;
            if extent.width == 0 || extent.height == 0 {
                return Err(RhiError::ObjectInInvalidState(ObjectKind::TextureView));
            }
        }
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_end_render_pass(handle: CommandEncoderHandle) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_set_render_pipeline(
    handle: CommandEncoderHandle,
    pipeline: RenderPipelineHandle,
    _layout: PipelineLayoutHandle,
) -> RhiResult<()> {
    with_state(|state| {
        let layout = state.render_pipelines.get(pipeline.0.value)?.layout;
        state.pipeline_layouts.get(layout.0.value)?;
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_set_compute_pipeline(
    handle: CommandEncoderHandle,
    pipeline: ComputePipelineHandle,
    _layout: PipelineLayoutHandle,
) -> RhiResult<()> {
    with_state(|state| {
        let layout = state.compute_pipelines.get(pipeline.0.value)?.layout;
        state.pipeline_layouts.get(layout.0.value)?;
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_set_bind_group(
    handle: CommandEncoderHandle,
    _index: u32,
    bind_group: BindGroupHandle,
    _dynamic_offsets: &[u32],
) -> RhiResult<()> {
    with_state(|state| {
        let in_pool = state.current_frame().descriptor_pool.allocated.len() > bind_group.index();
        if !in_pool {
            return Err(RhiError::HandleInvalid(ObjectKind::BindGroup));
        }
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_set_push_constants(
    handle: CommandEncoderHandle,
    _visibility: ShaderStages,
    _offset: u32,
    _data: &[u8],
) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_set_index_buffer(
    handle: CommandEncoderHandle,
    buffer: BufferHandle,
    _format: IndexFormat,
    _offset: u64,
    _size: u64,
) -> RhiResult<()> {
    with_state(|state| {
        state.buffers.get(buffer.0.value)?;
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_set_vertex_buffer(
    handle: CommandEncoderHandle,
    _slot: u32,
    buffer: BufferHandle,
    _offset: u64,
    _size: u64,
) -> RhiResult<()> {
    with_state(|state| {
        state.buffers.get(buffer.0.value)?;
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_set_viewport(handle: CommandEncoderHandle, _x: f32, _y: f32, _w: f32, _h: f32, _min: f32, _max: f32) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_set_scissor_rect(handle: CommandEncoderHandle, _x: u32, _y: u32, _w: u32, _h: u32) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_set_blend_constant(handle: CommandEncoderHandle, _color: Color) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_set_stencil_reference(handle: CommandEncoderHandle, _reference: u32) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_draw(handle: CommandEncoderHandle, _vc: u32, _ic: u32, _fv: u32, _fi: u32) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_draw_indexed(handle: CommandEncoderHandle, _ic: u32, _inst: u32, _fi: u32, _bv: i32, _first: u32) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_draw_indirect(handle: CommandEncoderHandle, buffer: BufferHandle, _offset: u64, _count: u32) -> RhiResult<()> {
    with_state(|state| {
        state.buffers.get(buffer.0.value)?;
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_dispatch_workgroups(handle: CommandEncoderHandle, _x: u32, _y: u32, _z: u32) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_dispatch_workgroups_indirect(handle: CommandEncoderHandle, buffer: BufferHandle, _offset: u64) -> RhiResult<()> {
    cmd_draw_indirect(handle, buffer, 0, 0)
}

fn cmd_copy_buffer_to_buffer(
    handle: CommandEncoderHandle,
    src: BufferHandle,
    src_offset: u64,
    dst: BufferHandle,
    dst_offset: u64,
    size: u64,
) -> RhiResult<()> {
    record(handle, NullCmd::CopyBufferToBuffer { src, src_offset, dst, dst_offset, size })
}

fn cmd_copy_buffer_to_texture(
    handle: CommandEncoderHandle,
    src: &TexelCopyBufferInfo,
    dst: &TexelCopyTextureInfo,
    size: Extent3d,
) -> RhiResult<()> {
    record(handle, NullCmd::CopyBufferToTexture { src: *src, dst: *dst, size })
}

fn cmd_copy_texture_to_buffer(
    handle: CommandEncoderHandle,
    src: &TexelCopyTextureInfo,
    dst: &TexelCopyBufferInfo,
    size: Extent3d,
) -> RhiResult<()> {
    record(handle, NullCmd::CopyTextureToBuffer { src: *src, dst: *dst, size })
}

fn cmd_copy_texture_to_texture(
    handle: CommandEncoderHandle,
    _src: &TexelCopyTextureInfo,
    _dst: &TexelCopyTextureInfo,
    _size: Extent3d,
) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_clear_buffer(handle: CommandEncoderHandle, buffer: BufferHandle, offset: u64, size: u64) -> RhiResult<()> {
    record(handle, NullCmd::ClearBuffer { buffer, offset, size })
}

fn cmd_memory_barrier(handle: CommandEncoderHandle, _barriers: &[MemoryBarrier]) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_buffer_barrier(handle: CommandEncoderHandle, barriers: &[BufferBarrier]) -> RhiResult<()> {
    with_state(|state| {
        for barrier in barriers {
            state.buffers.get(barrier.buffer.0.value)?;
        }
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_texture_barrier(handle: CommandEncoderHandle, barriers: &[TextureBarrier]) -> RhiResult<()> {
    with_state(|state| {
        for barrier in barriers {
            state.textures.get(barrier.texture.0.value)?;
        }
        state.encoder(handle)?;
        Ok(())
    })
}

fn cmd_insert_debug_marker(handle: CommandEncoderHandle, _label: &str) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_push_debug_group(handle: CommandEncoderHandle, _label: &str) -> RhiResult<()> {
    cmd_noop(handle)
}

fn cmd_pop_debug_group(handle: CommandEncoderHandle) -> RhiResult<()> {
    cmd_noop(handle)
}

// ---------------------------------------------------------------------------
// plugin entry
// ---------------------------------------------------------------------------

fn prepare() {}

fn cleanup() {
    *STATE.lock().unwrap() = None;
}

fn create() -> RenderApi {
    RenderApi {
        create_instance: Some(create_instance),
        delete_instance: Some(delete_instance),
        create_adapter: Some(create_adapter),
        delete_adapter: Some(delete_adapter),
        create_device: Some(create_device),
        delete_device: Some(delete_device),
        wait_idle: Some(wait_idle),
        create_surface: Some(create_surface),
        delete_surface: Some(delete_surface),
        get_surface_extent: Some(get_surface_extent),
        get_surface_format: Some(get_surface_format),
        get_surface_image_count: Some(get_surface_image_count),
        new_frame: Some(new_frame),
        end_frame: Some(end_frame),
        acquire_next_frame: Some(acquire_next_frame),
        present_curr_frame: Some(present_curr_frame),
        create_fence: Some(create_fence),
        delete_fence: Some(delete_fence),
        wait_fence: Some(wait_fence),
        signal_fence: Some(signal_fence),
        fence_ready: Some(fence_ready),
        reset_fence: Some(reset_fence),
        fence_target: Some(fence_target),
        create_buffer: Some(create_buffer),
        delete_buffer: Some(delete_buffer),
        map_buffer: Some(map_buffer),
        unmap_buffer: Some(unmap_buffer),
        get_mapped_range: Some(get_mapped_range),
        create_texture: Some(create_texture),
        delete_texture: Some(delete_texture),
        create_texture_view: Some(create_texture_view),
        delete_texture_view: Some(delete_texture_view),
        create_sampler: Some(create_sampler),
        delete_sampler: Some(delete_sampler),
        create_shader_module: Some(create_shader_module),
        delete_shader_module: Some(delete_shader_module),
        create_query_set: Some(create_query_set),
        delete_query_set: Some(delete_query_set),
        create_blas: None,
        delete_blas: None,
        get_blas_sizes: None,
        create_tlas: None,
        delete_tlas: None,
        get_tlas_sizes: None,
        create_bind_group_layout: Some(create_bind_group_layout),
        delete_bind_group_layout: Some(delete_bind_group_layout),
        create_pipeline_layout: Some(create_pipeline_layout),
        delete_pipeline_layout: Some(delete_pipeline_layout),
        create_bind_group: Some(create_bind_group),
        delete_bind_group: Some(delete_bind_group),
        create_render_pipeline: Some(create_render_pipeline),
        delete_render_pipeline: Some(delete_render_pipeline),
        create_compute_pipeline: Some(create_compute_pipeline),
        delete_compute_pipeline: Some(delete_compute_pipeline),
        create_raytracing_pipeline: None,
        delete_raytracing_pipeline: None,
        create_command_buffer: Some(create_command_buffer),
        create_command_bundle: Some(create_command_bundle),
        submit_command_buffer: Some(submit_command_buffer),
        cmd_wait_fence: Some(cmd_wait_fence),
        cmd_signal_fence: Some(cmd_signal_fence),
        cmd_memory_barrier: Some(cmd_memory_barrier),
        cmd_buffer_barrier: Some(cmd_buffer_barrier),
        cmd_texture_barrier: Some(cmd_texture_barrier),
        cmd_begin_render_pass: Some(cmd_begin_render_pass),
        cmd_end_render_pass: Some(cmd_end_render_pass),
        cmd_set_render_pipeline: Some(cmd_set_render_pipeline),
        cmd_set_compute_pipeline: Some(cmd_set_compute_pipeline),
        cmd_set_raytracing_pipeline: None,
        cmd_set_bind_group: Some(cmd_set_bind_group),
        cmd_set_push_constants: Some(cmd_set_push_constants),
        cmd_set_index_buffer: Some(cmd_set_index_buffer),
        cmd_set_vertex_buffer: Some(cmd_set_vertex_buffer),
        cmd_set_viewport: Some(cmd_set_viewport),
        cmd_set_scissor_rect: Some(cmd_set_scissor_rect),
        cmd_set_blend_constant: Some(cmd_set_blend_constant),
        cmd_set_stencil_reference: Some(cmd_set_stencil_reference),
        cmd_draw: Some(cmd_draw),
        cmd_draw_indexed: Some(cmd_draw_indexed),
        cmd_draw_indirect: Some(cmd_draw_indirect),
        cmd_draw_indexed_indirect: Some(cmd_draw_indirect),
        cmd_dispatch_workgroups: Some(cmd_dispatch_workgroups),
        cmd_dispatch_workgroups_indirect: Some(cmd_dispatch_workgroups_indirect),
        cmd_copy_buffer_to_buffer: Some(cmd_copy_buffer_to_buffer),
        cmd_copy_buffer_to_texture: Some(cmd_copy_buffer_to_texture),
        cmd_copy_texture_to_buffer: Some(cmd_copy_texture_to_buffer),
        cmd_copy_texture_to_texture: Some(cmd_copy_texture_to_texture),
        cmd_clear_buffer: Some(cmd_clear_buffer),
        cmd_begin_occlusion_query: None,
        cmd_end_occlusion_query: None,
        cmd_write_timestamp: None,
        cmd_resolve_query_set: None,
        cmd_insert_debug_marker: Some(cmd_insert_debug_marker),
        cmd_push_debug_group: Some(cmd_push_debug_group),
        cmd_pop_debug_group: Some(cmd_pop_debug_group),
        cmd_execute_bundles: None,
    }
}

pub(crate) const PLUGIN: PluginEntry = PluginEntry { prepare, create, cleanup };
