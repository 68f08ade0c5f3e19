//! Descriptors and plain-data types crossing the plugin boundary.
//!
//! Everything here is backend-agnostic by construction: field order, defaults
//! and sentinel values are identical no matter which backend consumes them.
//! A size or count of zero means "whole resource" wherever a range is taken.

use crate::enums::*;
use crate::flags::*;
use crate::handle::*;

/// Opaque native window pointers. The backend consumes whichever field its
/// platform needs (HWND, xcb window, CAMetalLayer); the frontend never
/// interprets them. All-zero means headless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowHandle {
    pub window: usize,
    pub display: usize,
    pub native: usize,
}

impl WindowHandle {
    pub fn is_headless(&self) -> bool {
        self.window == 0 && self.display == 0 && self.native == 0
    }
}

#[cfg(feature = "window")]
impl WindowHandle {
    /// Bridge from the windowing ecosystem. Only the fields the current
    /// platform populates are carried over.
    pub fn from_raw(
        window: raw_window_handle::RawWindowHandle,
        display: raw_window_handle::RawDisplayHandle,
    ) -> Self {
        use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
        let mut out = Self::default();
        match window {
            RawWindowHandle::Win32(w) => {
                out.window = w.hwnd.get() as usize;
                out.native = w.hinstance.map(|h| h.get() as usize).unwrap_or(0);
            }
            RawWindowHandle::Xcb(w) => out.window = w.window.get() as usize,
            RawWindowHandle::Xlib(w) => out.window = w.window as usize,
            RawWindowHandle::AppKit(w) => out.window = w.ns_view.as_ptr() as usize,
            RawWindowHandle::Wayland(w) => out.window = w.surface.as_ptr() as usize,
            _ => {}
        }
        match display {
            RawDisplayHandle::Xcb(d) => {
                out.display = d.connection.map(|c| c.as_ptr() as usize).unwrap_or(0)
            }
            RawDisplayHandle::Xlib(d) => {
                out.display = d.display.map(|c| c.as_ptr() as usize).unwrap_or(0)
            }
            RawDisplayHandle::Wayland(d) => out.display = d.display.as_ptr() as usize,
            _ => {}
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Origin3d {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Default for Extent3d {
    fn default() -> Self {
        Self { width: 1, height: 1, depth: 1 }
    }
}

/// Init-time configuration for the whole RHI.
#[derive(Debug, Clone, Default)]
pub struct RhiDescriptor {
    pub backend: Option<Backend>,
    pub flags: RhiFlags,
    pub window: WindowHandle,
}

#[derive(Debug, Clone, Default)]
pub struct AdapterDescriptor {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceDescriptor {
    pub label: Option<String>,
    pub required_features: Vec<FeatureName>,
}

#[derive(Debug, Clone)]
pub struct SurfaceDescriptor {
    pub label: Option<String>,
    pub window: WindowHandle,
    pub size: Extent2d,
    /// Requested logical frame count; the swapchain clamps to at least 2.
    pub frames: u32,
    pub format: TextureFormat,
    pub present_mode: PresentMode,
}

impl Default for SurfaceDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            window: WindowHandle::default(),
            size: Extent2d::default(),
            frames: 2,
            format: TextureFormat::Bgra8UnormSrgb,
            present_mode: PresentMode::Fifo,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
    pub mapped_at_creation: bool,
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub size: Extent3d,
    pub array_layers: u32,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            array_layers: 1,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::empty(),
        }
    }
}

/// Zero counts default from the parent texture at creation time.
#[derive(Debug, Clone, Default)]
pub struct TextureViewDescriptor {
    pub label: Option<String>,
    pub format: Option<TextureFormat>,
    pub dimension: Option<TextureViewDimension>,
    pub aspect: TextureAspect,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: Option<CompareFunction>,
    pub max_anisotropy: u16,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            max_anisotropy: 1,
        }
    }
}

/// The blob is copied verbatim; the core does not validate contents.
#[derive(Debug, Clone, Default)]
pub struct ShaderModuleDescriptor {
    pub label: Option<String>,
    pub kind: ShaderBlobKind,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct QuerySetDescriptor {
    pub label: Option<String>,
    pub kind: QueryType,
    pub count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FenceDescriptor {
    pub label: Option<String>,
    pub kind: FenceKind,
}

// ---------------------------------------------------------------------------
// bind groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferBindingLayout {
    pub ty: BufferBindingType,
    pub has_dynamic_offset: bool,
    pub min_binding_size: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerBindingLayout {
    pub ty: SamplerBindingType,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextureBindingLayout {
    pub sample_type: TextureSampleType,
    pub view_dimension: TextureViewDimension,
    pub multisampled: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct StorageTextureBindingLayout {
    pub access: StorageTextureAccess,
    pub format: TextureFormat,
    pub view_dimension: TextureViewDimension,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BvhBindingLayout {
    pub vertex_return: bool,
}

/// Per-binding payload, discriminated by [`BindingResourceType`]. Replaces
/// the raw unions of other language bindings with a tagged sum.
#[derive(Debug, Clone, Copy)]
pub enum BindingLayout {
    Buffer(BufferBindingLayout),
    Sampler(SamplerBindingLayout),
    Texture(TextureBindingLayout),
    StorageTexture(StorageTextureBindingLayout),
    AccelerationStructure(BvhBindingLayout),
}

impl BindingLayout {
    pub fn resource_type(&self) -> BindingResourceType {
        match self {
            BindingLayout::Buffer(_) => BindingResourceType::Buffer,
            BindingLayout::Sampler(_) => BindingResourceType::Sampler,
            BindingLayout::Texture(_) => BindingResourceType::Texture,
            BindingLayout::StorageTexture(_) => BindingResourceType::StorageTexture,
            BindingLayout::AccelerationStructure(_) => BindingResourceType::AccelerationStructure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    /// Greater than 1 declares a binding array; the bindless tail binding of
    /// a bindless layout is variable-count up to this value.
    pub count: u32,
    pub layout: BindingLayout,
}

#[derive(Debug, Clone, Default)]
pub struct BindGroupLayoutDescriptor {
    pub label: Option<String>,
    pub entries: Vec<BindGroupLayoutEntry>,
    /// Opt-in: the last binding becomes variable-count with
    /// partially-bound + update-after-bind semantics.
    pub bindless: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferBinding {
    pub buffer: BufferHandle,
    pub offset: u64,
    /// Zero binds the whole buffer.
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum BindingResource {
    Buffer(BufferBinding),
    Sampler(SamplerHandle),
    Texture(TextureViewHandle),
    StorageTexture(TextureViewHandle),
    AccelerationStructure(TlasHandle),
}

#[derive(Debug, Clone)]
pub struct BindGroupEntry {
    pub binding: u32,
    /// Array element for binding arrays / bindless tails.
    pub index: u32,
    pub resource: BindingResource,
}

#[derive(Debug, Clone, Default)]
pub struct BindGroupDescriptor {
    pub label: Option<String>,
    pub layout: BindGroupLayoutHandle,
    pub entries: Vec<BindGroupEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutDescriptor {
    pub label: Option<String>,
    /// Group index = position in this list.
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub push_constant_size: u32,
}

// ---------------------------------------------------------------------------
// pipelines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ProgrammableStage {
    pub module: ShaderModuleHandle,
    pub entry_point: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

#[derive(Debug, Clone, Default)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Clone, Default)]
pub struct VertexState {
    pub stage: ProgrammableStage,
    pub buffers: Vec<VertexBufferLayout>,
}

#[derive(Debug, Clone, Copy)]
pub struct BlendComponent {
    pub operation: BlendOperation,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            operation: BlendOperation::Add,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

#[derive(Debug, Clone, Copy)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: Option<BlendState>,
    pub write_mask: ColorWrites,
}

#[derive(Debug, Clone)]
pub struct FragmentState {
    pub stage: ProgrammableStage,
    pub targets: Vec<ColorTargetState>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    pub strip_index_format: IndexFormat,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
    /// Requires the DEPTH_CLIP_CONTROL feature.
    pub unclipped_depth: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StencilFaceState {
    pub compare: CompareFunction,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

impl StencilFaceState {
    /// A face participates in the stencil test iff any op is non-KEEP or the
    /// compare is non-ALWAYS.
    pub fn needs_stencil_test(&self) -> bool {
        self.compare != CompareFunction::Always
            || self.fail_op != StencilOperation::Keep
            || self.depth_fail_op != StencilOperation::Keep
            || self.pass_op != StencilOperation::Keep
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
    pub depth_bias: i32,
    pub depth_bias_slope_scale: f32,
    pub depth_bias_clamp: f32,
}

impl DepthStencilState {
    pub fn needs_depth_test(&self) -> bool {
        self.depth_compare != CompareFunction::Always || self.depth_write_enabled
    }

    pub fn needs_stencil_test(&self) -> bool {
        self.stencil_front.needs_stencil_test() || self.stencil_back.needs_stencil_test()
    }
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            format: TextureFormat::Depth32Float,
            depth_write_enabled: false,
            depth_compare: CompareFunction::Always,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_read_mask: 0xFFFF_FFFF,
            stencil_write_mask: 0xFFFF_FFFF,
            depth_bias: 0,
            depth_bias_slope_scale: 0.0,
            depth_bias_clamp: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MultisampleState {
    pub count: u32,
    pub mask: u32,
    pub alpha_to_coverage_enabled: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self { count: 1, mask: 0xFFFF_FFFF, alpha_to_coverage_enabled: false }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub layout: PipelineLayoutHandle,
    pub vertex: VertexState,
    pub fragment: Option<FragmentState>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multisample: MultisampleState,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor {
    pub label: Option<String>,
    pub layout: PipelineLayoutHandle,
    pub stage: ProgrammableStage,
}

/// Declared so callers compile against a stable API; backends may answer
/// `NotImplemented`.
#[derive(Debug, Clone, Default)]
pub struct RayTracingPipelineDescriptor {
    pub label: Option<String>,
    pub layout: PipelineLayoutHandle,
    pub stages: Vec<ProgrammableStage>,
    pub max_recursion_depth: u32,
}

// ---------------------------------------------------------------------------
// acceleration structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BlasTriangleGeometrySize {
    pub vertex_format: VertexFormat,
    pub index_format: IndexFormat,
    pub vertex_count: u32,
    pub index_count: u32,
    pub flags: BvhGeometryFlags,
}

#[derive(Debug, Clone, Default)]
pub struct BlasDescriptor {
    pub label: Option<String>,
    pub flags: BvhFlags,
    pub geometry_sizes: Vec<BlasTriangleGeometrySize>,
}

#[derive(Debug, Clone, Default)]
pub struct TlasDescriptor {
    pub label: Option<String>,
    pub flags: BvhFlags,
    pub max_instance_count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BvhSizes {
    pub bvh_size: u64,
    pub build_size: u64,
    pub update_size: u64,
}

// ---------------------------------------------------------------------------
// command recording
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CommandBufferDescriptor {
    pub label: Option<String>,
    pub queue: QueueType,
}

#[derive(Debug, Clone, Default)]
pub struct CommandBundleDescriptor {
    pub label: Option<String>,
    pub queue: QueueType,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassColorAttachment {
    pub view: TextureViewHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassDepthStencilAttachment {
    pub view: TextureViewHandle,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub depth_clear_value: f32,
    pub depth_read_only: bool,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub stencil_clear_value: u32,
    pub stencil_read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<RenderPassColorAttachment>,
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
}

/// Buffer side of a buffer<->texture copy. `bytes_per_row` is in bytes and
/// must be a multiple of the adapter's `texture_row_pitch_alignment`;
/// `rows_per_image` is in texel rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexelCopyBufferInfo {
    pub buffer: BufferHandle,
    pub offset: u64,
    pub bytes_per_row: u32,
    pub rows_per_image: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct TexelCopyTextureInfo {
    pub texture: TextureHandle,
    pub mip_level: u32,
    pub origin: Origin3d,
    pub aspect: TextureAspect,
}

impl Default for TexelCopyTextureInfo {
    fn default() -> Self {
        Self {
            texture: TextureHandle::default(),
            mip_level: 0,
            origin: Origin3d::default(),
            aspect: TextureAspect::ALL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextureSubresourceRange {
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBarrier {
    pub src_sync: BarrierSync,
    pub dst_sync: BarrierSync,
    pub src_access: BarrierAccess,
    pub dst_access: BarrierAccess,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferBarrier {
    pub src_sync: BarrierSync,
    pub dst_sync: BarrierSync,
    pub src_access: BarrierAccess,
    pub dst_access: BarrierAccess,
    pub buffer: BufferHandle,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextureBarrier {
    pub src_sync: BarrierSync,
    pub dst_sync: BarrierSync,
    pub src_access: BarrierAccess,
    pub dst_access: BarrierAccess,
    pub src_layout: BarrierLayout,
    pub dst_layout: BarrierLayout,
    pub texture: TextureHandle,
    pub subresources: TextureSubresourceRange,
}

// ---------------------------------------------------------------------------
// adapter introspection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AdapterInfo {
    pub architecture: String,
    pub description: String,
    pub device: String,
    pub vendor: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SupportedFeatures {
    pub bindless: bool,
    pub raytracing: bool,
    pub shader_f16: bool,
    pub float32_blendable: bool,
    pub float32_filterable: bool,
    pub timestamp_query: bool,
    pub depth_clip_control: bool,
    pub depth32float_stencil8: bool,
    pub indirect_first_instance: bool,
    pub dual_source_blending: bool,
    pub rg11b10ufloat_renderable: bool,
    pub bgra8unorm_storage: bool,
    pub clip_distances: bool,
    pub subgroups: bool,
    pub texture_compression_bc: bool,
    pub texture_compression_etc2: bool,
    pub texture_compression_astc: bool,
}

impl SupportedFeatures {
    pub fn supports(&self, feature: FeatureName) -> bool {
        match feature {
            FeatureName::Bindless => self.bindless,
            FeatureName::Raytracing => self.raytracing,
            FeatureName::ShaderF16 => self.shader_f16,
            FeatureName::Float32Blendable => self.float32_blendable,
            FeatureName::Float32Filterable => self.float32_filterable,
            FeatureName::TimestampQuery => self.timestamp_query,
            FeatureName::DepthClipControl => self.depth_clip_control,
            FeatureName::Depth32FloatStencil8 => self.depth32float_stencil8,
            FeatureName::IndirectFirstInstance => self.indirect_first_instance,
            FeatureName::DualSourceBlending => self.dual_source_blending,
            FeatureName::Rg11b10UfloatRenderable => self.rg11b10ufloat_renderable,
            FeatureName::Bgra8UnormStorage => self.bgra8unorm_storage,
            FeatureName::ClipDistances => self.clip_distances,
            FeatureName::Subgroups => self.subgroups,
            FeatureName::TextureCompressionBc => self.texture_compression_bc,
            FeatureName::TextureCompressionEtc2 => self.texture_compression_etc2,
            FeatureName::TextureCompressionAstc => self.texture_compression_astc,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupportedLimits {
    pub max_texture_dimension_1d: u32,
    pub max_texture_dimension_2d: u32,
    pub max_texture_dimension_3d: u32,
    pub max_texture_array_layers: u32,
    pub max_bind_groups: u32,
    pub max_bindings_per_bind_group: u32,
    pub max_dynamic_uniform_buffers_per_pipeline_layout: u32,
    pub max_dynamic_storage_buffers_per_pipeline_layout: u32,
    pub max_sampled_textures_per_shader_stage: u32,
    pub max_samplers_per_shader_stage: u32,
    pub max_storage_buffers_per_shader_stage: u32,
    pub max_storage_textures_per_shader_stage: u32,
    pub max_uniform_buffers_per_shader_stage: u32,
    pub max_uniform_buffer_binding_size: u32,
    pub max_storage_buffer_binding_size: u32,
    pub min_uniform_buffer_offset_alignment: u32,
    pub min_storage_buffer_offset_alignment: u32,
    pub max_vertex_buffers: u32,
    pub max_buffer_size: u64,
    pub max_vertex_attributes: u32,
    pub max_vertex_buffer_array_stride: u32,
    pub max_color_attachments: u32,
    pub max_compute_invocations_per_workgroup: u32,
    pub max_compute_workgroup_size_x: u32,
    pub max_compute_workgroup_size_y: u32,
    pub max_compute_workgroup_size_z: u32,
    pub max_compute_workgroups_per_dimension: u32,
    pub max_push_constant_size: u32,
}

impl Default for SupportedLimits {
    fn default() -> Self {
        Self {
            max_texture_dimension_1d: 8192,
            max_texture_dimension_2d: 8192,
            max_texture_dimension_3d: 2048,
            max_texture_array_layers: 256,
            max_bind_groups: 4,
            max_bindings_per_bind_group: 640,
            max_dynamic_uniform_buffers_per_pipeline_layout: 8,
            max_dynamic_storage_buffers_per_pipeline_layout: 4,
            max_sampled_textures_per_shader_stage: 16,
            max_samplers_per_shader_stage: 16,
            max_storage_buffers_per_shader_stage: 8,
            max_storage_textures_per_shader_stage: 4,
            max_uniform_buffers_per_shader_stage: 12,
            max_uniform_buffer_binding_size: 65536,
            max_storage_buffer_binding_size: 134_217_728,
            min_uniform_buffer_offset_alignment: 256,
            min_storage_buffer_offset_alignment: 256,
            max_vertex_buffers: 8,
            max_buffer_size: 268_435_456,
            max_vertex_attributes: 16,
            max_vertex_buffer_array_stride: 2048,
            max_color_attachments: 8,
            max_compute_invocations_per_workgroup: 256,
            max_compute_workgroup_size_x: 256,
            max_compute_workgroup_size_y: 256,
            max_compute_workgroup_size_z: 64,
            max_compute_workgroups_per_dimension: 65535,
            max_push_constant_size: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Properties {
    pub subgroup_min_size: u32,
    pub subgroup_max_size: u32,
    pub texture_row_pitch_alignment: u32,
}

/// Host-visible range returned by a map call. Lives exactly as long as the
/// mapping; the typed view bounds-checks every access.
#[derive(Debug, Clone, Copy)]
pub struct MappedBufferRange {
    pub ptr: *mut u8,
    pub len: usize,
}

impl MappedBufferRange {
    pub fn as_slice(&self) -> &[u8] {
        // Safety: the backend guarantees ptr/len describe live mapped memory
        // until unmap. Callers must not outlive the mapping.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Typed view over the mapped bytes; truncates to whole elements.
    pub fn as_typed<T: Copy>(&self) -> &[T] {
        let count = self.len / std::mem::size_of::<T>();
        unsafe { std::slice::from_raw_parts(self.ptr as *const T, count) }
    }

    pub fn as_typed_mut<T: Copy>(&mut self) -> &mut [T] {
        let count = self.len / std::mem::size_of::<T>();
        unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut T, count) }
    }
}

/// What `acquire_next_frame` hands back: the current image's texture/view and
/// the two fences the frame must wait on / signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceTexture {
    pub surface: SurfaceHandle,
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
    pub available: FenceHandle,
    pub complete: FenceHandle,
    pub suboptimal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_enable_rule() {
        let mut state = DepthStencilState::default();
        assert!(!state.needs_stencil_test());
        assert!(!state.needs_depth_test());

        state.stencil_front.pass_op = StencilOperation::Replace;
        assert!(state.needs_stencil_test());

        let mut depth = DepthStencilState::default();
        depth.depth_compare = CompareFunction::Less;
        assert!(depth.needs_depth_test());

        let mut write_only = DepthStencilState::default();
        write_only.depth_write_enabled = true;
        assert!(write_only.needs_depth_test());
    }

    #[test]
    fn surface_descriptor_defaults() {
        let desc = SurfaceDescriptor::default();
        assert_eq!(desc.frames, 2);
        assert_eq!(desc.format, TextureFormat::Bgra8UnormSrgb);
        assert_eq!(desc.present_mode, PresentMode::Fifo);
        assert!(desc.window.is_headless());
    }

    #[test]
    fn mapped_range_typed_view_truncates() {
        // Backed by a u32 array so the pointer is 4-byte aligned, as real
        // mapped GPU memory would be.
        let mut storage = [0u32; 3];
        let bytes: &mut [u8] =
            unsafe { std::slice::from_raw_parts_mut(storage.as_mut_ptr() as *mut u8, 10) };
        let mut range = MappedBufferRange { ptr: bytes.as_mut_ptr(), len: bytes.len() };
        assert_eq!(range.as_typed::<u32>().len(), 2);
        range.as_typed_mut::<u32>()[1] = 0x0403_0201;
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
    }
}
