//! Frontend-to-Vulkan enum translation. Every table is total over the
//! frontend enum; formats a Vulkan device may genuinely lack (compressed
//! families) still map to their canonical VkFormat and are gated by the
//! feature checks at device creation.

use ash::vk;

use crate::enums::*;
use crate::error::RhiResult;
use crate::flags::*;

pub(super) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::COPY_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if usage.contains(BufferUsage::QUERY_RESOLVE) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::BVH_INPUT) {
        flags |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    if usage.contains(BufferUsage::BVH_STORAGE) {
        flags |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    if usage.contains(BufferUsage::SHADER_DEVICE_ADDRESS) {
        flags |= vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    flags
}

pub(super) fn texture_usage_to_vk(
    usage: TextureUsage,
    format: TextureFormat,
) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::COPY_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(TextureUsage::TEXTURE_BINDING) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::STORAGE_BINDING) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
        if format.is_depth() || format.is_stencil() {
            flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        } else {
            flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }
    }
    flags
}

pub(super) fn texture_format_to_vk(format: TextureFormat) -> RhiResult<vk::Format> {
    use TextureFormat::*;
    Ok(match format {
        R8Unorm => vk::Format::R8_UNORM,
        R8Snorm => vk::Format::R8_SNORM,
        R8Uint => vk::Format::R8_UINT,
        R8Sint => vk::Format::R8_SINT,
        R16Uint => vk::Format::R16_UINT,
        R16Sint => vk::Format::R16_SINT,
        R16Unorm => vk::Format::R16_UNORM,
        R16Snorm => vk::Format::R16_SNORM,
        R16Float => vk::Format::R16_SFLOAT,
        Rg8Unorm => vk::Format::R8G8_UNORM,
        Rg8Snorm => vk::Format::R8G8_SNORM,
        Rg8Uint => vk::Format::R8G8_UINT,
        Rg8Sint => vk::Format::R8G8_SINT,
        R32Uint => vk::Format::R32_UINT,
        R32Sint => vk::Format::R32_SINT,
        R32Float => vk::Format::R32_SFLOAT,
        Rg16Uint => vk::Format::R16G16_UINT,
        Rg16Sint => vk::Format::R16G16_SINT,
        Rg16Unorm => vk::Format::R16G16_UNORM,
        Rg16Snorm => vk::Format::R16G16_SNORM,
        Rg16Float => vk::Format::R16G16_SFLOAT,
        Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Rgba8Snorm => vk::Format::R8G8B8A8_SNORM,
        Rgba8Uint => vk::Format::R8G8B8A8_UINT,
        Rgba8Sint => vk::Format::R8G8B8A8_SINT,
        Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        Rgb9e5Ufloat => vk::Format::E5B9G9R9_UFLOAT_PACK32,
        Rgb10a2Uint => vk::Format::A2B10G10R10_UINT_PACK32,
        Rgb10a2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Rg11b10Ufloat => vk::Format::B10G11R11_UFLOAT_PACK32,
        Rg32Uint => vk::Format::R32G32_UINT,
        Rg32Sint => vk::Format::R32G32_SINT,
        Rg32Float => vk::Format::R32G32_SFLOAT,
        Rgba16Uint => vk::Format::R16G16B16A16_UINT,
        Rgba16Sint => vk::Format::R16G16B16A16_SINT,
        Rgba16Unorm => vk::Format::R16G16B16A16_UNORM,
        Rgba16Snorm => vk::Format::R16G16B16A16_SNORM,
        Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        Rgba32Uint => vk::Format::R32G32B32A32_UINT,
        Rgba32Sint => vk::Format::R32G32B32A32_SINT,
        Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        Stencil8 => vk::Format::S8_UINT,
        Depth16Unorm => vk::Format::D16_UNORM,
        Depth24Plus => vk::Format::X8_D24_UNORM_PACK32,
        Depth24PlusStencil8 => vk::Format::D24_UNORM_S8_UINT,
        Depth32Float => vk::Format::D32_SFLOAT,
        Depth32FloatStencil8 => vk::Format::D32_SFLOAT_S8_UINT,
        Bc1RgbaUnorm => vk::Format::BC1_RGBA_UNORM_BLOCK,
        Bc1RgbaUnormSrgb => vk::Format::BC1_RGBA_SRGB_BLOCK,
        Bc2RgbaUnorm => vk::Format::BC2_UNORM_BLOCK,
        Bc2RgbaUnormSrgb => vk::Format::BC2_SRGB_BLOCK,
        Bc3RgbaUnorm => vk::Format::BC3_UNORM_BLOCK,
        Bc3RgbaUnormSrgb => vk::Format::BC3_SRGB_BLOCK,
        Bc4RUnorm => vk::Format::BC4_UNORM_BLOCK,
        Bc4RSnorm => vk::Format::BC4_SNORM_BLOCK,
        Bc5RgUnorm => vk::Format::BC5_UNORM_BLOCK,
        Bc5RgSnorm => vk::Format::BC5_SNORM_BLOCK,
        Bc6hRgbUfloat => vk::Format::BC6H_UFLOAT_BLOCK,
        Bc6hRgbFloat => vk::Format::BC6H_SFLOAT_BLOCK,
        Bc7RgbaUnorm => vk::Format::BC7_UNORM_BLOCK,
        Bc7RgbaUnormSrgb => vk::Format::BC7_SRGB_BLOCK,
        Etc2Rgb8Unorm => vk::Format::ETC2_R8G8B8_UNORM_BLOCK,
        Etc2Rgb8UnormSrgb => vk::Format::ETC2_R8G8B8_SRGB_BLOCK,
        Etc2Rgb8A1Unorm => vk::Format::ETC2_R8G8B8A1_UNORM_BLOCK,
        Etc2Rgb8A1UnormSrgb => vk::Format::ETC2_R8G8B8A1_SRGB_BLOCK,
        Etc2Rgba8Unorm => vk::Format::ETC2_R8G8B8A8_UNORM_BLOCK,
        Etc2Rgba8UnormSrgb => vk::Format::ETC2_R8G8B8A8_SRGB_BLOCK,
        EacR11Unorm => vk::Format::EAC_R11_UNORM_BLOCK,
        EacR11Snorm => vk::Format::EAC_R11_SNORM_BLOCK,
        EacRg11Unorm => vk::Format::EAC_R11G11_UNORM_BLOCK,
        EacRg11Snorm => vk::Format::EAC_R11G11_SNORM_BLOCK,
        Astc4x4Unorm => vk::Format::ASTC_4X4_UNORM_BLOCK,
        Astc4x4UnormSrgb => vk::Format::ASTC_4X4_SRGB_BLOCK,
        Astc5x5Unorm => vk::Format::ASTC_5X5_UNORM_BLOCK,
        Astc5x5UnormSrgb => vk::Format::ASTC_5X5_SRGB_BLOCK,
        Astc6x6Unorm => vk::Format::ASTC_6X6_UNORM_BLOCK,
        Astc6x6UnormSrgb => vk::Format::ASTC_6X6_SRGB_BLOCK,
        Astc8x8Unorm => vk::Format::ASTC_8X8_UNORM_BLOCK,
        Astc8x8UnormSrgb => vk::Format::ASTC_8X8_SRGB_BLOCK,
        Astc10x10Unorm => vk::Format::ASTC_10X10_UNORM_BLOCK,
        Astc10x10UnormSrgb => vk::Format::ASTC_10X10_SRGB_BLOCK,
        Astc12x12Unorm => vk::Format::ASTC_12X12_UNORM_BLOCK,
        Astc12x12UnormSrgb => vk::Format::ASTC_12X12_SRGB_BLOCK,
    })
}

/// Reverse mapping for the formats a swapchain can hand back.
pub(super) fn texture_format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    Some(match format {
        vk::Format::B8G8R8A8_SRGB => TextureFormat::Bgra8UnormSrgb,
        vk::Format::B8G8R8A8_UNORM => TextureFormat::Bgra8Unorm,
        vk::Format::R8G8B8A8_SRGB => TextureFormat::Rgba8UnormSrgb,
        vk::Format::R8G8B8A8_UNORM => TextureFormat::Rgba8Unorm,
        vk::Format::R16G16B16A16_SFLOAT => TextureFormat::Rgba16Float,
        vk::Format::A2B10G10R10_UNORM_PACK32 => TextureFormat::Rgb10a2Unorm,
        _ => return None,
    })
}

pub(super) fn texture_aspect_to_vk(aspect: TextureAspect) -> vk::ImageAspectFlags {
    let mut flags = vk::ImageAspectFlags::empty();
    if aspect.contains(TextureAspect::COLOR) {
        flags |= vk::ImageAspectFlags::COLOR;
    }
    if aspect.contains(TextureAspect::DEPTH) {
        flags |= vk::ImageAspectFlags::DEPTH;
    }
    if aspect.contains(TextureAspect::STENCIL) {
        flags |= vk::ImageAspectFlags::STENCIL;
    }
    flags
}

pub(super) fn view_dimension_to_vk(dimension: TextureViewDimension) -> vk::ImageViewType {
    match dimension {
        TextureViewDimension::D1 => vk::ImageViewType::TYPE_1D,
        TextureViewDimension::D2 => vk::ImageViewType::TYPE_2D,
        TextureViewDimension::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
        TextureViewDimension::Cube => vk::ImageViewType::CUBE,
        TextureViewDimension::CubeArray => vk::ImageViewType::CUBE_ARRAY,
        TextureViewDimension::D3 => vk::ImageViewType::TYPE_3D,
    }
}

pub(super) fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirrorRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
    }
}

pub(super) fn filter_to_vk(filter: FilterMode) -> vk::Filter {
    match filter {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

pub(super) fn mipmap_filter_to_vk(filter: FilterMode) -> vk::SamplerMipmapMode {
    match filter {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(super) fn compare_function_to_vk(function: CompareFunction) -> vk::CompareOp {
    match function {
        CompareFunction::Never => vk::CompareOp::NEVER,
        CompareFunction::Less => vk::CompareOp::LESS,
        CompareFunction::Equal => vk::CompareOp::EQUAL,
        CompareFunction::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareFunction::Greater => vk::CompareOp::GREATER,
        CompareFunction::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareFunction::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareFunction::Always => vk::CompareOp::ALWAYS,
    }
}

pub(super) fn stencil_operation_to_vk(operation: StencilOperation) -> vk::StencilOp {
    match operation {
        StencilOperation::Keep => vk::StencilOp::KEEP,
        StencilOperation::Zero => vk::StencilOp::ZERO,
        StencilOperation::Replace => vk::StencilOp::REPLACE,
        StencilOperation::Invert => vk::StencilOp::INVERT,
        StencilOperation::IncrementClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOperation::DecrementClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOperation::IncrementWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOperation::DecrementWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub(super) fn blend_operation_to_vk(operation: BlendOperation) -> vk::BlendOp {
    match operation {
        BlendOperation::Add => vk::BlendOp::ADD,
        BlendOperation::Subtract => vk::BlendOp::SUBTRACT,
        BlendOperation::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOperation::Min => vk::BlendOp::MIN,
        BlendOperation::Max => vk::BlendOp::MAX,
    }
}

pub(super) fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::Src => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrc => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::Dst => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDst => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::SrcAlphaSaturated => vk::BlendFactor::SRC_ALPHA_SATURATE,
        BlendFactor::Constant => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstant => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::Src1 => vk::BlendFactor::SRC1_COLOR,
        BlendFactor::OneMinusSrc1 => vk::BlendFactor::ONE_MINUS_SRC1_COLOR,
        BlendFactor::Src1Alpha => vk::BlendFactor::SRC1_ALPHA,
        BlendFactor::OneMinusSrc1Alpha => vk::BlendFactor::ONE_MINUS_SRC1_ALPHA,
    }
}

pub(super) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Ccw => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Cw => vk::FrontFace::CLOCKWISE,
    }
}

pub(super) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(super) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub(super) fn index_format_to_vk(format: IndexFormat) -> vk::IndexType {
    match format {
        IndexFormat::Uint16 => vk::IndexType::UINT16,
        IndexFormat::Uint32 => vk::IndexType::UINT32,
    }
}

pub(super) fn vertex_step_mode_to_vk(mode: VertexStepMode) -> vk::VertexInputRate {
    match mode {
        VertexStepMode::Vertex => vk::VertexInputRate::VERTEX,
        VertexStepMode::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub(super) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    use VertexFormat::*;
    match format {
        Uint8 => vk::Format::R8_UINT,
        Uint8x2 => vk::Format::R8G8_UINT,
        Uint8x4 => vk::Format::R8G8B8A8_UINT,
        Sint8 => vk::Format::R8_SINT,
        Sint8x2 => vk::Format::R8G8_SINT,
        Sint8x4 => vk::Format::R8G8B8A8_SINT,
        Unorm8 => vk::Format::R8_UNORM,
        Unorm8x2 => vk::Format::R8G8_UNORM,
        Unorm8x4 => vk::Format::R8G8B8A8_UNORM,
        Snorm8 => vk::Format::R8_SNORM,
        Snorm8x2 => vk::Format::R8G8_SNORM,
        Snorm8x4 => vk::Format::R8G8B8A8_SNORM,
        Uint16 => vk::Format::R16_UINT,
        Uint16x2 => vk::Format::R16G16_UINT,
        Uint16x4 => vk::Format::R16G16B16A16_UINT,
        Sint16 => vk::Format::R16_SINT,
        Sint16x2 => vk::Format::R16G16_SINT,
        Sint16x4 => vk::Format::R16G16B16A16_SINT,
        Unorm16 => vk::Format::R16_UNORM,
        Unorm16x2 => vk::Format::R16G16_UNORM,
        Unorm16x4 => vk::Format::R16G16B16A16_UNORM,
        Snorm16 => vk::Format::R16_SNORM,
        Snorm16x2 => vk::Format::R16G16_SNORM,
        Snorm16x4 => vk::Format::R16G16B16A16_SNORM,
        Float16 => vk::Format::R16_SFLOAT,
        Float16x2 => vk::Format::R16G16_SFLOAT,
        Float16x4 => vk::Format::R16G16B16A16_SFLOAT,
        Float32 => vk::Format::R32_SFLOAT,
        Float32x2 => vk::Format::R32G32_SFLOAT,
        Float32x3 => vk::Format::R32G32B32_SFLOAT,
        Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
        Uint32 => vk::Format::R32_UINT,
        Uint32x2 => vk::Format::R32G32_UINT,
        Uint32x3 => vk::Format::R32G32B32_UINT,
        Uint32x4 => vk::Format::R32G32B32A32_UINT,
        Sint32 => vk::Format::R32_SINT,
        Sint32x2 => vk::Format::R32G32_SINT,
        Sint32x3 => vk::Format::R32G32B32_SINT,
        Sint32x4 => vk::Format::R32G32B32A32_SINT,
        Unorm10_10_10_2 => vk::Format::A2B10G10R10_UNORM_PACK32,
    }
}

pub(super) fn load_op_to_vk(op: LoadOp) -> vk::AttachmentLoadOp {
    match op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
    }
}

pub(super) fn store_op_to_vk(op: StoreOp) -> vk::AttachmentStoreOp {
    match op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::Discard => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub(super) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
    }
}

pub(super) fn color_writes_to_vk(writes: ColorWrites) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if writes.contains(ColorWrites::RED) {
        flags |= vk::ColorComponentFlags::R;
    }
    if writes.contains(ColorWrites::GREEN) {
        flags |= vk::ColorComponentFlags::G;
    }
    if writes.contains(ColorWrites::BLUE) {
        flags |= vk::ColorComponentFlags::B;
    }
    if writes.contains(ColorWrites::ALPHA) {
        flags |= vk::ColorComponentFlags::A;
    }
    flags
}

pub(super) fn shader_stages_to_vk(stages: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStages::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStages::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stages.contains(ShaderStages::COMPUTE) {
        flags |= vk::ShaderStageFlags::COMPUTE;
    }
    if stages.contains(ShaderStages::RAYGEN) {
        flags |= vk::ShaderStageFlags::RAYGEN_KHR;
    }
    if stages.contains(ShaderStages::MISS) {
        flags |= vk::ShaderStageFlags::MISS_KHR;
    }
    if stages.contains(ShaderStages::CLOSEST_HIT) {
        flags |= vk::ShaderStageFlags::CLOSEST_HIT_KHR;
    }
    if stages.contains(ShaderStages::ANY_HIT) {
        flags |= vk::ShaderStageFlags::ANY_HIT_KHR;
    }
    if stages.contains(ShaderStages::INTERSECTION) {
        flags |= vk::ShaderStageFlags::INTERSECTION_KHR;
    }
    flags
}

pub(super) fn barrier_sync_to_vk(sync: BarrierSync) -> vk::PipelineStageFlags2 {
    if sync == BarrierSync::NONE {
        return vk::PipelineStageFlags2::NONE;
    }
    let mut flags = vk::PipelineStageFlags2::empty();
    if sync.contains(BarrierSync::DRAW_INDIRECT) {
        flags |= vk::PipelineStageFlags2::DRAW_INDIRECT;
    }
    if sync.contains(BarrierSync::VERTEX_INPUT) {
        flags |= vk::PipelineStageFlags2::VERTEX_INPUT;
    }
    if sync.contains(BarrierSync::VERTEX_SHADER) {
        flags |= vk::PipelineStageFlags2::VERTEX_SHADER;
    }
    if sync.contains(BarrierSync::FRAGMENT_SHADER) {
        flags |= vk::PipelineStageFlags2::FRAGMENT_SHADER;
    }
    if sync.contains(BarrierSync::EARLY_DEPTH_STENCIL) {
        flags |= vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS;
    }
    if sync.contains(BarrierSync::LATE_DEPTH_STENCIL) {
        flags |= vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS;
    }
    if sync.contains(BarrierSync::RENDER_TARGET) {
        flags |= vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT;
    }
    if sync.contains(BarrierSync::COMPUTE) {
        flags |= vk::PipelineStageFlags2::COMPUTE_SHADER;
    }
    if sync.contains(BarrierSync::COPY) {
        flags |= vk::PipelineStageFlags2::TRANSFER;
    }
    if sync.contains(BarrierSync::RESOLVE) {
        flags |= vk::PipelineStageFlags2::RESOLVE;
    }
    if sync.contains(BarrierSync::BVH_BUILD) {
        flags |= vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR;
    }
    if sync.contains(BarrierSync::RAYTRACING) {
        flags |= vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR;
    }
    if sync.contains(BarrierSync::ALL) {
        flags |= vk::PipelineStageFlags2::ALL_COMMANDS;
    }
    flags
}

pub(super) fn barrier_access_to_vk(access: BarrierAccess) -> vk::AccessFlags2 {
    if access == BarrierAccess::NONE {
        return vk::AccessFlags2::NONE;
    }
    let mut flags = vk::AccessFlags2::empty();
    if access.contains(BarrierAccess::INDIRECT_ARGUMENT) {
        flags |= vk::AccessFlags2::INDIRECT_COMMAND_READ;
    }
    if access.contains(BarrierAccess::INDEX_BUFFER) {
        flags |= vk::AccessFlags2::INDEX_READ;
    }
    if access.contains(BarrierAccess::VERTEX_BUFFER) {
        flags |= vk::AccessFlags2::VERTEX_ATTRIBUTE_READ;
    }
    if access.contains(BarrierAccess::UNIFORM_BUFFER) {
        flags |= vk::AccessFlags2::UNIFORM_READ;
    }
    if access.contains(BarrierAccess::SHADER_READ) {
        flags |= vk::AccessFlags2::SHADER_READ;
    }
    if access.contains(BarrierAccess::SHADER_WRITE) {
        flags |= vk::AccessFlags2::SHADER_WRITE;
    }
    if access.contains(BarrierAccess::RENDER_TARGET_READ) {
        flags |= vk::AccessFlags2::COLOR_ATTACHMENT_READ;
    }
    if access.contains(BarrierAccess::RENDER_TARGET_WRITE) {
        flags |= vk::AccessFlags2::COLOR_ATTACHMENT_WRITE;
    }
    if access.contains(BarrierAccess::DEPTH_STENCIL_READ) {
        flags |= vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ;
    }
    if access.contains(BarrierAccess::DEPTH_STENCIL_WRITE) {
        flags |= vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    if access.contains(BarrierAccess::COPY_SRC) {
        flags |= vk::AccessFlags2::TRANSFER_READ;
    }
    if access.contains(BarrierAccess::COPY_DST) {
        flags |= vk::AccessFlags2::TRANSFER_WRITE;
    }
    if access.contains(BarrierAccess::BVH_READ) {
        flags |= vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR;
    }
    if access.contains(BarrierAccess::BVH_WRITE) {
        flags |= vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR;
    }
    if access.contains(BarrierAccess::MEMORY_READ) {
        flags |= vk::AccessFlags2::MEMORY_READ;
    }
    if access.contains(BarrierAccess::MEMORY_WRITE) {
        flags |= vk::AccessFlags2::MEMORY_WRITE;
    }
    flags
}

pub(super) fn barrier_layout_to_vk(layout: BarrierLayout) -> vk::ImageLayout {
    match layout {
        BarrierLayout::Undefined => vk::ImageLayout::UNDEFINED,
        BarrierLayout::General => vk::ImageLayout::GENERAL,
        BarrierLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        BarrierLayout::DepthStencilAttachment => {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        }
        BarrierLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        BarrierLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        BarrierLayout::CopySrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        BarrierLayout::CopyDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        BarrierLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_formats_translate_to_depth_aspect_usage() {
        let flags = texture_usage_to_vk(TextureUsage::RENDER_ATTACHMENT, TextureFormat::Depth32Float);
        assert!(flags.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
        let flags = texture_usage_to_vk(TextureUsage::RENDER_ATTACHMENT, TextureFormat::Rgba8Unorm);
        assert!(flags.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
    }

    #[test]
    fn barrier_none_maps_to_none() {
        assert_eq!(barrier_sync_to_vk(BarrierSync::NONE), vk::PipelineStageFlags2::NONE);
        assert_eq!(barrier_access_to_vk(BarrierAccess::NONE), vk::AccessFlags2::NONE);
    }

    #[test]
    fn swapchain_format_round_trips() {
        let format = TextureFormat::Bgra8UnormSrgb;
        let vk_format = texture_format_to_vk(format).unwrap();
        assert_eq!(texture_format_from_vk(vk_format), Some(format));
    }
}
