//! Frontend enums. These are stable identifiers shared by every backend;
//! callers serialize them by value.

/// Concrete backend requested at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Vulkan,
    D3d12,
    Metal,
    /// CPU-side conformance backend. Fulfills the complete required plugin
    /// table without touching a GPU; used by the test suite and headless CI.
    Null,
}

/// Queue a command encoder targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueType {
    /// Graphics + compute + transfer capable.
    #[default]
    Default,
    Compute,
    Transfer,
}

/// Closed set of optional device capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    Bindless,
    Raytracing,
    ShaderF16,
    Float32Blendable,
    Float32Filterable,
    TimestampQuery,
    DepthClipControl,
    Depth32FloatStencil8,
    IndirectFirstInstance,
    DualSourceBlending,
    Rg11b10UfloatRenderable,
    Bgra8UnormStorage,
    ClipDistances,
    Subgroups,
    TextureCompressionBc,
    TextureCompressionEtc2,
    TextureCompressionAstc,
}

impl FeatureName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Bindless => "BINDLESS",
            FeatureName::Raytracing => "RAYTRACING",
            FeatureName::ShaderF16 => "SHADER_F16",
            FeatureName::Float32Blendable => "FLOAT32_BLENDABLE",
            FeatureName::Float32Filterable => "FLOAT32_FILTERABLE",
            FeatureName::TimestampQuery => "TIMESTAMP_QUERY",
            FeatureName::DepthClipControl => "DEPTH_CLIP_CONTROL",
            FeatureName::Depth32FloatStencil8 => "DEPTH32FLOAT_STENCIL8",
            FeatureName::IndirectFirstInstance => "INDIRECT_FIRST_INSTANCE",
            FeatureName::DualSourceBlending => "DUAL_SOURCE_BLENDING",
            FeatureName::Rg11b10UfloatRenderable => "RG11B10UFLOAT_RENDERABLE",
            FeatureName::Bgra8UnormStorage => "BGRA8UNORM_STORAGE",
            FeatureName::ClipDistances => "CLIP_DISTANCES",
            FeatureName::Subgroups => "SUBGROUPS",
            FeatureName::TextureCompressionBc => "TEXTURE_COMPRESSION_BC",
            FeatureName::TextureCompressionEtc2 => "TEXTURE_COMPRESSION_ETC2",
            FeatureName::TextureCompressionAstc => "TEXTURE_COMPRESSION_ASTC",
        }
    }
}

/// Universal texture format table: WebGPU color formats, packed formats,
/// depth/stencil, and the compressed families backends may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    // 8-bit
    #[default]
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    // 16-bit
    R16Uint,
    R16Sint,
    R16Unorm,
    R16Snorm,
    R16Float,
    Rg8Unorm,
    Rg8Snorm,
    Rg8Uint,
    Rg8Sint,
    // 32-bit
    R32Uint,
    R32Sint,
    R32Float,
    Rg16Uint,
    Rg16Sint,
    Rg16Unorm,
    Rg16Snorm,
    Rg16Float,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    // packed 32-bit
    Rgb9e5Ufloat,
    Rgb10a2Uint,
    Rgb10a2Unorm,
    Rg11b10Ufloat,
    // 64-bit
    Rg32Uint,
    Rg32Sint,
    Rg32Float,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Unorm,
    Rgba16Snorm,
    Rgba16Float,
    // 128-bit
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
    // depth/stencil
    Stencil8,
    Depth16Unorm,
    Depth24Plus,
    Depth24PlusStencil8,
    Depth32Float,
    Depth32FloatStencil8,
    // BC compressed
    Bc1RgbaUnorm,
    Bc1RgbaUnormSrgb,
    Bc2RgbaUnorm,
    Bc2RgbaUnormSrgb,
    Bc3RgbaUnorm,
    Bc3RgbaUnormSrgb,
    Bc4RUnorm,
    Bc4RSnorm,
    Bc5RgUnorm,
    Bc5RgSnorm,
    Bc6hRgbUfloat,
    Bc6hRgbFloat,
    Bc7RgbaUnorm,
    Bc7RgbaUnormSrgb,
    // ETC2 / EAC compressed
    Etc2Rgb8Unorm,
    Etc2Rgb8UnormSrgb,
    Etc2Rgb8A1Unorm,
    Etc2Rgb8A1UnormSrgb,
    Etc2Rgba8Unorm,
    Etc2Rgba8UnormSrgb,
    EacR11Unorm,
    EacR11Snorm,
    EacRg11Unorm,
    EacRg11Snorm,
    // ASTC compressed (LDR, 4x4 through 12x12)
    Astc4x4Unorm,
    Astc4x4UnormSrgb,
    Astc5x5Unorm,
    Astc5x5UnormSrgb,
    Astc6x6Unorm,
    Astc6x6UnormSrgb,
    Astc8x8Unorm,
    Astc8x8UnormSrgb,
    Astc10x10Unorm,
    Astc10x10UnormSrgb,
    Astc12x12Unorm,
    Astc12x12UnormSrgb,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24Plus
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
                | TextureFormat::Depth32FloatStencil8
        )
    }

    pub fn is_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::Stencil8
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32FloatStencil8
        )
    }

    pub fn is_compressed(&self) -> bool {
        use TextureFormat::*;
        matches!(
            self,
            Bc1RgbaUnorm | Bc1RgbaUnormSrgb | Bc2RgbaUnorm | Bc2RgbaUnormSrgb | Bc3RgbaUnorm
                | Bc3RgbaUnormSrgb | Bc4RUnorm | Bc4RSnorm | Bc5RgUnorm | Bc5RgSnorm
                | Bc6hRgbUfloat | Bc6hRgbFloat | Bc7RgbaUnorm | Bc7RgbaUnormSrgb
                | Etc2Rgb8Unorm | Etc2Rgb8UnormSrgb | Etc2Rgb8A1Unorm | Etc2Rgb8A1UnormSrgb
                | Etc2Rgba8Unorm | Etc2Rgba8UnormSrgb | EacR11Unorm | EacR11Snorm
                | EacRg11Unorm | EacRg11Snorm | Astc4x4Unorm | Astc4x4UnormSrgb | Astc5x5Unorm
                | Astc5x5UnormSrgb | Astc6x6Unorm | Astc6x6UnormSrgb | Astc8x8Unorm
                | Astc8x8UnormSrgb | Astc10x10Unorm | Astc10x10UnormSrgb | Astc12x12Unorm
                | Astc12x12UnormSrgb
        )
    }

    /// Bytes per texel for uncompressed formats; None for compressed ones.
    pub fn texel_size(&self) -> Option<u32> {
        use TextureFormat::*;
        Some(match self {
            R8Unorm | R8Snorm | R8Uint | R8Sint | Stencil8 => 1,
            R16Uint | R16Sint | R16Unorm | R16Snorm | R16Float | Rg8Unorm | Rg8Snorm | Rg8Uint
            | Rg8Sint | Depth16Unorm => 2,
            R32Uint | R32Sint | R32Float | Rg16Uint | Rg16Sint | Rg16Unorm | Rg16Snorm
            | Rg16Float | Rgba8Unorm | Rgba8UnormSrgb | Rgba8Snorm | Rgba8Uint | Rgba8Sint
            | Bgra8Unorm | Bgra8UnormSrgb | Rgb9e5Ufloat | Rgb10a2Uint | Rgb10a2Unorm
            | Rg11b10Ufloat | Depth24Plus | Depth24PlusStencil8 | Depth32Float => 4,
            Depth32FloatStencil8 => 5,
            Rg32Uint | Rg32Sint | Rg32Float | Rgba16Uint | Rgba16Sint | Rgba16Unorm
            | Rgba16Snorm | Rgba16Float => 8,
            Rgba32Uint | Rgba32Sint | Rgba32Float => 16,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureDimension {
    D1,
    #[default]
    D2,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureViewDimension {
    D1,
    #[default]
    D2,
    D2Array,
    Cube,
    CubeArray,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexFormat {
    Uint8,
    Uint8x2,
    Uint8x4,
    Sint8,
    Sint8x2,
    Sint8x4,
    Unorm8,
    Unorm8x2,
    Unorm8x4,
    Snorm8,
    Snorm8x2,
    Snorm8x4,
    Uint16,
    Uint16x2,
    Uint16x4,
    Sint16,
    Sint16x2,
    Sint16x4,
    Unorm16,
    Unorm16x2,
    Unorm16x4,
    Snorm16,
    Snorm16x2,
    Snorm16x4,
    Float16,
    Float16x2,
    Float16x4,
    Float32,
    Float32x2,
    #[default]
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
    Unorm10_10_10_2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    #[default]
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilOperation {
    #[default]
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendOperation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturated,
    Constant,
    OneMinusConstant,
    Src1,
    OneMinusSrc1,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOp {
    #[default]
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreOp {
    #[default]
    Store,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentMode {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeAlphaMode {
    #[default]
    Opaque,
    PreMultiplied,
    PostMultiplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Srgb,
    DisplayP3,
}

/// Image layout named from the frontend's point of view; backends translate
/// or collapse as their API demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarrierLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    CopySrc,
    CopyDst,
    PresentSrc,
}

/// Discriminator for per-binding payloads in bind-group layouts and entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingResourceType {
    Buffer,
    Sampler,
    Texture,
    StorageTexture,
    AccelerationStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferBindingType {
    #[default]
    Uniform,
    Storage,
    ReadOnlyStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerBindingType {
    #[default]
    Filtering,
    NonFiltering,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureSampleType {
    #[default]
    Float,
    UnfilterableFloat,
    Depth,
    Sint,
    Uint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageTextureAccess {
    #[default]
    WriteOnly,
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    #[default]
    Occlusion,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    #[default]
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapState {
    #[default]
    Unmapped,
    Mapped,
}

/// Shader blob kind. The core never validates contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderBlobKind {
    #[default]
    SpirV,
    Dxil,
}

/// Fence flavor. Binary exists only because swapchain acquisition demands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceKind {
    #[default]
    Timeline,
    Binary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_and_stencil_classification() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Depth32Float.is_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.is_stencil());
        assert!(TextureFormat::Stencil8.is_stencil());
        assert!(!TextureFormat::Stencil8.is_depth());
        assert!(!TextureFormat::Rgba8Unorm.is_depth());
    }

    #[test]
    fn compressed_formats_have_no_texel_size() {
        assert_eq!(TextureFormat::Bc7RgbaUnorm.texel_size(), None);
        assert!(TextureFormat::Bc7RgbaUnorm.is_compressed());
        assert_eq!(TextureFormat::Rgba8Unorm.texel_size(), Some(4));
        assert_eq!(TextureFormat::Rgba32Float.texel_size(), Some(16));
    }

    #[test]
    fn feature_names_are_stable_identifiers() {
        assert_eq!(FeatureName::Bindless.as_str(), "BINDLESS");
        assert_eq!(FeatureName::ShaderF16.as_str(), "SHADER_F16");
    }
}
