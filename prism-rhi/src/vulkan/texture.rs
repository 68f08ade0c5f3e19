//! Textures and texture views.

use ash::vk;

use crate::descriptors::{TextureDescriptor, TextureViewDescriptor};
use crate::enums::TextureDimension;
use crate::error::RhiResult;
use crate::handle::{TextureHandle, TextureViewHandle};
use crate::slotmap::PoolObject;

use super::mappings::{
    texture_aspect_to_vk, texture_format_to_vk, texture_usage_to_vk, view_dimension_to_vk,
};
use super::{find_memory_type, vk_err, with_rhi};

#[derive(Default)]
pub(super) struct VulkanTexture {
    pub device: Option<ash::Device>,
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub format: vk::Format,
    pub aspects: vk::ImageAspectFlags,
    pub extent: vk::Extent3D,
    /// Bytes per texel; None for compressed formats.
    pub texel_size: Option<u32>,
    /// Swapchain images are owned by the swapchain, not by us.
    pub owns_image: bool,
}

impl PoolObject for VulkanTexture {
    fn live(&self) -> bool {
        self.image != vk::Image::null()
    }
}

pub(super) fn destroy(texture: &mut VulkanTexture) {
    if let Some(device) = &texture.device {
        if texture.owns_image {
            unsafe {
                device.destroy_image(texture.image, None);
                device.free_memory(texture.memory, None);
            }
        }
    }
    texture.image = vk::Image::null();
}

#[derive(Default)]
pub(super) struct VulkanTextureView {
    pub device: Option<ash::Device>,
    pub view: vk::ImageView,
    /// Used as the render area when this view is the first color attachment.
    pub area: vk::Extent2D,
    pub aspects: vk::ImageAspectFlags,
}

impl PoolObject for VulkanTextureView {
    fn live(&self) -> bool {
        self.view != vk::ImageView::null()
    }
}

pub(super) fn destroy_view(view: &mut VulkanTextureView) {
    if let Some(device) = &view.device {
        unsafe { device.destroy_image_view(view.view, None) };
    }
    view.view = vk::ImageView::null();
}

/// Aspect mask derived from the format: depth and/or stencil planes when the
/// format has them, color otherwise.
pub(super) fn format_aspects(format: crate::TextureFormat) -> vk::ImageAspectFlags {
    let mut aspects = vk::ImageAspectFlags::empty();
    if format.is_depth() {
        aspects |= vk::ImageAspectFlags::DEPTH;
    }
    if format.is_stencil() {
        aspects |= vk::ImageAspectFlags::STENCIL;
    }
    if aspects.is_empty() {
        aspects = vk::ImageAspectFlags::COLOR;
    }
    aspects
}

/// Image type by extent: depth > 1 is 3D, height > 1 is 2D, else 1D. An
/// explicit descriptor dimension wins when it is taller than the inferred
/// one (a 1x1 2D texture is still 2D).
fn image_type(descriptor: &TextureDescriptor) -> vk::ImageType {
    match descriptor.dimension {
        TextureDimension::D3 => vk::ImageType::TYPE_3D,
        TextureDimension::D2 => vk::ImageType::TYPE_2D,
        TextureDimension::D1 => {
            if descriptor.size.depth > 1 {
                vk::ImageType::TYPE_3D
            } else if descriptor.size.height > 1 {
                vk::ImageType::TYPE_2D
            } else {
                vk::ImageType::TYPE_1D
            }
        }
    }
}

pub(super) fn create_texture(descriptor: &TextureDescriptor) -> RhiResult<TextureHandle> {
    with_rhi(|rhi| create_texture_in(rhi, descriptor))
}

pub(super) fn create_texture_in(
    rhi: &mut super::VulkanRhi,
    descriptor: &TextureDescriptor,
) -> RhiResult<TextureHandle> {
    let device = rhi.device()?.clone();
    let format = texture_format_to_vk(descriptor.format)?;
    let extent = vk::Extent3D {
        width: descriptor.size.width.max(1),
        height: descriptor.size.height.max(1),
        depth: descriptor.size.depth.max(1),
    };

    let create_info = vk::ImageCreateInfo::default()
        .image_type(image_type(descriptor))
        .format(format)
        .extent(extent)
        .mip_levels(descriptor.mip_level_count.max(1))
        .array_layers(descriptor.array_layers.max(1))
        .samples(vk::SampleCountFlags::from_raw(descriptor.sample_count.max(1)))
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(texture_usage_to_vk(descriptor.usage, descriptor.format))
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED);
    let image = unsafe { device.create_image(&create_info, None) }.map_err(vk_err)?;

    let requirements = unsafe { device.get_image_memory_requirements(image) };
    let memory_type = find_memory_type(
        &rhi.memory_props,
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;
    let allocate_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type);
    let memory = match unsafe { device.allocate_memory(&allocate_info, None) } {
        Ok(memory) => memory,
        Err(err) => {
            unsafe { device.destroy_image(image, None) };
            return Err(vk_err(err));
        }
    };
    if let Err(err) = unsafe { device.bind_image_memory(image, memory, 0) } {
        unsafe {
            device.destroy_image(image, None);
            device.free_memory(memory, None);
        }
        return Err(vk_err(err));
    }

    rhi.set_debug_label(image, descriptor.label.as_deref());
    let texture = VulkanTexture {
        device: Some(device),
        image,
        memory,
        format,
        aspects: format_aspects(descriptor.format),
        extent,
        texel_size: descriptor.format.texel_size(),
        owns_image: true,
    };
    Ok(TextureHandle::new(rhi.textures.add(texture)))
}

pub(super) fn delete_texture(handle: TextureHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.textures.remove(handle.raw().value))
}

/// The frontend resolves all defaults before this is called; counts here are
/// concrete.
pub(super) fn create_texture_view(
    texture: TextureHandle,
    descriptor: &TextureViewDescriptor,
) -> RhiResult<TextureViewHandle> {
    with_rhi(|rhi| create_texture_view_in(rhi, texture, descriptor))
}

pub(super) fn create_texture_view_in(
    rhi: &mut super::VulkanRhi,
    texture: TextureHandle,
    descriptor: &TextureViewDescriptor,
) -> RhiResult<TextureViewHandle> {
    let device = rhi.device()?.clone();
    let parent = rhi.textures.get(texture.raw().value)?;

    let format = match descriptor.format {
        Some(format) => texture_format_to_vk(format)?,
        None => parent.format,
    };
    let aspects = if descriptor.aspect == crate::TextureAspect::ALL {
        parent.aspects
    } else {
        texture_aspect_to_vk(descriptor.aspect)
    };
    let area = vk::Extent2D {
        width: (parent.extent.width >> descriptor.base_mip_level).max(1),
        height: (parent.extent.height >> descriptor.base_mip_level).max(1),
    };

    let create_info = vk::ImageViewCreateInfo::default()
        .image(parent.image)
        .view_type(view_dimension_to_vk(descriptor.dimension.unwrap_or_default()))
        .format(format)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspects)
                .base_mip_level(descriptor.base_mip_level)
                .level_count(descriptor.mip_level_count.max(1))
                .base_array_layer(descriptor.base_array_layer)
                .layer_count(descriptor.array_layer_count.max(1)),
        );
    let view = unsafe { device.create_image_view(&create_info, None) }.map_err(vk_err)?;
    rhi.set_debug_label(view, descriptor.label.as_deref());

    let object = VulkanTextureView { device: Some(device), view, area, aspects };
    Ok(TextureViewHandle::new(rhi.views.add(object)))
}

pub(super) fn delete_texture_view(handle: TextureViewHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.views.remove(handle.raw().value))
}
