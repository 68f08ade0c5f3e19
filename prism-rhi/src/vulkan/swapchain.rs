//! Surfaces and swapchains.
//!
//! A surface owns the swapchain ring: one texture/view/render-complete fence
//! per image plus one image-available fence per logical frame. The frame
//! borrows the fences per-acquire and never owns them. A surface without a
//! window is headless: the ring is made of ordinary offscreen render targets
//! and acquire/present only rotate it.

use ash::vk;

use crate::descriptors::{Extent2d, SurfaceDescriptor, SurfaceTexture, WindowHandle};
use crate::enums::{FenceKind, TextureFormat};
use crate::error::{fatal, RhiError, RhiResult};
use crate::flags::{TextureUsage, TextureAspect};
use crate::handle::{FenceHandle, SurfaceHandle, TextureHandle, TextureViewHandle};
use crate::slotmap::PoolObject;

use super::fence::VulkanFence;
use super::mappings::{present_mode_to_vk, texture_format_from_vk, texture_format_to_vk};
use super::texture::{VulkanTexture, VulkanTextureView};
use super::{vk_err, with_rhi, VulkanRhi, FRAME_COUNT};

pub(super) struct SwapFrame {
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
    pub complete: FenceHandle,
}

#[derive(Default)]
pub(super) struct VulkanSwapchain {
    pub live: bool,
    pub window: WindowHandle,
    pub headless: bool,
    pub surface: vk::SurfaceKHR,
    pub swapchain: vk::SwapchainKHR,
    pub format: vk::Format,
    pub colorspace: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub frames: Vec<SwapFrame>,
    /// Keyed by logical frame index.
    pub available: Vec<FenceHandle>,
    pub current_image: Option<u32>,
}

impl PoolObject for VulkanSwapchain {
    fn live(&self) -> bool {
        self.live
    }
}

fn add_fence(rhi: &mut VulkanRhi, kind: FenceKind) -> RhiResult<FenceHandle> {
    let device = rhi.device()?.clone();
    let semaphore = super::fence::create_semaphore(&device, kind)?;
    let slot = rhi.fences.add(VulkanFence { device: Some(device), semaphore, kind, target: 0 });
    Ok(FenceHandle::new(slot))
}

fn choose_format(
    requested: TextureFormat,
    supported: &[vk::SurfaceFormatKHR],
) -> (vk::Format, vk::ColorSpaceKHR) {
    if let Ok(wanted) = texture_format_to_vk(requested) {
        for format in supported {
            if format.format == wanted {
                return (format.format, format.color_space);
            }
        }
    }
    for format in supported {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return (format.format, format.color_space);
        }
    }
    (supported[0].format, supported[0].color_space)
}

fn choose_present_mode(
    requested: vk::PresentModeKHR,
    supported: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if supported.contains(&requested) {
        requested
    } else {
        vk::PresentModeKHR::FIFO
    }
}

fn choose_extent(size: Extent2d, caps: &vk::SurfaceCapabilitiesKHR) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: size.width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: size.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// Wrap a swapchain image (or build an offscreen one) into the texture and
/// view pools and give it a render-complete fence.
fn build_swap_frame(
    rhi: &mut VulkanRhi,
    image: vk::Image,
    format: vk::Format,
    extent: vk::Extent2D,
) -> RhiResult<SwapFrame> {
    let device = rhi.device()?.clone();

    let texture = VulkanTexture {
        device: Some(device.clone()),
        image,
        memory: vk::DeviceMemory::null(),
        format,
        aspects: vk::ImageAspectFlags::COLOR,
        extent: vk::Extent3D { width: extent.width, height: extent.height, depth: 1 },
        texel_size: texture_format_from_vk(format).and_then(|f| f.texel_size()),
        owns_image: false,
    };
    let texture = TextureHandle::new(rhi.textures.add(texture));

    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );
    let view = unsafe { device.create_image_view(&view_info, None) }.map_err(vk_err)?;
    let view = TextureViewHandle::new(rhi.views.add(VulkanTextureView {
        device: Some(device),
        view,
        area: extent,
        aspects: vk::ImageAspectFlags::COLOR,
    }));

    let complete = add_fence(rhi, FenceKind::Binary)?;
    Ok(SwapFrame { texture, view, complete })
}

fn build_headless_frame(
    rhi: &mut VulkanRhi,
    format: TextureFormat,
    extent: vk::Extent2D,
) -> RhiResult<SwapFrame> {
    let descriptor = crate::TextureDescriptor {
        label: None,
        size: crate::Extent3d { width: extent.width, height: extent.height, depth: 1 },
        array_layers: 1,
        mip_level_count: 1,
        sample_count: 1,
        dimension: crate::TextureDimension::D2,
        format,
        usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
    };
    let texture = super::texture::create_texture_in(rhi, &descriptor)?;
    let view = super::texture::create_texture_view_in(
        rhi,
        texture,
        &crate::TextureViewDescriptor {
            mip_level_count: 1,
            array_layer_count: 1,
            aspect: TextureAspect::COLOR,
            ..Default::default()
        },
    )?;
    let complete = add_fence(rhi, FenceKind::Timeline)?;
    Ok(SwapFrame { texture, view, complete })
}

/// Create (or rebuild, when the window already has one) a surface.
pub(super) fn create_surface(descriptor: &SurfaceDescriptor) -> RhiResult<SurfaceHandle> {
    with_rhi(|rhi| {
        let existing = rhi
            .surfaces
            .iter()
            .find(|(_, s)| s.window == descriptor.window)
            .map(|(slot, _)| slot);
        if let Some(slot) = existing {
            rebuild_surface(rhi, slot, descriptor)?;
            return Ok(SurfaceHandle::new(slot));
        }

        let mut swapchain = VulkanSwapchain {
            live: true,
            window: descriptor.window,
            headless: descriptor.window.is_headless(),
            ..VulkanSwapchain::default()
        };
        build_ring(rhi, &mut swapchain, descriptor, &[])?;
        for _ in 0..FRAME_COUNT {
            let kind = if swapchain.headless { FenceKind::Timeline } else { FenceKind::Binary };
            let fence = add_fence(rhi, kind)?;
            swapchain.available.push(fence);
        }
        Ok(SurfaceHandle::new(rhi.surfaces.add(swapchain)))
    })
}

/// Build the image ring into `swapchain`. `kept_fences` recycles the old
/// render-complete fences on a resize with an unchanged image count.
fn build_ring(
    rhi: &mut VulkanRhi,
    swapchain: &mut VulkanSwapchain,
    descriptor: &SurfaceDescriptor,
    kept_fences: &[FenceHandle],
) -> RhiResult<()> {
    if swapchain.headless {
        let format = descriptor.format;
        swapchain.format = texture_format_to_vk(format)?;
        swapchain.colorspace = vk::ColorSpaceKHR::SRGB_NONLINEAR;
        swapchain.extent =
            vk::Extent2D { width: descriptor.size.width.max(1), height: descriptor.size.height.max(1) };
        let image_count = descriptor.frames.max(2);
        for _ in 0..image_count {
            let frame = build_headless_frame(rhi, format, swapchain.extent)?;
            swapchain.frames.push(frame);
        }
    } else {
        let surface = if swapchain.surface == vk::SurfaceKHR::null() {
            super::surface::create_native_surface(rhi, &descriptor.window)?
        } else {
            swapchain.surface
        };
        swapchain.surface = surface;

        let loader = rhi
            .surface_loader
            .clone()
            .ok_or(RhiError::BackendUnavailable(crate::Backend::Vulkan))?;
        let swapchain_loader = rhi
            .swapchain_loader
            .clone()
            .ok_or(RhiError::NotInitialized)?;

        if let Some(graphics) = rhi.queues.graphics {
            let supported = unsafe {
                loader.get_physical_device_surface_support(rhi.adapter, graphics, surface)
            }
            .unwrap_or(false);
            if !supported {
                log::warn!("graphics queue family cannot present to this surface");
            }
        }

        let caps = unsafe {
            loader.get_physical_device_surface_capabilities(rhi.adapter, surface)
        }
        .map_err(vk_err)?;
        let formats = unsafe {
            loader.get_physical_device_surface_formats(rhi.adapter, surface)
        }
        .map_err(vk_err)?;
        let present_modes = unsafe {
            loader.get_physical_device_surface_present_modes(rhi.adapter, surface)
        }
        .map_err(vk_err)?;
        if formats.is_empty() {
            return Err(RhiError::BackendError {
                code: 0,
                message: "surface reports no formats".to_string(),
            });
        }

        let (format, colorspace) = choose_format(descriptor.format, &formats);
        let present_mode =
            choose_present_mode(present_mode_to_vk(descriptor.present_mode), &present_modes);
        let extent = choose_extent(descriptor.size, &caps);

        let mut image_count = descriptor.frames.max(2).max(caps.min_image_count);
        if caps.max_image_count > 0 {
            image_count = image_count.min(caps.max_image_count);
        }

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format)
            .image_color_space(colorspace)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(swapchain.swapchain);
        let new_swapchain = match unsafe { swapchain_loader.create_swapchain(&create_info, None) }
        {
            Ok(sc) => sc,
            Err(err) => {
                // leave a clean slate; partially created state is gone
                unsafe {
                    if swapchain.swapchain != vk::SwapchainKHR::null() {
                        swapchain_loader.destroy_swapchain(swapchain.swapchain, None);
                    }
                }
                swapchain.swapchain = vk::SwapchainKHR::null();
                return Err(vk_err(err));
            }
        };
        if swapchain.swapchain != vk::SwapchainKHR::null() {
            unsafe { swapchain_loader.destroy_swapchain(swapchain.swapchain, None) };
        }
        swapchain.swapchain = new_swapchain;
        swapchain.format = format;
        swapchain.colorspace = colorspace;
        swapchain.extent = extent;

        let images = unsafe { swapchain_loader.get_swapchain_images(new_swapchain) }
            .map_err(vk_err)?;
        log::info!(
            "swapchain created: {}x{} {format:?}/{colorspace:?} {present_mode:?} x{}",
            extent.width,
            extent.height,
            images.len()
        );
        for image in images {
            let frame = build_swap_frame(rhi, image, format, extent)?;
            swapchain.frames.push(frame);
        }
    }

    // recycle preserved render-complete fences when counts match
    if kept_fences.len() == swapchain.frames.len() {
        for (frame, fence) in swapchain.frames.iter_mut().zip(kept_fences) {
            rhi.fences.remove(frame.complete.raw().value)?;
            frame.complete = *fence;
        }
    } else {
        for fence in kept_fences {
            rhi.fences.remove(fence.raw().value)?;
        }
    }
    Ok(())
}

/// Resize path: views and textures are destroyed and rebuilt in every case;
/// fences survive iff the image count does not change.
fn rebuild_surface(
    rhi: &mut VulkanRhi,
    slot: u32,
    descriptor: &SurfaceDescriptor,
) -> RhiResult<()> {
    // the ring may be in flight; a resize stalls the device
    if let Some(device) = &rhi.device {
        unsafe { device.device_wait_idle() }.ok();
    }

    let (old_frames, old_available, headless, surface, old_swapchain) = {
        let swapchain = rhi.surfaces.get_mut(slot)?;
        (
            std::mem::take(&mut swapchain.frames),
            std::mem::take(&mut swapchain.available),
            swapchain.headless,
            swapchain.surface,
            swapchain.swapchain,
        )
    };

    let old_count = old_frames.len() as u32;
    let new_count = descriptor.frames.max(2);
    let counts_match = !headless && old_count == compute_windowed_count(rhi, surface, new_count)?
        || headless && old_count == new_count;

    let mut kept_complete = Vec::new();
    for frame in old_frames {
        rhi.textures.remove(frame.texture.raw().value)?;
        rhi.views.remove(frame.view.raw().value)?;
        if counts_match {
            kept_complete.push(frame.complete);
        } else {
            rhi.fences.remove(frame.complete.raw().value)?;
        }
    }

    let mut available = old_available;
    if !counts_match {
        for fence in available.drain(..) {
            rhi.fences.remove(fence.raw().value)?;
        }
        for _ in 0..FRAME_COUNT {
            let kind = if headless { FenceKind::Timeline } else { FenceKind::Binary };
            available.push(add_fence(rhi, kind)?);
        }
    }

    let mut rebuilt = VulkanSwapchain {
        live: true,
        window: descriptor.window,
        headless,
        surface,
        swapchain: old_swapchain,
        available,
        current_image: None,
        ..VulkanSwapchain::default()
    };
    build_ring(rhi, &mut rebuilt, descriptor, &kept_complete)?;
    *rhi.surfaces.get_mut(slot)? = rebuilt;
    Ok(())
}

/// What the windowed image count will clamp to, so the fence-preservation
/// decision is made against the real post-clamp count.
fn compute_windowed_count(
    rhi: &VulkanRhi,
    surface: vk::SurfaceKHR,
    requested: u32,
) -> RhiResult<u32> {
    let loader = rhi
        .surface_loader
        .as_ref()
        .ok_or(RhiError::BackendUnavailable(crate::Backend::Vulkan))?;
    let caps = unsafe {
        loader.get_physical_device_surface_capabilities(rhi.adapter, surface)
    }
    .map_err(vk_err)?;
    let mut count = requested.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count = count.min(caps.max_image_count);
    }
    Ok(count)
}

pub(super) fn destroy_surface_slot(rhi: &mut VulkanRhi, slot: u32) -> RhiResult<()> {
    let (frames, available, surface, swapchain) = {
        let sc = rhi.surfaces.get_mut(slot)?;
        (
            std::mem::take(&mut sc.frames),
            std::mem::take(&mut sc.available),
            sc.surface,
            sc.swapchain,
        )
    };
    for frame in frames {
        rhi.textures.remove(frame.texture.raw().value)?;
        rhi.views.remove(frame.view.raw().value)?;
        rhi.fences.remove(frame.complete.raw().value)?;
    }
    for fence in available {
        rhi.fences.remove(fence.raw().value)?;
    }
    if swapchain != vk::SwapchainKHR::null() {
        if let Some(loader) = &rhi.swapchain_loader {
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }
    if surface != vk::SurfaceKHR::null() {
        if let Some(loader) = &rhi.surface_loader {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }
    rhi.surfaces.remove(slot)
}

pub(super) fn delete_surface(handle: SurfaceHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        if let Some(device) = &rhi.device {
            unsafe { device.device_wait_idle() }.ok();
        }
        destroy_surface_slot(rhi, handle.raw().value)
    })
}

pub(super) fn get_surface_extent(handle: SurfaceHandle) -> RhiResult<Extent2d> {
    with_rhi(|rhi| {
        let swapchain = rhi.surfaces.get(handle.raw().value)?;
        Ok(Extent2d { width: swapchain.extent.width, height: swapchain.extent.height })
    })
}

pub(super) fn get_surface_format(handle: SurfaceHandle) -> RhiResult<TextureFormat> {
    with_rhi(|rhi| {
        let swapchain = rhi.surfaces.get(handle.raw().value)?;
        texture_format_from_vk(swapchain.format)
            .ok_or(RhiError::FormatUnsupported { format: TextureFormat::Bgra8Unorm })
    })
}

pub(super) fn get_surface_image_count(handle: SurfaceHandle) -> RhiResult<u32> {
    with_rhi(|rhi| Ok(rhi.surfaces.get(handle.raw().value)?.frames.len() as u32))
}

pub(super) fn acquire_next_frame(handle: SurfaceHandle) -> RhiResult<SurfaceTexture> {
    with_rhi(|rhi| {
        if !rhi.in_frame {
            fatal!("acquire_next_frame called without a current frame");
        }
        let frame_index = rhi.current_frame_index;
        let logical = (frame_index % FRAME_COUNT) as usize;

        let (headless, available, image_count, swapchain_raw, outstanding) = {
            let swapchain = rhi.surfaces.get(handle.raw().value)?;
            (
                swapchain.headless,
                swapchain.available[logical],
                swapchain.frames.len() as u32,
                swapchain.swapchain,
                swapchain.current_image.is_some(),
            )
        };
        if outstanding {
            fatal!("acquire_next_frame called with an un-presented image outstanding");
        }

        let mut suboptimal = false;
        let image_index = if headless {
            (frame_index % image_count as u64) as u32
        } else {
            let loader = rhi.swapchain_loader.clone().ok_or(RhiError::NotInitialized)?;
            let semaphore = rhi.fences.get(available.raw().value)?.semaphore;
            match unsafe {
                loader.acquire_next_image(swapchain_raw, u64::MAX, semaphore, vk::Fence::null())
            } {
                Ok((index, sub)) => {
                    suboptimal = sub;
                    index
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Err(RhiError::SwapchainOutOfDate),
                Err(err) => return Err(vk_err(err)),
            }
        };

        // consume the image-available fence for this logical frame
        let new_target = {
            let fence = rhi.fences.get_mut(available.raw().value)?;
            fence.target += 1;
            fence.target
        };
        if headless {
            // a headless image is ready the moment it is handed out
            super::fence::signal_target(rhi, available, new_target)?;
        }

        let (texture, view, complete) = {
            let swapchain = rhi.surfaces.get_mut(handle.raw().value)?;
            swapchain.current_image = Some(image_index);
            let frame = &swapchain.frames[image_index as usize];
            (frame.texture, frame.view, frame.complete)
        };

        // the frame borrows the fence pair until present
        let frame = rhi.current_frame();
        frame.image_available = available;
        frame.render_complete = complete;

        Ok(SurfaceTexture {
            surface: handle,
            texture,
            view,
            available,
            complete,
            suboptimal,
        })
    })
}

pub(super) fn present_curr_frame(handle: SurfaceHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        let (headless, current_image, swapchain_raw) = {
            let swapchain = rhi.surfaces.get(handle.raw().value)?;
            (swapchain.headless, swapchain.current_image, swapchain.swapchain)
        };
        let Some(image_index) = current_image else {
            fatal!("present called without a matching acquire");
        };

        let submitted_any = rhi.current_frame().submitted_any;
        if !submitted_any && !headless {
            dummy_present_submission(rhi, handle, image_index)?;
        }

        if headless {
            // no platform queue to consume render-complete; retire it on the
            // host when no submission will
            let complete = rhi.current_frame().render_complete;
            if complete.valid() && !submitted_any {
                let (kind, target) = {
                    let fence = rhi.fences.get(complete.raw().value)?;
                    (fence.kind, fence.target)
                };
                if kind == FenceKind::Timeline && target > 0 {
                    super::fence::signal_target(rhi, complete, target)?;
                }
            }
        } else {
            let complete = rhi.current_frame().render_complete;
            let semaphore = rhi.fences.get(complete.raw().value)?.semaphore;
            let loader = rhi.swapchain_loader.clone().ok_or(RhiError::NotInitialized)?;

            let wait_semaphores = [semaphore];
            let image_indices = [image_index];
            let swapchains = [swapchain_raw];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);
            match unsafe { loader.queue_present(rhi.present_queue, &present_info) } {
                Ok(_) | Err(vk::Result::SUBOPTIMAL_KHR) => {}
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    rhi.surfaces.get_mut(handle.raw().value)?.current_image = None;
                    return Err(RhiError::SwapchainOutOfDate);
                }
                Err(err) => return Err(vk_err(err)),
            }
        }

        rhi.surfaces.get_mut(handle.raw().value)?.current_image = None;
        Ok(())
    })
}

/// Nothing was submitted this frame: transition the image to present layout
/// with a minimal command buffer that consumes image-available and signals
/// render-complete, so presentation still synchronizes correctly.
fn dummy_present_submission(
    rhi: &mut VulkanRhi,
    handle: SurfaceHandle,
    image_index: u32,
) -> RhiResult<()> {
    let device = rhi.device()?.clone();
    let sync2 = rhi.synchronization2.clone().ok_or(RhiError::NotInitialized)?;

    let image = {
        let swapchain = rhi.surfaces.get(handle.raw().value)?;
        let frame = &swapchain.frames[image_index as usize];
        rhi.textures.get(frame.texture.raw().value)?.image
    };
    let available = rhi.current_frame().image_available;
    let complete = rhi.current_frame().render_complete;
    let available_sem = rhi.fences.get(available.raw().value)?.semaphore;
    let complete_sem = rhi.fences.get(complete.raw().value)?.semaphore;

    let inflight = rhi.current_frame().inflight;
    let queue = rhi.graphics_queue;
    let command_buffer = {
        let frame = rhi.current_frame();
        frame.submitted_any = true;
        frame.graphics_pool.allocate(&device, true)?
    };

    let begin_info = vk::CommandBufferBeginInfo::default()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    unsafe { device.begin_command_buffer(command_buffer, &begin_info) }.map_err(vk_err)?;

    let barrier = vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::NONE)
        .src_access_mask(vk::AccessFlags2::NONE)
        .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .dst_access_mask(vk::AccessFlags2::NONE)
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .level_count(1)
                .layer_count(1),
        );
    let barriers = [barrier];
    let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
    unsafe { sync2.cmd_pipeline_barrier2(command_buffer, &dependency) };
    unsafe { device.end_command_buffer(command_buffer) }.map_err(vk_err)?;

    let waits = [vk::SemaphoreSubmitInfo::default()
        .semaphore(available_sem)
        .stage_mask(vk::PipelineStageFlags2::NONE)];
    let signals = [vk::SemaphoreSubmitInfo::default()
        .semaphore(complete_sem)
        .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
    let buffers = [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
    let submit = vk::SubmitInfo2::default()
        .wait_semaphore_infos(&waits)
        .signal_semaphore_infos(&signals)
        .command_buffer_infos(&buffers);

    let fences = [inflight];
    unsafe { device.reset_fences(&fences) }.map_err(vk_err)?;
    unsafe { sync2.queue_submit2(queue, &[submit], inflight) }.map_err(vk_err)
}
