//! Vulkan reference backend.
//!
//! The backend owns every object in slot-mapped pools keyed by frontend
//! handles; nothing here is ever handed to the application by pointer. All
//! entry points are plain functions reading a process-scope state cell, which
//! is the single place where unsafe FFI crosses into safe code.

mod buffer;
mod command;
mod descriptor;
mod device;
mod fence;
mod frame;
mod instance;
mod layout;
mod mappings;
mod pipeline;
mod sampler;
mod shader;
mod surface;
mod swapchain;
mod texture;

use std::sync::Mutex;

use ash::vk;

use crate::api::{PluginEntry, RenderApi};
use crate::error::{RhiError, RhiResult};
use crate::flags::RhiFlags;
use crate::slotmap::Slotmap;

use buffer::VulkanBuffer;
use fence::VulkanFence;
use frame::VulkanFrame;
use layout::{VulkanBindGroupLayout, VulkanPipelineLayout};
use pipeline::VulkanPipeline;
use sampler::VulkanSampler;
use shader::VulkanShader;
use swapchain::VulkanSwapchain;
use texture::{VulkanTexture, VulkanTextureView};

pub(crate) const FRAME_COUNT: u64 = 2;

/// Queue family indices discovered for the adapter.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct QueueFamilies {
    pub graphics: Option<u32>,
    pub compute: Option<u32>,
    pub transfer: Option<u32>,
    pub present: Option<u32>,
}

/// Whole backend state. Lives behind [`RHI`]; torn down member-wise in
/// delete_device / delete_instance.
pub(crate) struct VulkanRhi {
    pub flags: RhiFlags,
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub debug_utils: Option<ash::ext::debug_utils::Instance>,
    pub debug_messenger: vk::DebugUtilsMessengerEXT,
    pub surface_loader: Option<ash::khr::surface::Instance>,

    pub adapter: vk::PhysicalDevice,
    pub adapter_props: vk::PhysicalDeviceProperties,
    pub memory_props: vk::PhysicalDeviceMemoryProperties,

    pub device: Option<ash::Device>,
    pub swapchain_loader: Option<ash::khr::swapchain::Device>,
    pub dynamic_rendering: Option<ash::khr::dynamic_rendering::Device>,
    pub synchronization2: Option<ash::khr::synchronization2::Device>,
    pub debug_utils_device: Option<ash::ext::debug_utils::Device>,

    pub queues: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub compute_queue: vk::Queue,
    pub transfer_queue: vk::Queue,
    pub present_queue: vk::Queue,

    pub frames: Vec<VulkanFrame>,
    pub current_frame_index: u64,
    pub in_frame: bool,

    pub fences: Slotmap<VulkanFence>,
    pub buffers: Slotmap<VulkanBuffer>,
    pub textures: Slotmap<VulkanTexture>,
    pub views: Slotmap<VulkanTextureView>,
    pub samplers: Slotmap<VulkanSampler>,
    pub shaders: Slotmap<VulkanShader>,
    pub bind_group_layouts: Slotmap<VulkanBindGroupLayout>,
    pub pipeline_layouts: Slotmap<VulkanPipelineLayout>,
    pub render_pipelines: Slotmap<VulkanPipeline>,
    pub compute_pipelines: Slotmap<VulkanPipeline>,
    pub surfaces: Slotmap<VulkanSwapchain>,
}

// Mapped pointers and loader handles stay on the thread holding the frame;
// the core's scheduling model is single-threaded cooperative.
unsafe impl Send for VulkanRhi {}

static RHI: Mutex<Option<VulkanRhi>> = Mutex::new(None);

pub(crate) fn with_rhi<T>(f: impl FnOnce(&mut VulkanRhi) -> RhiResult<T>) -> RhiResult<T> {
    let mut guard = RHI.lock().unwrap();
    let rhi = guard.as_mut().ok_or(RhiError::NotInitialized)?;
    f(rhi)
}

pub(crate) fn install(state: VulkanRhi) {
    *RHI.lock().unwrap() = Some(state);
}

pub(crate) fn uninstall() {
    *RHI.lock().unwrap() = None;
}

pub(crate) fn take() -> Option<VulkanRhi> {
    RHI.lock().unwrap().take()
}

impl VulkanRhi {
    pub fn device(&self) -> RhiResult<&ash::Device> {
        self.device.as_ref().ok_or(RhiError::NotInitialized)
    }

    pub fn current_frame(&mut self) -> &mut VulkanFrame {
        let slot = (self.current_frame_index % FRAME_COUNT) as usize;
        &mut self.frames[slot]
    }

    pub fn queue(&self, queue: crate::QueueType) -> vk::Queue {
        match queue {
            crate::QueueType::Default => self.graphics_queue,
            crate::QueueType::Compute => self.compute_queue,
            crate::QueueType::Transfer => self.transfer_queue,
        }
    }

    /// Attach a debug name to a backend object when the DEBUG flag is set.
    pub fn set_debug_label(&self, object: impl vk::Handle, label: Option<&str>) {
        let Some(loader) = &self.debug_utils_device else { return };
        let Some(label) = label else { return };
        let Ok(name) = std::ffi::CString::new(label) else { return };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(object)
            .object_name(&name);
        let _ = unsafe { loader.set_debug_utils_object_name(&info) };
    }
}

/// Map a raw Vulkan error into the frontend taxonomy.
pub(crate) fn vk_err(result: vk::Result) -> RhiError {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            RhiError::OutOfMemory(crate::error::MemoryDomain::Host)
        }
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            RhiError::OutOfMemory(crate::error::MemoryDomain::Device)
        }
        vk::Result::TIMEOUT => RhiError::Timeout,
        vk::Result::SUBOPTIMAL_KHR => RhiError::SwapchainSuboptimal,
        vk::Result::ERROR_OUT_OF_DATE_KHR => RhiError::SwapchainOutOfDate,
        other => RhiError::BackendError {
            code: other.as_raw(),
            message: format!("{other:?}"),
        },
    }
}

/// Memory type index satisfying both the requirement mask and the property
/// flags, with an exact-match preference pass first.
pub(crate) fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> RhiResult<u32> {
    (0..props.memory_type_count)
        .find(|i| {
            let suitable = (type_bits & (1 << i)) != 0;
            let flags = props.memory_types[*i as usize].property_flags;
            suitable && flags.contains(required)
        })
        .ok_or(RhiError::OutOfMemory(crate::error::MemoryDomain::Device))
}

fn prepare() {
    // the ash entry is loaded lazily in create_instance; nothing global here
}

fn cleanup() {
    uninstall();
}

fn create() -> RenderApi {
    RenderApi {
        create_instance: Some(instance::create_instance),
        delete_instance: Some(instance::delete_instance),
        create_adapter: Some(instance::create_adapter),
        delete_adapter: Some(instance::delete_adapter),
        create_device: Some(device::create_device),
        delete_device: Some(device::delete_device),
        wait_idle: Some(device::wait_idle),
        create_surface: Some(swapchain::create_surface),
        delete_surface: Some(swapchain::delete_surface),
        get_surface_extent: Some(swapchain::get_surface_extent),
        get_surface_format: Some(swapchain::get_surface_format),
        get_surface_image_count: Some(swapchain::get_surface_image_count),
        new_frame: Some(frame::new_frame),
        end_frame: Some(frame::end_frame),
        acquire_next_frame: Some(swapchain::acquire_next_frame),
        present_curr_frame: Some(swapchain::present_curr_frame),
        create_fence: Some(fence::create_fence),
        delete_fence: Some(fence::delete_fence),
        wait_fence: Some(fence::wait_fence),
        signal_fence: Some(fence::signal_fence),
        fence_ready: Some(fence::fence_ready),
        reset_fence: Some(fence::reset_fence),
        fence_target: Some(fence::fence_target),
        create_buffer: Some(buffer::create_buffer),
        delete_buffer: Some(buffer::delete_buffer),
        map_buffer: Some(buffer::map_buffer),
        unmap_buffer: Some(buffer::unmap_buffer),
        get_mapped_range: Some(buffer::get_mapped_range),
        create_texture: Some(texture::create_texture),
        delete_texture: Some(texture::delete_texture),
        create_texture_view: Some(texture::create_texture_view),
        delete_texture_view: Some(texture::delete_texture_view),
        create_sampler: Some(sampler::create_sampler),
        delete_sampler: Some(sampler::delete_sampler),
        create_shader_module: Some(shader::create_shader_module),
        delete_shader_module: Some(shader::delete_shader_module),
        create_query_set: None,
        delete_query_set: None,
        create_blas: None,
        delete_blas: None,
        get_blas_sizes: None,
        create_tlas: None,
        delete_tlas: None,
        get_tlas_sizes: None,
        create_bind_group_layout: Some(layout::create_bind_group_layout),
        delete_bind_group_layout: Some(layout::delete_bind_group_layout),
        create_pipeline_layout: Some(layout::create_pipeline_layout),
        delete_pipeline_layout: Some(layout::delete_pipeline_layout),
        create_bind_group: Some(descriptor::create_bind_group),
        delete_bind_group: Some(descriptor::delete_bind_group),
        create_render_pipeline: Some(pipeline::create_render_pipeline),
        delete_render_pipeline: Some(pipeline::delete_render_pipeline),
        create_compute_pipeline: Some(pipeline::create_compute_pipeline),
        delete_compute_pipeline: Some(pipeline::delete_compute_pipeline),
        create_raytracing_pipeline: None,
        delete_raytracing_pipeline: None,
        create_command_buffer: Some(command::create_command_buffer),
        create_command_bundle: Some(command::create_command_bundle),
        submit_command_buffer: Some(command::submit_command_buffer),
        cmd_wait_fence: Some(command::cmd_wait_fence),
        cmd_signal_fence: Some(command::cmd_signal_fence),
        cmd_memory_barrier: Some(command::cmd_memory_barrier),
        cmd_buffer_barrier: Some(command::cmd_buffer_barrier),
        cmd_texture_barrier: Some(command::cmd_texture_barrier),
        cmd_begin_render_pass: Some(command::cmd_begin_render_pass),
        cmd_end_render_pass: Some(command::cmd_end_render_pass),
        cmd_set_render_pipeline: Some(command::cmd_set_render_pipeline),
        cmd_set_compute_pipeline: Some(command::cmd_set_compute_pipeline),
        cmd_set_raytracing_pipeline: None,
        cmd_set_bind_group: Some(command::cmd_set_bind_group),
        cmd_set_push_constants: Some(command::cmd_set_push_constants),
        cmd_set_index_buffer: Some(command::cmd_set_index_buffer),
        cmd_set_vertex_buffer: Some(command::cmd_set_vertex_buffer),
        cmd_set_viewport: Some(command::cmd_set_viewport),
        cmd_set_scissor_rect: Some(command::cmd_set_scissor_rect),
        cmd_set_blend_constant: Some(command::cmd_set_blend_constant),
        cmd_set_stencil_reference: Some(command::cmd_set_stencil_reference),
        cmd_draw: Some(command::cmd_draw),
        cmd_draw_indexed: Some(command::cmd_draw_indexed),
        cmd_draw_indirect: Some(command::cmd_draw_indirect),
        cmd_draw_indexed_indirect: Some(command::cmd_draw_indexed_indirect),
        cmd_dispatch_workgroups: Some(command::cmd_dispatch_workgroups),
        cmd_dispatch_workgroups_indirect: Some(command::cmd_dispatch_workgroups_indirect),
        cmd_copy_buffer_to_buffer: Some(command::cmd_copy_buffer_to_buffer),
        cmd_copy_buffer_to_texture: Some(command::cmd_copy_buffer_to_texture),
        cmd_copy_texture_to_buffer: Some(command::cmd_copy_texture_to_buffer),
        cmd_copy_texture_to_texture: Some(command::cmd_copy_texture_to_texture),
        cmd_clear_buffer: Some(command::cmd_clear_buffer),
        cmd_begin_occlusion_query: None,
        cmd_end_occlusion_query: None,
        cmd_write_timestamp: None,
        cmd_resolve_query_set: None,
        cmd_insert_debug_marker: Some(command::cmd_insert_debug_marker),
        cmd_push_debug_group: Some(command::cmd_push_debug_group),
        cmd_pop_debug_group: Some(command::cmd_pop_debug_group),
        cmd_execute_bundles: Some(command::cmd_execute_bundles),
    }
}

pub(crate) const PLUGIN: PluginEntry = PluginEntry { prepare, create, cleanup };
