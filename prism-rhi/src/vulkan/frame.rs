//! Frame slots and pacing.
//!
//! A frame slot owns its inflight fence, one command pool per queue family,
//! and the frame's descriptor pool. Entering a slot waits the inflight fence
//! and resets the pools without freeing their memory; everything allocated
//! from them is implicitly recycled `FRAME_COUNT` frames later.

use ash::vk;

use crate::enums::QueueType;
use crate::error::{fatal, RhiError, RhiResult};
use crate::handle::{CommandEncoderHandle, FenceHandle};

use super::command::VulkanCommandBuffer;
use super::descriptor::VulkanDescriptorPool;
use super::{vk_err, with_rhi, VulkanRhi};

/// One command pool plus the buffers ever allocated from it. Reset marks the
/// memory reusable; buffers are handed out again instead of reallocated.
#[derive(Default)]
pub(super) struct VulkanCommandPool {
    pub pool: vk::CommandPool,
    primary: Vec<vk::CommandBuffer>,
    primary_used: usize,
    secondary: Vec<vk::CommandBuffer>,
    secondary_used: usize,
}

impl VulkanCommandPool {
    pub fn init(device: &ash::Device, queue_family: u32) -> RhiResult<Self> {
        let create_info =
            vk::CommandPoolCreateInfo::default().queue_family_index(queue_family);
        let pool = unsafe { device.create_command_pool(&create_info, None) }.map_err(vk_err)?;
        Ok(Self { pool, ..Self::default() })
    }

    pub fn reset(&mut self, device: &ash::Device) -> RhiResult<()> {
        unsafe { device.reset_command_pool(self.pool, vk::CommandPoolResetFlags::empty()) }
            .map_err(vk_err)?;
        self.primary_used = 0;
        self.secondary_used = 0;
        Ok(())
    }

    pub fn allocate(&mut self, device: &ash::Device, primary: bool) -> RhiResult<vk::CommandBuffer> {
        let (list, used) = if primary {
            (&mut self.primary, &mut self.primary_used)
        } else {
            (&mut self.secondary, &mut self.secondary_used)
        };
        if *used < list.len() {
            let buffer = list[*used];
            *used += 1;
            return Ok(buffer);
        }
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(if primary {
                vk::CommandBufferLevel::PRIMARY
            } else {
                vk::CommandBufferLevel::SECONDARY
            })
            .command_buffer_count(1);
        let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }.map_err(vk_err)?;
        list.push(buffers[0]);
        *used += 1;
        Ok(buffers[0])
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        if self.pool != vk::CommandPool::null() {
            unsafe { device.destroy_command_pool(self.pool, None) };
            self.pool = vk::CommandPool::null();
        }
    }
}

#[derive(Default)]
pub(super) struct VulkanFrame {
    pub frame_id: u64,
    /// Owned by the frame; signaled by the submit that signals
    /// render-complete.
    pub inflight: vk::Fence,
    /// Borrowed per-acquire from the surface; handle copies only.
    pub image_available: FenceHandle,
    pub render_complete: FenceHandle,

    pub graphics_pool: VulkanCommandPool,
    pub compute_pool: VulkanCommandPool,
    pub transfer_pool: VulkanCommandPool,
    pub descriptor_pool: VulkanDescriptorPool,

    pub encoders: Vec<VulkanCommandBuffer>,
    pub submitted_any: bool,
}

impl VulkanFrame {
    pub fn init(device: &ash::Device, queues: &super::QueueFamilies) -> RhiResult<Self> {
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let inflight = unsafe { device.create_fence(&fence_info, None) }.map_err(vk_err)?;

        let graphics = queues.graphics.ok_or(RhiError::BackendUnavailable(crate::Backend::Vulkan))?;
        Ok(Self {
            inflight,
            graphics_pool: VulkanCommandPool::init(device, graphics)?,
            compute_pool: VulkanCommandPool::init(device, queues.compute.unwrap_or(graphics))?,
            transfer_pool: VulkanCommandPool::init(device, queues.transfer.unwrap_or(graphics))?,
            descriptor_pool: VulkanDescriptorPool::default(),
            ..Self::default()
        })
    }

    /// Block until this slot's previous submission drained.
    pub fn wait(&self, device: &ash::Device) -> RhiResult<()> {
        let fences = [self.inflight];
        unsafe { device.wait_for_fences(&fences, true, u64::MAX) }.map_err(vk_err)
    }

    /// Recycle the transient pools. The inflight fence is reset only when a
    /// submission will signal it again this frame.
    pub fn reset(&mut self, device: &ash::Device, frame_id: u64) -> RhiResult<()> {
        self.frame_id = frame_id;
        self.graphics_pool.reset(device)?;
        self.compute_pool.reset(device)?;
        self.transfer_pool.reset(device)?;
        self.descriptor_pool.reset(device)?;
        self.encoders.clear();
        self.submitted_any = false;
        self.image_available = FenceHandle::default();
        self.render_complete = FenceHandle::default();
        Ok(())
    }

    pub fn pool_for(&mut self, queue: QueueType) -> &mut VulkanCommandPool {
        match queue {
            QueueType::Default => &mut self.graphics_pool,
            QueueType::Compute => &mut self.compute_pool,
            QueueType::Transfer => &mut self.transfer_pool,
        }
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        if self.inflight != vk::Fence::null() {
            unsafe { device.destroy_fence(self.inflight, None) };
            self.inflight = vk::Fence::null();
        }
        self.graphics_pool.destroy(device);
        self.compute_pool.destroy(device);
        self.transfer_pool.destroy(device);
        self.descriptor_pool.destroy(device);
    }
}

pub(super) fn new_frame() -> RhiResult<()> {
    with_rhi(|rhi| {
        if rhi.in_frame {
            fatal!("new_frame called while a frame is already current");
        }
        if rhi.frames.is_empty() {
            return Err(RhiError::NotInitialized);
        }
        let device = rhi.device()?.clone();
        let frame_id = rhi.current_frame_index;
        let frame = rhi.current_frame();
        frame.wait(&device)?;
        frame.reset(&device, frame_id)?;
        rhi.in_frame = true;
        Ok(())
    })
}

pub(super) fn end_frame() -> RhiResult<()> {
    with_rhi(|rhi| {
        if !rhi.in_frame {
            fatal!("end_frame called without a current frame");
        }
        rhi.in_frame = false;
        rhi.current_frame_index += 1;
        Ok(())
    })
}

/// Allocate an encoder record from the current frame for the given queue.
pub(super) fn allocate_encoder(
    rhi: &mut VulkanRhi,
    queue: QueueType,
    primary: bool,
) -> RhiResult<CommandEncoderHandle> {
    if !rhi.in_frame {
        fatal!("command buffer created outside a frame");
    }
    let device = rhi.device()?.clone();
    let frame_id = rhi.current_frame_index;
    let vk_queue = rhi.queue(queue);
    let frame = rhi.current_frame();
    let command_buffer = frame.pool_for(queue).allocate(&device, primary)?;

    let handle = CommandEncoderHandle::new(frame.encoders.len() as u32);
    frame.encoders.push(VulkanCommandBuffer::new(frame_id, vk_queue, command_buffer, primary));
    Ok(handle)
}
