//! Fences backed by semaphores.
//!
//! The timeline flavor carries a monotone target: `reset` advances the target
//! past the current counter, `signal` raises the counter, `ready` compares
//! the two. The binary flavor exists only because swapchain acquisition
//! demands it; its target is CPU-side bookkeeping so frame pacing can still
//! observe per-frame progress.

use ash::vk;

use crate::descriptors::FenceDescriptor;
use crate::enums::FenceKind;
use crate::error::{RhiError, RhiResult};
use crate::handle::FenceHandle;
use crate::slotmap::PoolObject;

use super::{vk_err, with_rhi};

#[derive(Default)]
pub(super) struct VulkanFence {
    pub device: Option<ash::Device>,
    pub semaphore: vk::Semaphore,
    pub kind: FenceKind,
    pub target: u64,
}

impl PoolObject for VulkanFence {
    fn live(&self) -> bool {
        self.semaphore != vk::Semaphore::null()
    }
}

pub(super) fn destroy(fence: &mut VulkanFence) {
    if let Some(device) = &fence.device {
        unsafe { device.destroy_semaphore(fence.semaphore, None) };
    }
    fence.semaphore = vk::Semaphore::null();
}

pub(super) fn create_semaphore(device: &ash::Device, kind: FenceKind) -> RhiResult<vk::Semaphore> {
    let mut timeline_info = vk::SemaphoreTypeCreateInfo::default()
        .semaphore_type(vk::SemaphoreType::TIMELINE)
        .initial_value(0);
    let mut create_info = vk::SemaphoreCreateInfo::default();
    if kind == FenceKind::Timeline {
        create_info = create_info.push_next(&mut timeline_info);
    }
    unsafe { device.create_semaphore(&create_info, None) }.map_err(vk_err)
}

pub(super) fn create_fence(descriptor: &FenceDescriptor) -> RhiResult<FenceHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let semaphore = create_semaphore(&device, descriptor.kind)?;
        let slot = rhi.fences.add(VulkanFence {
            device: Some(device),
            semaphore,
            kind: descriptor.kind,
            target: 0,
        });
        Ok(FenceHandle::new(slot))
    })
}

pub(super) fn delete_fence(handle: FenceHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.fences.remove(handle.raw().value))
}

pub(super) fn wait_fence(handle: FenceHandle, timeout: u64) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let fence = rhi.fences.get(handle.raw().value)?;
        if fence.kind == FenceKind::Binary {
            // binary semaphores cannot be host-waited; acquisition pacing is
            // handled by the inflight fence instead
            return Ok(());
        }
        let semaphores = [fence.semaphore];
        let values = [fence.target];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        match unsafe { device.wait_semaphores(&wait_info, timeout) } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::Timeout),
            Err(err) => Err(vk_err(err)),
        }
    })
}

pub(super) fn signal_fence(handle: FenceHandle, value: u64) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let fence = rhi.fences.get(handle.raw().value)?;
        if fence.kind == FenceKind::Binary {
            return Err(RhiError::ObjectInInvalidState(crate::ObjectKind::Fence));
        }
        let signal_info = vk::SemaphoreSignalInfo::default()
            .semaphore(fence.semaphore)
            .value(value);
        unsafe { device.signal_semaphore(&signal_info) }.map_err(vk_err)
    })
}

pub(super) fn fence_ready(handle: FenceHandle) -> RhiResult<bool> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let fence = rhi.fences.get(handle.raw().value)?;
        if fence.kind == FenceKind::Binary {
            return Ok(true);
        }
        let value = unsafe { device.get_semaphore_counter_value(fence.semaphore) }
            .map_err(vk_err)?;
        Ok(value >= fence.target)
    })
}

/// Advance the target past the current counter value.
pub(super) fn reset_fence(handle: FenceHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let fence = rhi.fences.get_mut(handle.raw().value)?;
        if fence.kind == FenceKind::Binary {
            fence.target += 1;
            return Ok(());
        }
        let value = unsafe { device.get_semaphore_counter_value(fence.semaphore) }
            .map_err(vk_err)?;
        fence.target = value + 1;
        Ok(())
    })
}

pub(super) fn fence_target(handle: FenceHandle) -> RhiResult<u64> {
    with_rhi(|rhi| Ok(rhi.fences.get(handle.raw().value)?.target))
}

/// Host-signal a timeline fence to a specific value. Used by the headless
/// present path, which has no queue to signal for it.
pub(super) fn signal_target(
    rhi: &mut super::VulkanRhi,
    handle: FenceHandle,
    value: u64,
) -> RhiResult<()> {
    let device = rhi.device()?.clone();
    let fence = rhi.fences.get(handle.raw().value)?;
    let signal_info = vk::SemaphoreSignalInfo::default()
        .semaphore(fence.semaphore)
        .value(value);
    unsafe { device.signal_semaphore(&signal_info) }.map_err(vk_err)
}
