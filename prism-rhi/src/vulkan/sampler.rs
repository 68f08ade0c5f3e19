//! Samplers.

use ash::vk;

use crate::descriptors::SamplerDescriptor;
use crate::error::RhiResult;
use crate::handle::SamplerHandle;
use crate::slotmap::PoolObject;

use super::mappings::{address_mode_to_vk, compare_function_to_vk, filter_to_vk, mipmap_filter_to_vk};
use super::{vk_err, with_rhi};

#[derive(Default)]
pub(super) struct VulkanSampler {
    pub device: Option<ash::Device>,
    pub sampler: vk::Sampler,
}

impl PoolObject for VulkanSampler {
    fn live(&self) -> bool {
        self.sampler != vk::Sampler::null()
    }
}

pub(super) fn destroy(sampler: &mut VulkanSampler) {
    if let Some(device) = &sampler.device {
        unsafe { device.destroy_sampler(sampler.sampler, None) };
    }
    sampler.sampler = vk::Sampler::null();
}

pub(super) fn create_sampler(descriptor: &SamplerDescriptor) -> RhiResult<SamplerHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();

        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(descriptor.mag_filter))
            .min_filter(filter_to_vk(descriptor.min_filter))
            .mipmap_mode(mipmap_filter_to_vk(descriptor.mipmap_filter))
            .address_mode_u(address_mode_to_vk(descriptor.address_mode_u))
            .address_mode_v(address_mode_to_vk(descriptor.address_mode_v))
            .address_mode_w(address_mode_to_vk(descriptor.address_mode_w))
            .min_lod(descriptor.lod_min_clamp)
            .max_lod(descriptor.lod_max_clamp)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK);
        if descriptor.max_anisotropy > 1 {
            create_info = create_info
                .anisotropy_enable(true)
                .max_anisotropy(descriptor.max_anisotropy as f32);
        }
        if let Some(compare) = descriptor.compare {
            create_info = create_info
                .compare_enable(true)
                .compare_op(compare_function_to_vk(compare));
        }

        let sampler = unsafe { device.create_sampler(&create_info, None) }.map_err(vk_err)?;
        rhi.set_debug_label(sampler, descriptor.label.as_deref());
        Ok(SamplerHandle::new(rhi.samplers.add(VulkanSampler {
            device: Some(device),
            sampler,
        })))
    })
}

pub(super) fn delete_sampler(handle: SamplerHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.samplers.remove(handle.raw().value))
}
