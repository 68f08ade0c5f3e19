//! Shader modules. The SPIR-V blob is taken verbatim; reflection and
//! translation live in the compiler plugin, not here.

use ash::vk;

use crate::descriptors::ShaderModuleDescriptor;
use crate::enums::ShaderBlobKind;
use crate::error::{RhiError, RhiResult};
use crate::handle::ShaderModuleHandle;
use crate::slotmap::PoolObject;

use super::{vk_err, with_rhi};

#[derive(Default)]
pub(super) struct VulkanShader {
    pub device: Option<ash::Device>,
    pub module: vk::ShaderModule,
}

impl PoolObject for VulkanShader {
    fn live(&self) -> bool {
        self.module != vk::ShaderModule::null()
    }
}

pub(super) fn destroy(shader: &mut VulkanShader) {
    if let Some(device) = &shader.device {
        unsafe { device.destroy_shader_module(shader.module, None) };
    }
    shader.module = vk::ShaderModule::null();
}

pub(super) fn create_shader_module(
    descriptor: &ShaderModuleDescriptor,
) -> RhiResult<ShaderModuleHandle> {
    if descriptor.kind != ShaderBlobKind::SpirV {
        return Err(RhiError::DescriptorInvalid {
            field: "kind",
            reason: "the vulkan backend consumes SPIR-V only",
        });
    }
    if descriptor.code.len() % 4 != 0 {
        return Err(RhiError::DescriptorInvalid {
            field: "code",
            reason: "SPIR-V blob length must be a multiple of 4",
        });
    }
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let words: Vec<u32> = descriptor
            .code
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(vk_err)?;
        rhi.set_debug_label(module, descriptor.label.as_deref());
        Ok(ShaderModuleHandle::new(rhi.shaders.add(VulkanShader {
            device: Some(device),
            module,
        })))
    })
}

pub(super) fn delete_shader_module(handle: ShaderModuleHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.shaders.remove(handle.raw().value))
}
