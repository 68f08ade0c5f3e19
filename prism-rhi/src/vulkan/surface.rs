//! Native surface creation. The frontend's window handle triple is consumed
//! here; which field means what depends on the platform.

use ash::vk;

use crate::descriptors::WindowHandle;
use crate::error::{RhiError, RhiResult};

use super::{vk_err, VulkanRhi};

#[cfg(target_os = "windows")]
pub(super) fn create_native_surface(
    rhi: &VulkanRhi,
    window: &WindowHandle,
) -> RhiResult<vk::SurfaceKHR> {
    let create_info = vk::Win32SurfaceCreateInfoKHR::default()
        .hwnd(window.window as isize)
        .hinstance(window.native as isize);
    let loader = ash::khr::win32_surface::Instance::new(&rhi.entry, &rhi.instance);
    unsafe { loader.create_win32_surface(&create_info, None) }.map_err(vk_err)
}

#[cfg(target_os = "linux")]
pub(super) fn create_native_surface(
    rhi: &VulkanRhi,
    window: &WindowHandle,
) -> RhiResult<vk::SurfaceKHR> {
    if window.display == 0 {
        return Err(RhiError::DescriptorInvalid {
            field: "window",
            reason: "xcb surface needs a connection in the display field",
        });
    }
    let create_info = vk::XcbSurfaceCreateInfoKHR::default()
        .connection(window.display as *mut _)
        .window(window.window as u32);
    let loader = ash::khr::xcb_surface::Instance::new(&rhi.entry, &rhi.instance);
    unsafe { loader.create_xcb_surface(&create_info, None) }.map_err(vk_err)
}

#[cfg(target_os = "macos")]
pub(super) fn create_native_surface(
    rhi: &VulkanRhi,
    window: &WindowHandle,
) -> RhiResult<vk::SurfaceKHR> {
    // the window field carries a CAMetalLayer
    let create_info =
        vk::MetalSurfaceCreateInfoEXT::default().layer(window.window as *const _);
    let loader = ash::ext::metal_surface::Instance::new(&rhi.entry, &rhi.instance);
    unsafe { loader.create_metal_surface(&create_info, None) }.map_err(vk_err)
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
pub(super) fn create_native_surface(
    _rhi: &VulkanRhi,
    _window: &WindowHandle,
) -> RhiResult<vk::SurfaceKHR> {
    Err(RhiError::NotImplemented {
        op: "native surface creation",
        backend: crate::Backend::Vulkan,
    })
}
