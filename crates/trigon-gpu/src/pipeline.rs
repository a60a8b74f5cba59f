//! Render pass and pipeline layout creation.

use ash::vk;
use std::io::Cursor;

use crate::error::{GpuError, Result};
use crate::lifecycle::ResourceKind;

/// Convert raw shader bytes into SPIR-V words.
///
/// The byte length must be a non-zero multiple of four. Byte-swapped modules
/// are corrected by `read_spv`.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() {
        return Err(GpuError::InvalidShader("empty bytecode".to_string()));
    }
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| GpuError::InvalidShader(e.to_string()))
}

/// Describe the single color attachment presented to the swapchain.
pub fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

/// Create a render pass with one color attachment and one graphics subpass.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    let attachments = [color_attachment(format)];
    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses);

    // SAFETY: the attachment and subpass arrays outlive this call.
    let render_pass = unsafe { device.create_render_pass(&create_info, None) }
        .map_err(GpuError::creation(ResourceKind::RenderPass))?;
    tracing::debug!("Created render pass ({:?})", format);
    Ok(render_pass)
}

/// Create a shader module from SPIR-V words.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    // SAFETY: guaranteed by the caller.
    unsafe { device.create_shader_module(&create_info, None) }
        .map_err(GpuError::creation(ResourceKind::ShaderModule))
}

/// Create an empty pipeline layout, building the vertex and fragment shader
/// modules along the way.
///
/// The modules never outlive this call: they are destroyed before it
/// returns, whether the layout was created or not.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_pipeline_layout(
    device: &ash::Device,
    vertex_shader: &[u8],
    fragment_shader: &[u8],
) -> Result<vk::PipelineLayout> {
    // Decode both before creating anything
    let vertex_code = spirv_words(vertex_shader)?;
    let fragment_code = spirv_words(fragment_shader)?;

    // SAFETY: guaranteed by the caller.
    let vertex_module = unsafe { create_shader_module(device, &vertex_code) }?;
    // SAFETY: guaranteed by the caller.
    let fragment_module = match unsafe { create_shader_module(device, &fragment_code) } {
        Ok(module) => module,
        Err(e) => {
            // SAFETY: the vertex module was created above and is unused.
            unsafe { device.destroy_shader_module(vertex_module, None) };
            return Err(e);
        }
    };
    tracing::debug!("Created vertex and fragment shader modules");

    let layout_info = vk::PipelineLayoutCreateInfo::default();
    // SAFETY: an empty layout references no other objects.
    let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
        .map_err(GpuError::creation(ResourceKind::PipelineLayout));

    // SAFETY: no pipeline was built from the modules.
    unsafe {
        device.destroy_shader_module(fragment_module, None);
        device.destroy_shader_module(vertex_module, None);
    }
    tracing::debug!("Destroyed shader modules");

    let layout = layout?;
    tracing::debug!("Created pipeline layout");
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn aligned_bytes_become_words() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        assert_eq!(spirv_words(&bytes).unwrap(), vec![SPIRV_MAGIC, 0x0001_0000]);
    }

    #[test]
    fn byte_swapped_module_is_corrected() {
        let bytes = SPIRV_MAGIC.to_be_bytes();
        assert_eq!(spirv_words(&bytes).unwrap(), vec![SPIRV_MAGIC]);
    }

    #[test]
    fn unaligned_bytes_are_rejected() {
        let err = spirv_words(&[0x03, 0x02, 0x23]).unwrap_err();
        assert!(matches!(err, GpuError::InvalidShader(_)));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(spirv_words(&[]), Err(GpuError::InvalidShader(_))));
    }

    #[test]
    fn color_attachment_ends_presentable() {
        let attachment = color_attachment(vk::Format::B8G8R8A8_UNORM);
        assert_eq!(attachment.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(attachment.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(attachment.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }
}
