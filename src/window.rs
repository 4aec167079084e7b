use anyhow::{anyhow, Context, Result};
use std::ffi::CString;
use std::num::NonZeroU32;

use gl::types::*;
use glutin::{
    config::{ConfigTemplateBuilder, GlConfig},
    context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext},
    display::{GetGlDisplay, GlDisplay},
    prelude::{GlSurface, NotCurrentGlContext},
    surface::{Surface as GlutinSurface, SurfaceAttributesBuilder, WindowSurface},
};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasWindowHandle;
use skia_safe::{
    gpu::{self, backend_render_targets, gl::FramebufferInfo, SurfaceOrigin},
    ColorType, Surface,
};
use winit::{dpi::PhysicalSize, event_loop::EventLoop, window::Window};

/// Window, GL context and the skia surface drawn into it.
///
/// Field order matters: the skia surface and context go before the GL
/// context, and the window goes last. `Drop` abandons skia's GPU resources
/// first (prevents AMD GPU segfaults).
pub struct GlWindow {
    surface: Surface,
    gl_surface: GlutinSurface<WindowSurface>,
    gr_context: gpu::DirectContext,
    gl_context: PossiblyCurrentContext,
    pub window: Window,
    fb_info: FramebufferInfo,
    num_samples: usize,
    stencil_size: usize,
}

impl Drop for GlWindow {
    fn drop(&mut self) {
        self.gr_context.release_resources_and_abandon();
    }
}

fn non_zero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v.max(1)).unwrap_or(NonZeroU32::MIN)
}

fn create_surface(
    window: &Window,
    fb_info: FramebufferInfo,
    gr_context: &mut gpu::DirectContext,
    num_samples: usize,
    stencil_size: usize,
) -> Result<Surface> {
    let size = window.inner_size();
    let size = (
        i32::try_from(size.width.max(1)).context("window width out of range")?,
        i32::try_from(size.height.max(1)).context("window height out of range")?,
    );
    let backend_render_target =
        backend_render_targets::make_gl(size, num_samples, stencil_size, fb_info);

    gpu::surfaces::wrap_backend_render_target(
        gr_context,
        &backend_render_target,
        SurfaceOrigin::BottomLeft,
        ColorType::RGBA8888,
        None,
        None,
    )
    .ok_or_else(|| anyhow!("Surface creation error: could not wrap the GL framebuffer"))
}

impl GlWindow {
    /// Open a resizable window with an inner size of `width` x `height` pixels.
    pub fn create(
        event_loop: &EventLoop<()>,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let window_attributes = Window::default_attributes()
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
            .with_resizable(true)
            .with_title(title);

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);

        let display_builder =
            DisplayBuilder::new().with_window_attributes(Some(window_attributes));
        let (window, gl_config) = display_builder
            .build(event_loop, template, |configs| {
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() < accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    // The picker has to return a config, so an empty list has no error path.
                    .expect("display offered no GL configs")
            })
            .map_err(|e| anyhow!("Window creation error: {}", e))?;
        let window = window.ok_or_else(|| anyhow!("Window creation error: no window returned"))?;
        let raw_window_handle = window
            .window_handle()
            .context("Window creation error: no window handle")?
            .as_raw();

        let context_attributes = ContextAttributesBuilder::new().build(Some(raw_window_handle));
        let fallback_context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(None))
            .build(Some(raw_window_handle));

        let display = gl_config.display();
        let not_current_gl_context = unsafe {
            display
                .create_context(&gl_config, &context_attributes)
                .or_else(|_| display.create_context(&gl_config, &fallback_context_attributes))
                .context("Renderer creation error: no GL or GLES context")?
        };

        let (w, h): (u32, u32) = window.inner_size().into();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            non_zero(w),
            non_zero(h),
        );
        let gl_surface = unsafe {
            display
                .create_window_surface(&gl_config, &attrs)
                .context("Renderer creation error: could not create GL window surface")?
        };

        let gl_context = not_current_gl_context
            .make_current(&gl_surface)
            .context("Renderer creation error: could not make GL context current")?;

        gl::load_with(|s| match CString::new(s) {
            Ok(name) => display.get_proc_address(name.as_c_str()),
            Err(_) => std::ptr::null(),
        });
        let interface = skia_safe::gpu::gl::Interface::new_load_with(|name| {
            if name == "eglGetCurrentDisplay" {
                return std::ptr::null();
            }
            match CString::new(name) {
                Ok(name) => display.get_proc_address(name.as_c_str()),
                Err(_) => std::ptr::null(),
            }
        })
        .ok_or_else(|| anyhow!("Renderer creation error: could not load GL interface"))?;

        let mut gr_context = skia_safe::gpu::direct_contexts::make_gl(interface, None)
            .ok_or_else(|| anyhow!("Renderer creation error: could not create skia context"))?;

        let fb_info = {
            let mut fboid: GLint = 0;
            unsafe { gl::GetIntegerv(gl::FRAMEBUFFER_BINDING, &mut fboid) };
            FramebufferInfo {
                fboid: fboid.try_into().unwrap_or_default(),
                format: skia_safe::gpu::gl::Format::RGBA8.into(),
                ..Default::default()
            }
        };

        let num_samples = gl_config.num_samples() as usize;
        let stencil_size = gl_config.stencil_size() as usize;

        let surface =
            create_surface(&window, fb_info, &mut gr_context, num_samples, stencil_size)?;

        log::info!("Created {}x{} window \"{}\"", w, h, title);

        Ok(Self {
            surface,
            gl_surface,
            gr_context,
            gl_context,
            window,
            fb_info,
            num_samples,
            stencil_size,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface = create_surface(
            &self.window,
            self.fb_info,
            &mut self.gr_context,
            self.num_samples,
            self.stencil_size,
        )?;
        self.gl_surface
            .resize(&self.gl_context, non_zero(width), non_zero(height));
        Ok(())
    }

    pub fn canvas(&mut self) -> &skia_safe::Canvas {
        self.surface.canvas()
    }

    pub fn present(&mut self) -> Result<()> {
        self.gr_context.flush_and_submit();
        self.gl_surface
            .swap_buffers(&self.gl_context)
            .context("failed to swap buffers")
    }
}
