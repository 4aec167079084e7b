use anyhow::{anyhow, Result};
use skia_safe::{images, AlphaType, Color, ColorType, Data, ImageInfo, Paint, Rect};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowId,
};

use crate::args::Args;
use crate::config::Config;
use crate::dispatch::{self, FontCache, SkiaTarget};
use crate::overlay::{Overlay, ViewStatus};
use crate::render::{PageImage, PageSource};
use crate::window::GlWindow;

/// Current page, zoom and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub page: i32,
    pub zoom: f32,
    pub rotate: f32,
    initial_zoom: f32,
}

impl ViewState {
    pub fn new(page: i32, zoom: f32, rotate: f32) -> Self {
        Self {
            page,
            zoom,
            rotate,
            initial_zoom: zoom,
        }
    }

    /// Apply a key press. Returns the new state when the key changes the view.
    pub fn on_key(&self, key: &Key, page_count: i32, config: &Config) -> Option<Self> {
        let mut next = *self;
        let last = (page_count - 1).max(0);
        match key {
            Key::Named(NamedKey::PageDown) => next.page = (self.page + 1).min(last),
            Key::Named(NamedKey::PageUp) => next.page = (self.page - 1).max(0),
            Key::Named(NamedKey::Home) => next.page = 0,
            Key::Named(NamedKey::End) => next.page = last,
            Key::Character(c) if c.as_str() == "+" || c.as_str() == "=" => {
                next.zoom = config.clamp_zoom(self.zoom * config.zoom_step);
                if next.zoom <= self.zoom {
                    return None;
                }
            }
            Key::Character(c) if c.as_str() == "-" => {
                next.zoom = config.clamp_zoom(self.zoom / config.zoom_step);
                if next.zoom >= self.zoom {
                    return None;
                }
            }
            Key::Character(c) if c.as_str() == "0" => next.zoom = self.initial_zoom,
            Key::Character(c) if c.as_str() == "r" => next.rotate = (self.rotate + 90.0) % 360.0,
            _ => return None,
        }
        (next != *self).then_some(next)
    }
}

fn to_skia_image(page: &PageImage) -> Option<skia_safe::Image> {
    let info = ImageInfo::new(
        (page.width as i32, page.height as i32),
        ColorType::RGBA8888,
        AlphaType::Unpremul,
        None,
    );
    images::raster_from_data(&info, Data::new_copy(&page.rgba), page.row_bytes())
}

/// Swap in a newly rendered page. On failure the error is logged and both the
/// shown image and the view state stay as they were.
fn commit_view<I>(
    rendered: Result<I>,
    view: ViewState,
    image: &mut Option<I>,
    current: &mut ViewState,
) -> bool {
    match rendered {
        Ok(new_image) => {
            *image = Some(new_image);
            *current = view;
            true
        }
        Err(e) => {
            log::error!("{:#}", e);
            false
        }
    }
}

// Fields drop in declaration order: overlay state and the page image go before the window.
struct App {
    overlay: Option<(Overlay, FontCache)>,
    image: Option<skia_safe::Image>,
    gl: GlWindow,
    source: PageSource,
    config: Config,
    view: ViewState,
}

impl App {
    fn set_view(&mut self, view: ViewState) {
        let rendered = self
            .source
            .rasterize(view.page, view.zoom, view.rotate)
            .and_then(|page| {
                to_skia_image(&page)
                    .ok_or_else(|| anyhow!("Texture creation error for page {}", view.page + 1))
            });
        commit_view(rendered, view, &mut self.image, &mut self.view);
    }

    fn status(&self) -> ViewStatus {
        ViewStatus {
            document: self.source.display_name().to_string(),
            page: self.view.page,
            page_count: self.source.page_count(),
            zoom: self.view.zoom,
            rotate: self.view.rotate,
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let size = self.gl.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let status = self.status();
        let commands = match &mut self.overlay {
            Some((overlay, _)) => Some(overlay.layout(&self.gl.window, &status)),
            None => None,
        };

        let [r, g, b] = self.config.background;
        let image = self.image.clone();
        let canvas = self.gl.canvas();
        canvas.clear(Color::from_rgb(r, g, b));

        if let Some(image) = &image {
            let dst = Rect::from_wh(size.width as f32, size.height as f32);
            canvas.draw_image_rect(image, None, dst, &Paint::default());
        }

        if let (Some(list), Some((_, fonts))) = (commands, &mut self.overlay) {
            let mut target = SkiaTarget::new(canvas, fonts);
            let stats = dispatch::dispatch(&list.commands, &mut target);
            log::trace!("Overlay: {:?}", stats);
        }

        self.gl.present()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some((overlay, _)) = &mut self.overlay {
            let response = overlay.handle_event(&self.gl.window, &event);
            if response.repaint {
                self.gl.window.request_redraw();
            }
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(physical_size) => {
                if let Err(e) = self.gl.resize(physical_size.width, physical_size.height) {
                    log::error!("{:#}", e);
                    event_loop.exit();
                    return;
                }
                self.gl.window.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                match &event.logical_key {
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    Key::Character(c) if c.as_str() == "q" => event_loop.exit(),
                    key => {
                        if let Some(view) =
                            self.view.on_key(key, self.source.page_count(), &self.config)
                        {
                            self.set_view(view);
                            self.gl.window.request_redraw();
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    log::error!("{:#}", e);
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

/// Open the document, rasterize the requested page and run the window until closed.
pub fn run(args: Args, with_overlay: bool) -> Result<()> {
    let config = Config::load();

    let source = PageSource::open(&args.input)?;
    let page = source.rasterize(args.page, args.zoom, args.rotate)?;
    let image = to_skia_image(&page).ok_or_else(|| anyhow!("Texture creation error"))?;

    let title = config
        .window_title
        .clone()
        .unwrap_or_else(|| source.display_name().to_string());

    let el = EventLoop::new()?;
    let gl = GlWindow::create(&el, &title, page.width, page.height)?;

    let overlay = if with_overlay {
        let fonts = FontCache::new(&config.overlay_font_family)?;
        Some((Overlay::new(&gl.window), fonts))
    } else {
        None
    };

    let mut app = App {
        gl,
        source,
        config,
        view: ViewState::new(args.page, args.zoom, args.rotate),
        image: Some(image),
        overlay,
    };

    el.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: &str) -> Key {
        Key::Character(c.into())
    }

    #[test]
    fn test_page_navigation_clamped() {
        let config = Config::default();
        let view = ViewState::new(0, 100.0, 0.0);
        assert!(view.on_key(&Key::Named(NamedKey::PageUp), 3, &config).is_none());

        let next = view
            .on_key(&Key::Named(NamedKey::PageDown), 3, &config)
            .unwrap();
        assert_eq!(next.page, 1);

        let end = view.on_key(&Key::Named(NamedKey::End), 3, &config).unwrap();
        assert_eq!(end.page, 2);
        assert!(end.on_key(&Key::Named(NamedKey::PageDown), 3, &config).is_none());
    }

    #[test]
    fn test_zoom_keys_and_reset() {
        let config = Config::default();
        let view = ViewState::new(0, 80.0, 0.0);
        let zoomed = view.on_key(&key("+"), 1, &config).unwrap();
        assert_eq!(zoomed.zoom, 100.0);
        let reset = zoomed.on_key(&key("0"), 1, &config).unwrap();
        assert_eq!(reset.zoom, 80.0);
    }

    #[test]
    fn test_zoom_respects_bounds() {
        let config = Config::default();
        let view = ViewState::new(0, 2000.0, 0.0);
        assert!(view.on_key(&key("+"), 1, &config).is_none());
    }

    #[test]
    fn test_zoom_out_below_minimum_does_not_zoom_in() {
        let config = Config::default();
        let view = ViewState::new(0, 5.0, 0.0);
        assert!(view.on_key(&key("-"), 1, &config).is_none());
        let zoomed = view.on_key(&key("+"), 1, &config).unwrap();
        assert_eq!(zoomed.zoom, 10.0);
    }

    #[test]
    fn test_failed_render_keeps_previous_image_and_view() {
        let mut image = Some(1u32);
        let mut current = ViewState::new(0, 100.0, 0.0);
        let next = ViewState::new(1, 100.0, 0.0);

        let failed = Err(anyhow!("Texture creation error"));
        let changed = commit_view(failed, next, &mut image, &mut current);
        assert!(!changed);
        assert_eq!(image, Some(1));
        assert_eq!(current.page, 0);

        assert!(commit_view(Ok(2), next, &mut image, &mut current));
        assert_eq!(image, Some(2));
        assert_eq!(current.page, 1);
    }

    #[test]
    fn test_rotate_wraps() {
        let config = Config::default();
        let view = ViewState::new(0, 100.0, 270.0);
        let next = view.on_key(&key("r"), 1, &config).unwrap();
        assert_eq!(next.rotate, 0.0);
    }

    #[test]
    fn test_unbound_key_ignored() {
        let config = Config::default();
        let view = ViewState::new(0, 100.0, 0.0);
        assert!(view.on_key(&key("x"), 1, &config).is_none());
    }
}
