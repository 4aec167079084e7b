//! Render commands derived from the layout pass.
//!
//! egui hands back a flat list of clipped shapes. The drawing side only
//! understands a handful of primitives, so each shape is mapped to one of the
//! commands below and clip-rectangle changes become explicit scissor
//! start/end pairs.

use egui::epaint::{ClippedShape, Shape};
use egui::{Color32, Pos2, Rect, Vec2};

/// Axis-aligned box in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn from_rect(rect: Rect, pixels_per_point: f32) -> Self {
        Self {
            x: rect.min.x * pixels_per_point,
            y: rect.min.y * pixels_per_point,
            width: rect.width() * pixels_per_point,
            height: rect.height() * pixels_per_point,
        }
    }
}

/// Unmultiplied 8-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Color32> for Rgba {
    fn from(c: Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Rectangle {
        bounds: Bounds,
        color: Rgba,
        corner_radius: f32,
    },
    Border {
        bounds: Bounds,
        color: Rgba,
        width: f32,
        corner_radius: f32,
    },
    Text {
        /// Top-left of the row.
        origin: (f32, f32),
        text: String,
        color: Rgba,
        font_size: f32,
        line_height: f32,
    },
    ScissorStart {
        bounds: Bounds,
    },
    ScissorEnd,
}

/// Result of converting one layout pass.
#[derive(Debug, Default)]
pub struct CommandList {
    pub commands: Vec<RenderCommand>,
    /// Shapes with no command equivalent (circles, paths, meshes, ...).
    pub unsupported: usize,
}

/// Convert clipped shapes into render commands.
///
/// `screen` is the layout area in points. Clip rectangles covering it are
/// treated as "no clip".
pub fn from_clipped_shapes(
    shapes: &[ClippedShape],
    screen: Rect,
    pixels_per_point: f32,
) -> CommandList {
    let mut builder = Builder {
        out: CommandList::default(),
        ppp: pixels_per_point,
        screen,
        clip: None,
    };
    for clipped in shapes {
        builder.set_clip(clipped.clip_rect);
        builder.push_shape(&clipped.shape);
    }
    builder.set_clip(screen);
    builder.out
}

struct Builder {
    out: CommandList,
    ppp: f32,
    screen: Rect,
    clip: Option<Rect>,
}

impl Builder {
    fn set_clip(&mut self, clip: Rect) {
        let wanted = if clip.contains_rect(self.screen) {
            None
        } else {
            let visible = clip.intersect(self.screen);
            if visible.is_positive() {
                Some(visible)
            } else {
                Some(Rect::from_min_size(self.screen.min, Vec2::ZERO))
            }
        };
        if wanted == self.clip {
            return;
        }
        if self.clip.is_some() {
            self.out.commands.push(RenderCommand::ScissorEnd);
        }
        if let Some(rect) = wanted {
            self.out.commands.push(RenderCommand::ScissorStart {
                bounds: Bounds::from_rect(rect, self.ppp),
            });
        }
        self.clip = wanted;
    }

    fn push_shape(&mut self, shape: &Shape) {
        match shape {
            Shape::Noop => {}
            Shape::Vec(shapes) => {
                for s in shapes {
                    self.push_shape(s);
                }
            }
            Shape::Rect(rect) => {
                let bounds = Bounds::from_rect(rect.rect, self.ppp);
                let corner_radius = rect.corner_radius.nw as f32 * self.ppp;
                if rect.fill != Color32::TRANSPARENT {
                    self.out.commands.push(RenderCommand::Rectangle {
                        bounds,
                        color: rect.fill.into(),
                        corner_radius,
                    });
                }
                if rect.stroke.width > 0.0 && rect.stroke.color != Color32::TRANSPARENT {
                    self.out.commands.push(RenderCommand::Border {
                        bounds,
                        color: rect.stroke.color.into(),
                        width: rect.stroke.width * self.ppp,
                        corner_radius,
                    });
                }
            }
            Shape::LineSegment { points, stroke } => {
                match line_as_rect(points[0], points[1], stroke.width) {
                    Some(rect) if stroke.color != Color32::TRANSPARENT => {
                        self.out.commands.push(RenderCommand::Rectangle {
                            bounds: Bounds::from_rect(rect, self.ppp),
                            color: stroke.color.into(),
                            corner_radius: 0.0,
                        });
                    }
                    Some(_) => {}
                    None => self.out.unsupported += 1,
                }
            }
            Shape::Text(text) => {
                let galley = &text.galley;
                if galley.rows.is_empty() {
                    return;
                }
                let format = galley.job.sections.first().map(|s| &s.format);
                let font_size = format.map_or(14.0, |f| f.font_id.size);
                let mut color = text
                    .override_text_color
                    .or_else(|| format.map(|f| f.color))
                    .unwrap_or(text.fallback_color);
                if color == Color32::PLACEHOLDER {
                    color = text.fallback_color;
                }
                if text.opacity_factor < 1.0 {
                    color = color.gamma_multiply(text.opacity_factor.max(0.0));
                }
                let line_height = galley.rect.height() / galley.rows.len() as f32;

                // One command per laid-out row, so wrapped labels keep their breaks.
                for placed in &galley.rows {
                    let line: String = placed.row.glyphs.iter().map(|g| g.chr).collect();
                    if line.trim().is_empty() {
                        continue;
                    }
                    let origin = text.pos + placed.pos.to_vec2();
                    self.out.commands.push(RenderCommand::Text {
                        origin: (origin.x * self.ppp, origin.y * self.ppp),
                        text: line,
                        color: color.into(),
                        font_size: font_size * self.ppp,
                        line_height: line_height * self.ppp,
                    });
                }
            }
            _ => self.out.unsupported += 1,
        }
    }
}

/// Horizontal or vertical segments drawn as thin filled rectangles.
fn line_as_rect(a: Pos2, b: Pos2, width: f32) -> Option<Rect> {
    let half = width / 2.0;
    if (a.y - b.y).abs() < f32::EPSILON {
        Some(Rect::from_min_max(
            Pos2::new(a.x.min(b.x), a.y - half),
            Pos2::new(a.x.max(b.x), a.y + half),
        ))
    } else if (a.x - b.x).abs() < f32::EPSILON {
        Some(Rect::from_min_max(
            Pos2::new(a.x - half, a.y.min(b.y)),
            Pos2::new(a.x + half, a.y.max(b.y)),
        ))
    } else {
        None
    }
}
