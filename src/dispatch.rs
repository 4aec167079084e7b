use std::collections::HashMap;

use anyhow::{anyhow, Result};
use skia_safe::{
    Canvas, ClipOp, Color, Font, FontMgr, FontStyle, Paint, PaintStyle, RRect, Rect, Typeface,
};

use crate::commands::{Bounds, RenderCommand, Rgba};

/// Drawing backend the dispatcher issues calls against.
pub trait DrawTarget {
    fn fill_rect(&mut self, bounds: Bounds, color: Rgba, corner_radius: f32);
    fn stroke_rect(&mut self, bounds: Bounds, color: Rgba, width: f32, corner_radius: f32);
    fn draw_text(
        &mut self,
        text: &str,
        origin: (f32, f32),
        color: Rgba,
        font_size: f32,
        line_height: f32,
    );
    fn push_clip(&mut self, bounds: Bounds);
    fn pop_clip(&mut self);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub drawn: usize,
    pub clips: usize,
    pub unmatched_ends: usize,
}

/// Issue one drawing call per command, keeping clip pushes and pops paired.
pub fn dispatch<T: DrawTarget + ?Sized>(
    commands: &[RenderCommand],
    target: &mut T,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    let mut depth = 0usize;

    for command in commands {
        match command {
            RenderCommand::Rectangle {
                bounds,
                color,
                corner_radius,
            } => {
                target.fill_rect(*bounds, *color, *corner_radius);
                stats.drawn += 1;
            }
            RenderCommand::Border {
                bounds,
                color,
                width,
                corner_radius,
            } => {
                target.stroke_rect(*bounds, *color, *width, *corner_radius);
                stats.drawn += 1;
            }
            RenderCommand::Text {
                origin,
                text,
                color,
                font_size,
                line_height,
            } => {
                target.draw_text(text, *origin, *color, *font_size, *line_height);
                stats.drawn += 1;
            }
            RenderCommand::ScissorStart { bounds } => {
                target.push_clip(*bounds);
                depth += 1;
                stats.clips += 1;
            }
            RenderCommand::ScissorEnd => {
                if depth == 0 {
                    log::warn!("Scissor end without matching start, ignoring");
                    stats.unmatched_ends += 1;
                } else {
                    target.pop_clip();
                    depth -= 1;
                }
            }
        }
    }

    for _ in 0..depth {
        target.pop_clip();
    }
    stats
}

/// Typeface plus fonts already built for it, keyed by size in tenths of a pixel.
pub struct FontCache {
    typeface: Typeface,
    fonts: HashMap<u32, Font>,
}

impl FontCache {
    pub fn new(family: &str) -> Result<Self> {
        let font_mgr = FontMgr::default();
        let typeface = font_mgr
            .match_family_style(family, FontStyle::default())
            .or_else(|| font_mgr.match_family_style("sans-serif", FontStyle::default()))
            .ok_or_else(|| {
                anyhow!("Could not find font family {} or any sans-serif font", family)
            })?;
        Ok(Self {
            typeface,
            fonts: HashMap::new(),
        })
    }

    pub fn font(&mut self, size: f32) -> &Font {
        let key = (size * 10.0).round().max(1.0) as u32;
        let typeface = &self.typeface;
        self.fonts.entry(key).or_insert_with(|| {
            let mut font = Font::from_typeface(typeface.clone(), key as f32 / 10.0);
            font.set_subpixel(true);
            font
        })
    }
}

pub struct SkiaTarget<'a> {
    canvas: &'a Canvas,
    fonts: &'a mut FontCache,
}

impl<'a> SkiaTarget<'a> {
    pub fn new(canvas: &'a Canvas, fonts: &'a mut FontCache) -> Self {
        Self { canvas, fonts }
    }
}

fn to_rect(b: Bounds) -> Rect {
    Rect::from_xywh(b.x, b.y, b.width, b.height)
}

fn paint(color: Rgba) -> Paint {
    let mut paint = Paint::default();
    paint.set_color(Color::from_argb(color.a, color.r, color.g, color.b));
    paint.set_anti_alias(true);
    paint
}

impl DrawTarget for SkiaTarget<'_> {
    fn fill_rect(&mut self, bounds: Bounds, color: Rgba, corner_radius: f32) {
        let p = paint(color);
        if corner_radius > 0.0 {
            let rrect = RRect::new_rect_xy(to_rect(bounds), corner_radius, corner_radius);
            self.canvas.draw_rrect(rrect, &p);
        } else {
            self.canvas.draw_rect(to_rect(bounds), &p);
        }
    }

    fn stroke_rect(&mut self, bounds: Bounds, color: Rgba, width: f32, corner_radius: f32) {
        let mut p = paint(color);
        p.set_style(PaintStyle::Stroke);
        p.set_stroke_width(width);
        // Keep the stroke inside the box.
        let rect = to_rect(bounds).with_inset((width / 2.0, width / 2.0));
        if corner_radius > 0.0 {
            self.canvas
                .draw_rrect(RRect::new_rect_xy(rect, corner_radius, corner_radius), &p);
        } else {
            self.canvas.draw_rect(rect, &p);
        }
    }

    fn draw_text(
        &mut self,
        text: &str,
        origin: (f32, f32),
        color: Rgba,
        font_size: f32,
        line_height: f32,
    ) {
        let p = paint(color);
        let font = self.fonts.font(font_size);
        let (_, metrics) = font.metrics();
        let ascent = -metrics.ascent;
        for (i, line) in text.lines().enumerate() {
            let baseline = origin.1 + i as f32 * line_height + ascent;
            self.canvas.draw_str(line, (origin.0, baseline), font, &p);
        }
    }

    fn push_clip(&mut self, bounds: Bounds) {
        self.canvas.save();
        self.canvas.clip_rect(to_rect(bounds), ClipOp::Intersect, true);
    }

    fn pop_clip(&mut self) {
        self.canvas.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl DrawTarget for Recorder {
        fn fill_rect(&mut self, b: Bounds, _: Rgba, _: f32) {
            self.calls.push(format!("fill {} {}", b.x, b.y));
        }
        fn stroke_rect(&mut self, _: Bounds, _: Rgba, width: f32, _: f32) {
            self.calls.push(format!("stroke {}", width));
        }
        fn draw_text(&mut self, text: &str, _: (f32, f32), _: Rgba, _: f32, _: f32) {
            self.calls.push(format!("text {}", text));
        }
        fn push_clip(&mut self, _: Bounds) {
            self.calls.push("push".into());
        }
        fn pop_clip(&mut self) {
            self.calls.push("pop".into());
        }
    }

    const WHITE: Rgba = Rgba {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    fn bounds(x: f32, y: f32) -> Bounds {
        Bounds {
            x,
            y,
            width: 10.0,
            height: 10.0,
        }
    }

    #[test]
    fn test_one_call_per_command() {
        let commands = vec![
            RenderCommand::ScissorStart {
                bounds: bounds(0.0, 0.0),
            },
            RenderCommand::Rectangle {
                bounds: bounds(1.0, 2.0),
                color: WHITE,
                corner_radius: 0.0,
            },
            RenderCommand::Text {
                origin: (0.0, 0.0),
                text: "Page 1/3".into(),
                color: WHITE,
                font_size: 14.0,
                line_height: 17.0,
            },
            RenderCommand::Border {
                bounds: bounds(0.0, 0.0),
                color: WHITE,
                width: 2.0,
                corner_radius: 0.0,
            },
            RenderCommand::ScissorEnd,
        ];
        let mut rec = Recorder::default();
        let stats = dispatch(&commands, &mut rec);
        assert_eq!(
            rec.calls,
            vec!["push", "fill 1 2", "text Page 1/3", "stroke 2", "pop"]
        );
        assert_eq!(
            stats,
            DispatchStats {
                drawn: 3,
                clips: 1,
                unmatched_ends: 0
            }
        );
    }

    #[test]
    fn test_unmatched_end_ignored() {
        let mut rec = Recorder::default();
        let stats = dispatch(&[RenderCommand::ScissorEnd], &mut rec);
        assert!(rec.calls.is_empty());
        assert_eq!(stats.unmatched_ends, 1);
    }

    #[test]
    fn test_open_clips_popped_at_end() {
        let commands = vec![
            RenderCommand::ScissorStart {
                bounds: bounds(0.0, 0.0),
            },
            RenderCommand::ScissorStart {
                bounds: bounds(1.0, 1.0),
            },
        ];
        let mut rec = Recorder::default();
        dispatch(&commands, &mut rec);
        assert_eq!(rec.calls, vec!["push", "push", "pop", "pop"]);
    }
}
