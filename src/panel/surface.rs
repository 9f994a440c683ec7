// Video surface - receives frames from the engine and paints the newest one
use crossbeam_channel::Receiver;

use crate::video::{FrameSink, VideoFrame};

/// Frames buffered between the decoder thread and the UI
const FRAME_BUFFER: usize = 2;

pub struct VideoSurface {
    sink: FrameSink,
    receiver: Receiver<VideoFrame>,
    texture: Option<egui::TextureHandle>,
}

impl VideoSurface {
    pub fn new() -> Self {
        let (sink, receiver) = FrameSink::bounded(FRAME_BUFFER);
        Self {
            sink,
            receiver,
            texture: None,
        }
    }

    /// Sink to hand to the playback engine
    pub fn sink(&self) -> FrameSink {
        self.sink.clone()
    }

    /// Drain pending frames, keeping only the newest (non-blocking)
    fn latest_frame(&self) -> Option<VideoFrame> {
        self.receiver.try_iter().last()
    }

    /// Upload the newest frame, if any, as the surface texture
    pub fn update(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.latest_frame() {
            let color_image = egui::ColorImage::from_rgba_unmultiplied(
                [frame.width as usize, frame.height as usize],
                &frame.data,
            );
            match &mut self.texture {
                Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture(
                        "player_frame",
                        color_image,
                        egui::TextureOptions::LINEAR,
                    ));
                }
            }
        }
    }

    /// Paint into a 16:9 area spanning the available width
    pub fn paint(&self, ui: &mut egui::Ui) {
        let available_width = ui.available_width();
        let video_height = (available_width * 0.5625).min(ui.available_height() - 90.0).max(120.0);

        let (video_rect, _) = ui.allocate_exact_size(
            egui::vec2(available_width, video_height),
            egui::Sense::hover(),
        );

        let painter = ui.painter();
        painter.rect_filled(video_rect, 4.0, egui::Color32::from_rgb(10, 11, 14));

        match &self.texture {
            Some(texture) => {
                let image_rect = fit_rect(texture.size_vec2(), video_rect);
                painter.image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                painter.text(
                    video_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No video",
                    egui::FontId::proportional(14.0),
                    egui::Color32::from_rgb(130, 138, 150),
                );
            }
        }
    }
}

impl Default for VideoSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest rect with the image's aspect ratio centered inside `bounds`
fn fit_rect(image_size: egui::Vec2, bounds: egui::Rect) -> egui::Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return bounds;
    }
    let scale = (bounds.width() / image_size.x).min(bounds.height() / image_size.y);
    egui::Rect::from_center_size(bounds.center(), image_size * scale)
}
