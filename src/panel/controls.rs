// Presentation state of the panel's controls, rendered by egui every frame
use crate::video::PlaybackState;

use super::format::format_time;

/// What the play/pause button currently offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAffordance {
    Play,
    Pause,
}

impl PlayAffordance {
    pub fn icon(self) -> &'static str {
        match self {
            PlayAffordance::Play => "▶",
            PlayAffordance::Pause => "⏸",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayAffordance::Play => "Play",
            PlayAffordance::Pause => "Pause",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelControls {
    pub play_button: PlayAffordance,
    pub stop_enabled: bool,
    pub time_label: String,
    pub slider_max: i64,
    pub slider_value: i64,
}

impl Default for PanelControls {
    fn default() -> Self {
        Self {
            play_button: PlayAffordance::Play,
            stop_enabled: false,
            time_label: String::new(),
            slider_max: 0,
            slider_value: 0,
        }
    }
}

impl PanelControls {
    /// Reflect a playback state in the transport buttons
    pub fn update_buttons(&mut self, state: PlaybackState) {
        self.stop_enabled = state != PlaybackState::Stopped;
        self.play_button = if state == PlaybackState::Playing {
            PlayAffordance::Pause
        } else {
            PlayAffordance::Play
        };
    }

    /// Show position and duration. Unknown duration (zero or less) leaves
    /// the readout as it was.
    pub fn show_position(&mut self, position: i64, duration: i64) {
        if duration <= 0 {
            return;
        }
        let position = position.clamp(0, duration);
        self.time_label = format!(
            "{}/{}",
            format_time(position as u64),
            format_time(duration as u64)
        );
        self.slider_max = duration;
        self.slider_value = position;
    }
}
