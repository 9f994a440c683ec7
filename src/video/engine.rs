// Playback engine contract shared by the ffmpeg player and the panel
use std::fmt;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Playback state, owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Error categories reported through `PlayerEvent::ErrorOccurred`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerErrorCode {
    /// File could not be opened or read
    ResourceError,
    /// Container or codec not supported
    FormatError,
    AccessDenied,
}

impl fmt::Display for PlayerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerErrorCode::ResourceError => "resource error",
            PlayerErrorCode::FormatError => "format error",
            PlayerErrorCode::AccessDenied => "access denied",
        };
        f.write_str(name)
    }
}

/// Events emitted by the engine, drained by the UI thread in order
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    ErrorOccurred {
        code: PlayerErrorCode,
        message: String,
    },
    PlaybackStateChanged(PlaybackState),
}

/// Decoded RGBA frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: i64,
}

/// Where the engine delivers decoded frames.
///
/// Bounded; when the reader falls behind, the oldest queued frame is
/// discarded so the newest one always gets through.
#[derive(Clone)]
pub struct FrameSink {
    sender: Sender<VideoFrame>,
    // Lets the sender evict stale frames itself
    evict: Receiver<VideoFrame>,
}

impl FrameSink {
    /// Sink holding at most `capacity` frames, plus the receiving end
    pub fn bounded(capacity: usize) -> (Self, Receiver<VideoFrame>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let sink = Self {
            sender,
            evict: receiver.clone(),
        };
        (sink, receiver)
    }

    /// Queue a frame without blocking, dropping the oldest queued one if full
    pub fn present(&self, frame: VideoFrame) {
        let mut frame = frame;
        loop {
            match self.sender.try_send(frame) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.evict.try_recv();
                    frame = rejected;
                }
            }
        }
    }
}

/// Media playback engine as seen by the player panel.
///
/// Position and duration are in milliseconds. A duration of zero or less
/// means the media metadata is not known yet.
pub trait PlaybackEngine {
    fn set_source(&mut self, path: &Path);
    fn set_video_output(&mut self, sink: FrameSink);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn playback_state(&self) -> PlaybackState;
    fn position(&self) -> i64;
    fn duration(&self) -> i64;
    /// Next pending event, non-blocking
    fn poll_event(&mut self) -> Option<PlayerEvent>;
}
