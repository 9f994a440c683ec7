// Video playback: engine contract and the ffmpeg-backed player

mod engine;
mod player;

pub use engine::{FrameSink, PlaybackEngine, PlaybackState, PlayerErrorCode, PlayerEvent, VideoFrame};
pub use player::VideoPlayer;
