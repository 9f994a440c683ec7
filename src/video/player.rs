// Playback engine backed by ffmpeg-next, decoding on a background thread
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::engine::{
    FrameSink, PlaybackEngine, PlaybackState, PlayerErrorCode, PlayerEvent, VideoFrame,
};

extern crate ffmpeg_next as ffmpeg;

/// Frames wider than this are scaled down before they reach the UI
const MAX_DISPLAY_WIDTH: u32 = 1280;

/// Playback status shared between the UI thread and the decoder thread
#[derive(Debug, Clone, Copy, Default)]
struct Status {
    state: PlaybackState,
    position_ms: i64,
    duration_ms: i64,
}

/// Shared status plus the event channel used to report transitions
#[derive(Clone)]
struct StatusHandle {
    status: Arc<Mutex<Status>>,
    events: Sender<PlayerEvent>,
}

impl StatusHandle {
    fn lock(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the playback state, emitting an event only on a real transition
    fn transition(&self, state: PlaybackState) {
        let changed = {
            let mut status = self.lock();
            let changed = status.state != state;
            status.state = state;
            if state == PlaybackState::Stopped {
                status.position_ms = 0;
            }
            changed
        };
        if changed {
            tracing::debug!("Playback state -> {:?}", state);
            let _ = self.events.send(PlayerEvent::PlaybackStateChanged(state));
        }
    }

    fn report_error(&self, code: PlayerErrorCode, message: String) {
        let _ = self.events.send(PlayerEvent::ErrorOccurred { code, message });
    }
}

/// Command sent to the decoder thread
enum PlayerCommand {
    Open(PathBuf),
    SetOutput(FrameSink),
    Play,
    Pause,
    Stop,
    Shutdown,
}

/// Video player with background decoding thread
pub struct VideoPlayer {
    status: StatusHandle,
    event_receiver: Receiver<PlayerEvent>,
    command_sender: Sender<PlayerCommand>,
    decoder_thread: Option<JoinHandle<()>>,
}

impl VideoPlayer {
    /// Create an idle player. Nothing is opened until `set_source` is called.
    pub fn new() -> Self {
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();

        let status = StatusHandle {
            status: Arc::new(Mutex::new(Status::default())),
            events: event_sender,
        };

        let worker_status = status.clone();
        let decoder_thread = thread::spawn(move || {
            DecoderWorker::new(worker_status, command_receiver).run();
        });

        Self {
            status,
            event_receiver,
            command_sender,
            decoder_thread: Some(decoder_thread),
        }
    }

    fn send(&self, command: PlayerCommand) {
        if self.command_sender.send(command).is_err() {
            tracing::warn!("Decoder thread is gone, command dropped");
        }
    }
}

impl Default for VideoPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine for VideoPlayer {
    fn set_source(&mut self, path: &Path) {
        self.status.transition(PlaybackState::Stopped);
        self.status.lock().duration_ms = 0;
        self.send(PlayerCommand::Open(path.to_path_buf()));
    }

    fn set_video_output(&mut self, sink: FrameSink) {
        self.send(PlayerCommand::SetOutput(sink));
    }

    fn play(&mut self) {
        self.status.transition(PlaybackState::Playing);
        self.send(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.status.transition(PlaybackState::Paused);
        self.send(PlayerCommand::Pause);
    }

    fn stop(&mut self) {
        self.status.transition(PlaybackState::Stopped);
        self.send(PlayerCommand::Stop);
    }

    fn playback_state(&self) -> PlaybackState {
        self.status.lock().state
    }

    fn position(&self) -> i64 {
        self.status.lock().position_ms
    }

    fn duration(&self) -> i64 {
        self.status.lock().duration_ms
    }

    fn poll_event(&mut self) -> Option<PlayerEvent> {
        self.event_receiver.try_recv().ok()
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        let _ = self.command_sender.send(PlayerCommand::Shutdown);
        if let Some(handle) = self.decoder_thread.take() {
            let _ = handle.join();
        }
    }
}

/// An opened media file ready for decoding
struct MediaStream {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    /// Milliseconds per stream time-base tick
    ms_per_tick: f64,
    display_width: u32,
    display_height: u32,
    duration_ms: i64,
    /// End of input was signalled and the decoder is handing back held frames
    draining: bool,
}

impl MediaStream {
    fn open(path: &Path) -> Result<Self, (PlayerErrorCode, String)> {
        if let Err(e) = std::fs::File::open(path) {
            let code = match e.kind() {
                std::io::ErrorKind::PermissionDenied => PlayerErrorCode::AccessDenied,
                _ => PlayerErrorCode::ResourceError,
            };
            return Err((code, format!("Cannot open {}: {}", path.display(), e)));
        }

        Self::open_decoder(path).map_err(|e| {
            let code = match e.downcast_ref::<ffmpeg::Error>() {
                Some(
                    ffmpeg::Error::InvalidData
                    | ffmpeg::Error::DecoderNotFound
                    | ffmpeg::Error::DemuxerNotFound
                    | ffmpeg::Error::StreamNotFound,
                ) => PlayerErrorCode::FormatError,
                Some(_) => PlayerErrorCode::ResourceError,
                None => PlayerErrorCode::FormatError,
            };
            (code, format!("{}: {}", path.display(), e))
        })
    }

    fn open_decoder(path: &Path) -> Result<Self> {
        ffmpeg::init()?;

        let input = ffmpeg::format::input(&path)?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("No video stream found"))?;

        let stream_index = stream.index();
        let time_base = stream.time_base();
        let ms_per_tick =
            1000.0 * f64::from(time_base.numerator()) / f64::from(time_base.denominator());

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context_decoder.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(anyhow!("Video stream has no dimensions"));
        }

        let display_width = width.min(MAX_DISPLAY_WIDTH);
        let display_height = (height as f32 * (display_width as f32 / width as f32)) as u32;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGBA,
            display_width,
            display_height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )?;

        let duration_ms = if input.duration() > 0 {
            input.duration() * 1000 / i64::from(ffmpeg::ffi::AV_TIME_BASE)
        } else if stream.duration() > 0 {
            (stream.duration() as f64 * ms_per_tick) as i64
        } else {
            0
        };

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            ms_per_tick,
            display_width,
            display_height,
            duration_ms,
            draining: false,
        })
    }

    /// Decode the next video frame, `None` at end of stream
    fn next_frame(&mut self) -> Option<VideoFrame> {
        let mut decoded = ffmpeg::frame::Video::empty();

        // Frames already buffered in the decoder come first
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert(&decoded);
        }

        let mut got_frame = false;
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                got_frame = true;
                break;
            }
        }

        if got_frame {
            return self.convert(&decoded);
        }

        // Out of packets: flush frames the decoder held back for reordering
        if !self.draining {
            self.draining = true;
            if let Err(e) = self.decoder.send_eof() {
                tracing::debug!("Decoder flush failed: {}", e);
            }
        }
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            self.convert(&decoded)
        } else {
            None
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Option<VideoFrame> {
        let mut scaled = ffmpeg::frame::Video::empty();
        if let Err(e) = self.scaler.run(decoded, &mut scaled) {
            tracing::warn!("Frame scaling failed: {}", e);
            return None;
        }

        let data = scaled.data(0);
        let stride = scaled.stride(0);
        let row_bytes = (self.display_width * 4) as usize;

        let mut rgba = Vec::with_capacity(row_bytes * self.display_height as usize);
        for y in 0..self.display_height as usize {
            let row_start = y * stride;
            rgba.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }

        let pts = decoded.pts().unwrap_or(0);
        Some(VideoFrame {
            data: rgba,
            width: self.display_width,
            height: self.display_height,
            timestamp_ms: ((pts as f64 * self.ms_per_tick) as i64).max(0),
        })
    }

    fn rewind(&mut self) {
        if let Err(e) = self.input.seek(0, ..0) {
            tracing::warn!("Rewind failed: {}", e);
        }
        self.decoder.flush();
        self.draining = false;
    }
}

/// State owned by the decoder thread
struct DecoderWorker {
    status: StatusHandle,
    commands: Receiver<PlayerCommand>,
    media: Option<MediaStream>,
    sink: Option<FrameSink>,
    playing: bool,
    /// Wall clock instant and media timestamp that playback pacing is measured from
    anchor: Option<(Instant, i64)>,
    /// Decoded frame waiting for its presentation time
    pending: Option<VideoFrame>,
}

impl DecoderWorker {
    fn new(status: StatusHandle, commands: Receiver<PlayerCommand>) -> Self {
        Self {
            status,
            commands,
            media: None,
            sink: None,
            playing: false,
            anchor: None,
            pending: None,
        }
    }

    fn run(mut self) {
        loop {
            if !self.playing {
                match self.commands.recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            return;
                        }
                    }
                    Err(_) => return,
                }
                continue;
            }

            if self.pending.is_none() {
                let next = self.media.as_mut().and_then(MediaStream::next_frame);
                match next {
                    Some(frame) => self.pending = Some(frame),
                    None => {
                        self.end_of_media();
                        continue;
                    }
                }
            }

            let Some(timestamp) = self.pending.as_ref().map(|f| f.timestamp_ms) else {
                continue;
            };
            let (start, start_ts) = *self.anchor.get_or_insert((Instant::now(), timestamp));
            let due = start + Duration::from_millis((timestamp - start_ts).max(0) as u64);

            // Wait for the presentation time, staying responsive to commands
            let now = Instant::now();
            if due > now {
                match self.commands.recv_timeout(due - now) {
                    Ok(command) => {
                        if !self.handle(command) {
                            return;
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }

            if let Some(frame) = self.pending.take() {
                self.present(frame);
            }
        }
    }

    /// Apply a command. Returns false when the thread should exit.
    fn handle(&mut self, command: PlayerCommand) -> bool {
        match command {
            PlayerCommand::Shutdown => return false,
            PlayerCommand::SetOutput(sink) => self.sink = Some(sink),
            PlayerCommand::Open(path) => self.open(&path),
            PlayerCommand::Play => {
                if self.media.is_some() {
                    self.playing = true;
                    self.anchor = None;
                } else {
                    self.playing = false;
                    self.status.transition(PlaybackState::Stopped);
                }
            }
            PlayerCommand::Pause => {
                self.playing = false;
                self.anchor = None;
            }
            PlayerCommand::Stop => {
                self.playing = false;
                self.anchor = None;
                self.pending = None;
                if let Some(media) = self.media.as_mut() {
                    media.rewind();
                }
            }
        }
        true
    }

    fn open(&mut self, path: &Path) {
        self.media = None;
        self.pending = None;
        self.anchor = None;
        self.playing = false;

        match MediaStream::open(path) {
            Ok(media) => {
                tracing::info!(
                    "Opened {} ({} ms, {}x{})",
                    path.display(),
                    media.duration_ms,
                    media.display_width,
                    media.display_height
                );
                {
                    let mut status = self.status.lock();
                    status.duration_ms = media.duration_ms;
                    status.position_ms = 0;
                }
                self.media = Some(media);
            }
            Err((code, message)) => {
                self.status.report_error(code, message);
                self.status.transition(PlaybackState::Stopped);
            }
        }
    }

    fn present(&mut self, frame: VideoFrame) {
        {
            let mut status = self.status.lock();
            // A stop issued on the UI thread wins over a frame decoded before it
            if status.state != PlaybackState::Playing {
                return;
            }
            status.position_ms = frame.timestamp_ms;
        }

        if let Some(sink) = &self.sink {
            sink.present(frame);
        }
    }

    fn end_of_media(&mut self) {
        self.playing = false;
        self.anchor = None;
        if let Some(media) = self.media.as_mut() {
            media.rewind();
        }
        self.status.transition(PlaybackState::Stopped);
    }
}
