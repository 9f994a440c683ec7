// Video player panel: transport controls, position readout and the detection trigger
mod controls;
mod format;
mod surface;
mod timer;

pub use controls::{PanelControls, PlayAffordance};

use surface::VideoSurface;
use timer::RefreshTimer;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::detection::{DetectionError, DetectionRequest, Detector};
use crate::settings::DetectionSettings;
use crate::video::{PlaybackEngine, PlaybackState, PlayerEvent};

/// Interval between position readout refreshes
pub const REFRESH_PERIOD: Duration = Duration::from_millis(100);

const MIN_IDLE_REPAINT: Duration = Duration::from_millis(16);

/// Requests the panel makes of its host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    /// Navigate back to the prior page
    Back,
}

/// Playback panel for a single video file
pub struct VideoPlayerPanel {
    video_path: PathBuf,
    engine: Box<dyn PlaybackEngine>,
    detector: Box<dyn Detector>,
    settings: DetectionSettings,
    surface: VideoSurface,
    controls: PanelControls,
    refresh_timer: RefreshTimer,
}

impl VideoPlayerPanel {
    /// Build the panel and hand the video to the engine.
    ///
    /// The path is not validated here; an unreadable file shows up as an
    /// engine error event.
    pub fn new(
        video_path: PathBuf,
        mut engine: Box<dyn PlaybackEngine>,
        detector: Box<dyn Detector>,
        settings: DetectionSettings,
    ) -> Self {
        let surface = VideoSurface::new();
        engine.set_video_output(surface.sink());
        engine.set_source(&video_path);

        tracing::info!("Player panel opened for {}", video_path.display());

        Self {
            video_path,
            engine,
            detector,
            settings,
            surface,
            controls: PanelControls::default(),
            refresh_timer: RefreshTimer::start(REFRESH_PERIOD, Instant::now()),
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn controls(&self) -> &PanelControls {
        &self.controls
    }

    pub fn toggle_play_pause(&mut self) {
        if self.engine.playback_state() == PlaybackState::Playing {
            self.engine.pause();
        } else {
            self.engine.play();
        }
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn update_buttons(&mut self, state: PlaybackState) {
        self.controls.update_buttons(state);
    }

    /// Timer callback: refresh the time label and slider once duration is known
    pub fn update_video_position(&mut self) {
        let duration = self.engine.duration();
        if duration <= 0 {
            return;
        }
        let position = self.engine.position();
        self.controls.show_position(position, duration);
    }

    /// Dispatch pending engine events to their handlers
    pub fn process_events(&mut self) {
        while let Some(event) = self.engine.poll_event() {
            match event {
                PlayerEvent::ErrorOccurred { code, message } => {
                    tracing::error!("Playback error ({}): {}", code, message);
                }
                PlayerEvent::PlaybackStateChanged(state) => self.update_buttons(state),
            }
        }
    }

    /// Per-frame housekeeping: events first, then the refresh timer
    pub fn tick(&mut self, now: Instant) {
        self.process_events();
        if self.refresh_timer.poll(now) {
            self.update_video_position();
        }
    }

    /// How long the UI may idle before the next frame. Immediate while playing
    /// so the surface keeps pace with the decoder, else until the next refresh.
    fn repaint_delay(&self, now: Instant) -> Duration {
        if self.engine.playback_state() == PlaybackState::Playing {
            Duration::ZERO
        } else {
            self.refresh_timer.remaining(now).max(MIN_IDLE_REPAINT)
        }
    }

    /// Run detection on the loaded video. Blocks until the detector returns.
    pub fn run_detection(&mut self) -> Result<(), DetectionError> {
        let request = DetectionRequest::for_video(&self.video_path, &self.settings);
        self.detector.run(&request)
    }

    /// Stop playback if it is not already stopped
    pub fn close(&mut self) {
        if self.engine.playback_state() != PlaybackState::Stopped {
            tracing::debug!("Stopping playback of {}", self.video_path.display());
            self.engine.stop();
        }
    }

    /// Render the panel. Returns the navigation the user asked for, or the
    /// detection failure if the process button was pressed and the run failed.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        ui: &mut egui::Ui,
    ) -> Result<Option<PanelAction>, DetectionError> {
        let now = Instant::now();
        self.tick(now);
        self.surface.update(ctx);
        let delay = self.repaint_delay(now);
        if delay.is_zero() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(delay);
        }

        let mut action = None;
        let mut process_clicked = false;

        // Top bar
        ui.horizontal(|ui| {
            if ui.button("⬅ Back").clicked() {
                action = Some(PanelAction::Back);
            }
            ui.add_space(8.0);
            let file_name = self.video_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.video_path.display().to_string());
            ui.label(egui::RichText::new(file_name).strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🔍 Process").clicked() {
                    process_clicked = true;
                }
            });
        });

        ui.add_space(8.0);
        self.surface.paint(ui);
        ui.add_space(10.0);

        // Controls bar
        ui.horizontal(|ui| {
            let play = self.controls.play_button;
            if ui.button(format!("{} {}", play.icon(), play.label())).clicked() {
                self.toggle_play_pause();
            }

            if ui.add_enabled(self.controls.stop_enabled, egui::Button::new("⏹ Stop")).clicked() {
                self.stop();
            }

            // Position indicator only, dragging does not seek
            let mut value = self.controls.slider_value;
            let slider = egui::Slider::new(&mut value, 0..=self.controls.slider_max)
                .show_value(false)
                .trailing_fill(true);
            ui.add_sized([(ui.available_width() - 200.0).max(80.0), 20.0], slider);

            ui.label(egui::RichText::new(&self.controls.time_label)
                .monospace()
                .color(egui::Color32::from_rgb(130, 138, 150)));
        });

        if process_clicked {
            self.run_detection()?;
        }

        Ok(action)
    }
}

impl Drop for VideoPlayerPanel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{FrameSink, PlayerErrorCode};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Command {
        Play,
        Pause,
        Stop,
    }

    #[derive(Default)]
    struct EngineLog {
        source: Option<PathBuf>,
        has_output: bool,
        state: PlaybackState,
        position: i64,
        duration: i64,
        commands: Vec<Command>,
        events: VecDeque<PlayerEvent>,
    }

    impl EngineLog {
        fn count(&self, command: Command) -> usize {
            self.commands.iter().filter(|c| **c == command).count()
        }
    }

    /// Engine that records commands and reports transitions like a real one
    struct FakeEngine(Rc<RefCell<EngineLog>>);

    impl FakeEngine {
        fn transition(&self, command: Command, state: PlaybackState) {
            let mut log = self.0.borrow_mut();
            log.commands.push(command);
            if log.state != state {
                log.state = state;
                log.events.push_back(PlayerEvent::PlaybackStateChanged(state));
            }
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn set_source(&mut self, path: &Path) {
            self.0.borrow_mut().source = Some(path.to_path_buf());
        }
        fn set_video_output(&mut self, _sink: FrameSink) {
            self.0.borrow_mut().has_output = true;
        }
        fn play(&mut self) {
            self.transition(Command::Play, PlaybackState::Playing);
        }
        fn pause(&mut self) {
            self.transition(Command::Pause, PlaybackState::Paused);
        }
        fn stop(&mut self) {
            self.transition(Command::Stop, PlaybackState::Stopped);
        }
        fn playback_state(&self) -> PlaybackState {
            self.0.borrow().state
        }
        fn position(&self) -> i64 {
            self.0.borrow().position
        }
        fn duration(&self) -> i64 {
            self.0.borrow().duration
        }
        fn poll_event(&mut self) -> Option<PlayerEvent> {
            self.0.borrow_mut().events.pop_front()
        }
    }

    struct FakeDetector {
        requests: Rc<RefCell<Vec<DetectionRequest>>>,
        fail: bool,
    }

    impl Detector for FakeDetector {
        fn run(&self, request: &DetectionRequest) -> Result<(), DetectionError> {
            self.requests.borrow_mut().push(request.clone());
            if self.fail {
                return Err(DetectionError::Spawn {
                    program: "python3".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            Ok(())
        }
    }

    struct Harness {
        panel: VideoPlayerPanel,
        engine: Rc<RefCell<EngineLog>>,
        requests: Rc<RefCell<Vec<DetectionRequest>>>,
    }

    fn settings() -> DetectionSettings {
        DetectionSettings {
            venv_dir: PathBuf::from("venv"),
            yolov5_dir: PathBuf::from("yolov5"),
            yolo_weights: PathBuf::from("weights/best.pt"),
            output_dir: PathBuf::from("out"),
            output_folder_name: "runs".to_string(),
        }
    }

    fn harness_with(fail_detection: bool) -> Harness {
        let engine = Rc::new(RefCell::new(EngineLog::default()));
        let requests = Rc::new(RefCell::new(Vec::new()));
        let panel = VideoPlayerPanel::new(
            PathBuf::from("/videos/clip.mp4"),
            Box::new(FakeEngine(Rc::clone(&engine))),
            Box::new(FakeDetector {
                requests: Rc::clone(&requests),
                fail: fail_detection,
            }),
            settings(),
        );
        Harness {
            panel,
            engine,
            requests,
        }
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    #[test]
    fn test_construction_wires_engine() {
        let h = harness();
        let log = h.engine.borrow();

        assert_eq!(log.source, Some(PathBuf::from("/videos/clip.mp4")));
        assert!(log.has_output);
        assert!(log.commands.is_empty());
        assert_eq!(h.panel.controls(), &PanelControls::default());
    }

    #[test]
    fn test_toggle_from_stopped_plays() {
        let mut h = harness();
        h.panel.toggle_play_pause();
        assert_eq!(h.engine.borrow().commands, vec![Command::Play]);
    }

    #[test]
    fn test_toggle_from_playing_pauses() {
        let mut h = harness();
        h.panel.toggle_play_pause();
        h.panel.toggle_play_pause();
        assert_eq!(h.engine.borrow().commands, vec![Command::Play, Command::Pause]);
    }

    #[test]
    fn test_toggle_from_paused_plays() {
        let mut h = harness();
        h.engine.borrow_mut().state = PlaybackState::Paused;
        h.panel.toggle_play_pause();
        assert_eq!(h.engine.borrow().commands, vec![Command::Play]);
    }

    #[test]
    fn test_state_events_update_buttons() {
        let mut h = harness();

        h.panel.toggle_play_pause();
        h.panel.process_events();
        assert_eq!(h.panel.controls().play_button, PlayAffordance::Pause);
        assert!(h.panel.controls().stop_enabled);

        h.panel.toggle_play_pause();
        h.panel.process_events();
        assert_eq!(h.panel.controls().play_button, PlayAffordance::Play);
        assert!(h.panel.controls().stop_enabled);

        h.panel.stop();
        h.panel.process_events();
        assert_eq!(h.panel.controls().play_button, PlayAffordance::Play);
        assert!(!h.panel.controls().stop_enabled);
    }

    #[test]
    fn test_error_events_are_swallowed() {
        let mut h = harness();
        h.engine.borrow_mut().events.push_back(PlayerEvent::ErrorOccurred {
            code: PlayerErrorCode::ResourceError,
            message: "No such file".to_string(),
        });

        h.panel.process_events();

        assert!(h.engine.borrow().events.is_empty());
        assert_eq!(h.panel.controls(), &PanelControls::default());
    }

    #[test]
    fn test_position_update_waits_for_duration() {
        let mut h = harness();
        h.engine.borrow_mut().position = 500;

        for duration in [0, -1] {
            h.engine.borrow_mut().duration = duration;
            h.panel.update_video_position();
            assert_eq!(h.panel.controls(), &PanelControls::default());
        }
    }

    #[test]
    fn test_position_update_formats_readout() {
        let mut h = harness();
        {
            let mut log = h.engine.borrow_mut();
            log.position = 1_000;
            log.duration = 3_661_001;
        }

        h.panel.update_video_position();

        let controls = h.panel.controls();
        assert_eq!(controls.time_label, "00:00:01.000/01:01:01.001");
        assert_eq!(controls.slider_max, 3_661_001);
        assert_eq!(controls.slider_value, 1_000);
        assert!(h.engine.borrow().commands.is_empty());
    }

    #[test]
    fn test_tick_respects_refresh_period() {
        let mut h = harness();
        {
            let mut log = h.engine.borrow_mut();
            log.position = 250;
            log.duration = 10_000;
        }

        // Timer was started during construction, so an immediate tick is too early
        h.panel.tick(Instant::now());
        assert!(h.panel.controls().time_label.is_empty());

        h.panel.tick(Instant::now() + REFRESH_PERIOD);
        assert_eq!(h.panel.controls().time_label, "00:00:00.250/00:00:10.000");
    }

    #[test]
    fn test_process_runs_detection_once_with_fixed_parameters() {
        let mut h = harness();
        h.panel.run_detection().unwrap();

        let requests = h.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            DetectionRequest {
                source: PathBuf::from("/videos/clip.mp4"),
                weights: PathBuf::from("weights/best.pt"),
                project: PathBuf::from("out").join("runs"),
                conf_thres: 0.5,
                save_txt: true,
            }
        );
    }

    #[test]
    fn test_detection_failure_is_returned() {
        let mut h = harness_with(true);
        let result = h.panel.run_detection();
        assert!(matches!(result, Err(DetectionError::Spawn { .. })));
        assert_eq!(h.requests.borrow().len(), 1);
    }

    #[test]
    fn test_repaints_every_frame_while_playing() {
        let mut h = harness();
        let now = Instant::now();

        h.panel.toggle_play_pause();
        h.panel.tick(now + REFRESH_PERIOD);
        assert_eq!(h.panel.repaint_delay(now + REFRESH_PERIOD), Duration::ZERO);

        h.panel.toggle_play_pause();
        let idle = h.panel.repaint_delay(now + REFRESH_PERIOD);
        assert!(idle >= MIN_IDLE_REPAINT);
        assert!(idle <= REFRESH_PERIOD);
    }

    #[test]
    fn test_close_while_playing_stops_once() {
        let h = harness();
        let engine = Rc::clone(&h.engine);
        let mut panel = h.panel;

        panel.toggle_play_pause();
        panel.close();
        drop(panel);

        assert_eq!(engine.borrow().count(Command::Stop), 1);
        assert_eq!(engine.borrow().state, PlaybackState::Stopped);
    }

    #[test]
    fn test_close_while_paused_stops_once() {
        let h = harness();
        let engine = Rc::clone(&h.engine);
        engine.borrow_mut().state = PlaybackState::Paused;

        drop(h.panel);

        assert_eq!(engine.borrow().count(Command::Stop), 1);
    }

    #[test]
    fn test_close_while_stopped_issues_no_stop() {
        let h = harness();
        let engine = Rc::clone(&h.engine);
        let mut panel = h.panel;

        panel.close();
        drop(panel);

        assert_eq!(engine.borrow().count(Command::Stop), 0);
    }
}
