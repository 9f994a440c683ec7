use eframe::egui;
use std::path::{Path, PathBuf};

use crate::detection::YoloV5Detector;
use crate::panel::{PanelAction, VideoPlayerPanel};
use crate::scanner;
use crate::settings::{AppSettings, RecentVideo};
use crate::video::VideoPlayer;

/// Main application state
pub struct DetectionApp {
    /// Page currently shown
    page: Page,

    /// Folder path input text
    folder_input: String,

    /// Videos found in the last listed folder
    folder_videos: Vec<PathBuf>,

    /// Persistent app settings (detection config, recent videos)
    app_settings: Option<AppSettings>,

    /// Recent videos as last read from settings
    recent_videos: Vec<RecentVideo>,
}

pub enum Page {
    /// Pick a video to play
    LoadVideos,
    /// Playing a video
    Player(Box<VideoPlayerPanel>),
    /// Host-level error display
    Error(String),
}

/// Navigation requested while rendering a page
enum Navigation {
    OpenVideo(PathBuf),
    LoadVideos,
    Error(String),
}

impl DetectionApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let app_settings = match AppSettings::open() {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Settings unavailable, using defaults: {}", e);
                None
            }
        };

        Self::with_settings(app_settings)
    }

    fn with_settings(app_settings: Option<AppSettings>) -> Self {
        let folder_input = app_settings.as_ref()
            .and_then(|s| s.get_last_folder())
            .unwrap_or_default();

        let folder_videos = if folder_input.is_empty() {
            Vec::new()
        } else {
            scanner::find_video_files(&PathBuf::from(&folder_input))
        };

        let mut app = Self {
            page: Page::LoadVideos,
            folder_input,
            folder_videos,
            app_settings,
            recent_videos: Vec::new(),
        };
        app.refresh_recent_videos();
        app
    }

    /// Re-read the recent list; call after anything that changes it
    fn refresh_recent_videos(&mut self) {
        self.recent_videos = match self.app_settings.as_ref().map(|s| s.get_recent_videos()) {
            Some(Ok(recent)) => recent,
            Some(Err(e)) => {
                tracing::warn!("Failed to load recent videos: {}", e);
                Vec::new()
            }
            None => Vec::new(),
        };
    }

    fn remember_video(&mut self, path: &Path) {
        if let Some(ref settings) = self.app_settings {
            if let Err(e) = settings.record_recent_video(path) {
                tracing::warn!("Failed to record recent video: {}", e);
            }
        }
        self.refresh_recent_videos();
    }

    fn forget_video(&mut self, id: i64) {
        if let Some(ref settings) = self.app_settings {
            if let Err(e) = settings.remove_recent_video(id) {
                tracing::warn!("Failed to remove recent video: {}", e);
            }
        }
        self.refresh_recent_videos();
    }

    /// Create a player panel for the video and show it
    fn open_video(&mut self, path: PathBuf) {
        self.close_player();

        let detection_settings = self.app_settings.as_ref()
            .map(|s| s.detection_settings())
            .unwrap_or_default();

        self.remember_video(&path);

        let detector = YoloV5Detector::new(&detection_settings);
        let panel = VideoPlayerPanel::new(
            path,
            Box::new(VideoPlayer::new()),
            Box::new(detector),
            detection_settings,
        );
        self.page = Page::Player(Box::new(panel));
    }

    /// Stop and drop the player panel if one is showing
    fn close_player(&mut self) {
        if let Page::Player(panel) = &mut self.page {
            tracing::info!("Closing player for {}", panel.video_path().display());
            panel.close();
        }
    }

    fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::OpenVideo(path) => self.open_video(path),
            Navigation::LoadVideos => {
                self.close_player();
                self.page = Page::LoadVideos;
            }
            Navigation::Error(msg) => {
                self.close_player();
                self.page = Page::Error(msg);
            }
        }
    }

    /// List the videos in the folder typed into the path input
    fn list_folder(&mut self) -> Option<Navigation> {
        let path = PathBuf::from(&self.folder_input);
        if !path.is_dir() {
            return Some(Navigation::Error(format!("Folder not found: {}", path.display())));
        }

        self.folder_videos = scanner::find_video_files(&path);
        if let Some(ref settings) = self.app_settings {
            let _ = settings.set_last_folder(&self.folder_input);
        }
        None
    }
}

impl eframe::App for DetectionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::none()
                .fill(egui::Color32::from_rgb(20, 22, 26))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(35, 40, 48)))
            )
            .show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Video Detection Player").size(16.0).strong());
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Play a video and run object detection on it").color(egui::Color32::from_rgb(100, 105, 115)));
            });
            ui.add_space(8.0);
        });

        let mut navigation = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            if matches!(self.page, Page::LoadVideos) {
                navigation = self.show_load_videos(ui);
                return;
            }

            navigation = match &mut self.page {
                Page::LoadVideos => None,
                Page::Player(panel) => match panel.show(ctx, ui) {
                    Ok(Some(PanelAction::Back)) => Some(Navigation::LoadVideos),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::error!("Detection failed: {}", e);
                        Some(Navigation::Error(format!("Detection failed: {}", e)))
                    }
                },
                Page::Error(msg) => show_error(ui, msg),
            };
        });

        if let Some(navigation) = navigation {
            self.navigate(navigation);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.close_player();
    }
}

impl DetectionApp {
    fn show_load_videos(&mut self, ui: &mut egui::Ui) -> Option<Navigation> {
        let mut navigation = None;
        let mut recent_to_remove: Option<i64> = None;

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(30.0);
                ui.label(egui::RichText::new("🎬").size(48.0));
                ui.add_space(12.0);
                ui.label(egui::RichText::new("Load a Video").size(24.0).strong());
                ui.add_space(6.0);
                ui.label(egui::RichText::new("Open a file, pick one from a folder, or reopen a recent video").color(egui::Color32::from_rgb(130, 138, 150)));
                ui.add_space(20.0);

                if ui.button("📂 Open file...").clicked() {
                    let extensions = ["mov", "mp4", "m4v", "avi", "mkv", "webm"];
                    if let Some(path) = rfd::FileDialog::new().add_filter("Video", &extensions).pick_file() {
                        navigation = Some(Navigation::OpenVideo(path));
                    }
                }

                ui.add_space(20.0);

                // Recent videos section
                if !self.recent_videos.is_empty() {
                    ui.label(egui::RichText::new("Recent Videos").size(16.0).color(egui::Color32::from_rgb(130, 138, 150)));
                    ui.add_space(8.0);

                    for video in &self.recent_videos {
                        ui.horizontal(|ui| {
                            if ui.button(&video.name).on_hover_text(video.path.display().to_string()).clicked() {
                                navigation = Some(Navigation::OpenVideo(video.path.clone()));
                            }

                            let last_opened = chrono::DateTime::parse_from_rfc3339(&video.last_opened)
                                .map(|dt| dt.format("%m/%d/%Y").to_string())
                                .unwrap_or_else(|_| "Unknown".to_string());
                            ui.label(egui::RichText::new(last_opened).small().color(egui::Color32::from_rgb(100, 105, 115)));

                            if ui.small_button("×").on_hover_text("Remove from recent").clicked() {
                                recent_to_remove = Some(video.id);
                            }
                        });
                    }

                    ui.add_space(20.0);
                    ui.separator();
                    ui.add_space(16.0);
                }

                // Browse folder section
                ui.label(egui::RichText::new("Browse Folder").size(16.0).color(egui::Color32::from_rgb(130, 138, 150)));
                ui.add_space(12.0);

                ui.horizontal(|ui| {
                    let text_edit = egui::TextEdit::singleline(&mut self.folder_input)
                        .hint_text("/path/to/videos")
                        .desired_width(400.0);
                    ui.add(text_edit);

                    ui.add_space(8.0);

                    if ui.button("Browse...").clicked() {
                        if let Some(path) = rfd::FileDialog::new().pick_folder() {
                            self.folder_input = path.display().to_string();
                        }
                    }

                    let list_enabled = !self.folder_input.is_empty();
                    if ui.add_enabled(list_enabled, egui::Button::new("List Videos")).clicked() {
                        navigation = self.list_folder();
                    }
                });

                ui.add_space(16.0);

                for path in &self.folder_videos {
                    let name = path.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    if ui.button(name).on_hover_text(path.display().to_string()).clicked() {
                        navigation = Some(Navigation::OpenVideo(path.clone()));
                    }
                }
            });
        });

        if let Some(id) = recent_to_remove {
            self.forget_video(id);
        }

        navigation
    }
}

fn show_error(ui: &mut egui::Ui, msg: &str) -> Option<Navigation> {
    let mut navigation = None;
    ui.vertical_centered(|ui| {
        ui.add_space(100.0);
        ui.label(egui::RichText::new("⚠").size(48.0).color(egui::Color32::from_rgb(240, 80, 80)));
        ui.add_space(12.0);
        ui.label(egui::RichText::new("Error").size(20.0).strong());
        ui.add_space(8.0);
        ui.label(egui::RichText::new(msg).color(egui::Color32::from_rgb(130, 138, 150)));
        ui.add_space(20.0);
        if ui.button("Back").clicked() {
            navigation = Some(Navigation::LoadVideos);
        }
    });
    navigation
}
