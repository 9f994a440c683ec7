// App-level settings - persisted across sessions
use directories::ProjectDirs;
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

const KEY_VENV_DIR: &str = "venv_dir";
const KEY_YOLOV5_DIR: &str = "yolov5_dir";
const KEY_YOLO_WEIGHTS: &str = "yolo_weights";
const KEY_OUTPUT_DIR: &str = "output_dir";
const KEY_OUTPUT_FOLDER_NAME: &str = "output_folder_name";
const KEY_LAST_FOLDER: &str = "last_folder";

/// Number of entries kept in the recent videos list
const RECENT_LIMIT: i64 = 20;

/// Recently opened video
#[derive(Debug, Clone)]
pub struct RecentVideo {
    pub id: i64,
    pub path: PathBuf,
    pub name: String,
    pub last_opened: String,
}

/// Configuration read by the player panel when it triggers detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    /// Virtual environment holding the detection interpreter
    pub venv_dir: PathBuf,
    /// YOLOv5 checkout containing detect.py
    pub yolov5_dir: PathBuf,
    pub yolo_weights: PathBuf,
    pub output_dir: PathBuf,
    pub output_folder_name: String,
}

impl DetectionSettings {
    /// Directory detection results are written under
    pub fn project_dir(&self) -> PathBuf {
        self.output_dir.join(&self.output_folder_name)
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        let output_dir = ProjectDirs::from("com", "videoteam", "VideoDetectionPlayer")
            .map(|dirs| dirs.data_dir().join("output"))
            .unwrap_or_else(|| PathBuf::from("output"));

        Self {
            venv_dir: PathBuf::from("venv"),
            yolov5_dir: PathBuf::from("yolov5"),
            yolo_weights: PathBuf::from("yolov5s.pt"),
            output_dir,
            output_folder_name: "detections".to_string(),
        }
    }
}

/// App-level settings manager
pub struct AppSettings {
    conn: Connection,
}

impl AppSettings {
    /// Open or create the app settings database
    pub fn open() -> Result<Self> {
        let settings_path = Self::get_settings_path();

        // Create parent directory if needed
        if let Some(parent) = settings_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(&settings_path)?;

        // Enable WAL mode
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::with_connection(conn)
    }

    /// Settings backed by a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let settings = Self { conn };
        settings.initialize_schema()?;
        Ok(settings)
    }

    /// Get the path to the settings database
    fn get_settings_path() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("com", "videoteam", "VideoDetectionPlayer") {
            proj_dirs.config_dir().join("settings.db")
        } else {
            // Fallback to home directory
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".vdp-settings.db")
        }
    }

    /// Initialize database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recent_videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                last_opened TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recent_videos_last_opened
                ON recent_videos(last_opened DESC);
            "#,
        )?;
        Ok(())
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<String> {
        let mut stmt = self.conn
            .prepare("SELECT value FROM app_settings WHERE key = ?1")
            .ok()?;

        stmt.query_row(params![key], |row| row.get(0)).ok()
    }

    /// Set a setting value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Snapshot of the detection configuration, defaults for missing keys
    pub fn detection_settings(&self) -> DetectionSettings {
        let defaults = DetectionSettings::default();
        let path_or = |key: &str, default: PathBuf| self.get(key).map(PathBuf::from).unwrap_or(default);

        DetectionSettings {
            venv_dir: path_or(KEY_VENV_DIR, defaults.venv_dir),
            yolov5_dir: path_or(KEY_YOLOV5_DIR, defaults.yolov5_dir),
            yolo_weights: path_or(KEY_YOLO_WEIGHTS, defaults.yolo_weights),
            output_dir: path_or(KEY_OUTPUT_DIR, defaults.output_dir),
            output_folder_name: self
                .get(KEY_OUTPUT_FOLDER_NAME)
                .unwrap_or(defaults.output_folder_name),
        }
    }

    /// Get the last browsed folder
    pub fn get_last_folder(&self) -> Option<String> {
        self.get(KEY_LAST_FOLDER)
    }

    /// Set the last browsed folder
    pub fn set_last_folder(&self, value: &str) -> Result<()> {
        self.set(KEY_LAST_FOLDER, value)
    }

    /// Add or refresh a video in the recent list
    pub fn record_recent_video(&self, path: &Path) -> Result<()> {
        let path_str = path.display().to_string();
        let name = path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_str.clone());
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);

        self.conn.execute(
            r#"
            INSERT INTO recent_videos (path, name, last_opened)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(path) DO UPDATE SET
                name = ?2,
                last_opened = ?3
            "#,
            params![path_str, name, now],
        )?;
        Ok(())
    }

    /// Get recent videos, most recently opened first
    pub fn get_recent_videos(&self) -> Result<Vec<RecentVideo>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, path, name, last_opened
            FROM recent_videos
            ORDER BY last_opened DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let entries = stmt.query_map(params![RECENT_LIMIT], |row| {
            let path_str: String = row.get(1)?;

            Ok(RecentVideo {
                id: row.get(0)?,
                path: PathBuf::from(path_str),
                name: row.get(2)?,
                last_opened: row.get(3)?,
            })
        })?;

        entries.collect()
    }

    /// Remove a video from the recent list
    pub fn remove_recent_video(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM recent_videos WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_settings_defaults() {
        let settings = AppSettings::open_in_memory().unwrap();
        let detection = settings.detection_settings();
        let defaults = DetectionSettings::default();

        assert_eq!(detection, defaults);
        assert_eq!(detection.output_folder_name, "detections");
        assert_eq!(detection.yolo_weights, PathBuf::from("yolov5s.pt"));
    }

    #[test]
    fn test_detection_settings_overrides() {
        let settings = AppSettings::open_in_memory().unwrap();
        settings.set(KEY_YOLO_WEIGHTS, "/models/custom.pt").unwrap();
        settings.set(KEY_OUTPUT_DIR, "/srv/results").unwrap();
        settings.set(KEY_OUTPUT_FOLDER_NAME, "run").unwrap();

        let detection = settings.detection_settings();
        assert_eq!(detection.yolo_weights, PathBuf::from("/models/custom.pt"));
        assert_eq!(detection.project_dir(), PathBuf::from("/srv/results").join("run"));
        assert_eq!(detection.venv_dir, PathBuf::from("venv"));
    }

    #[test]
    fn test_set_replaces_value() {
        let settings = AppSettings::open_in_memory().unwrap();
        settings.set_last_folder("/a").unwrap();
        settings.set_last_folder("/b").unwrap();
        assert_eq!(settings.get_last_folder().as_deref(), Some("/b"));
        assert!(settings.get("missing").is_none());
    }

    #[test]
    fn test_recent_videos_are_unique_and_newest_first() {
        let settings = AppSettings::open_in_memory().unwrap();
        settings.record_recent_video(Path::new("/videos/a.mp4")).unwrap();
        settings.record_recent_video(Path::new("/videos/b.mp4")).unwrap();
        settings.record_recent_video(Path::new("/videos/a.mp4")).unwrap();

        let recent = settings.get_recent_videos().unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].name, "a.mp4");
        assert_eq!(recent[1].path, PathBuf::from("/videos/b.mp4"));
    }

    #[test]
    fn test_remove_recent_video() {
        let settings = AppSettings::open_in_memory().unwrap();
        settings.record_recent_video(Path::new("/videos/a.mp4")).unwrap();
        let id = settings.get_recent_videos().unwrap()[0].id;

        settings.remove_recent_video(id).unwrap();
        assert!(settings.get_recent_videos().unwrap().is_empty());
    }
}
