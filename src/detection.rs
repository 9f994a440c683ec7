// Object detection hand-off: runs the YOLOv5 detect script as a child process
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::settings::DetectionSettings;

/// Confidence threshold used for every panel-triggered run
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Parameters handed to the detection entry point
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRequest {
    pub source: PathBuf,
    pub weights: PathBuf,
    /// Directory results are written under
    pub project: PathBuf,
    pub conf_thres: f32,
    /// Save per-frame label text files
    pub save_txt: bool,
}

impl DetectionRequest {
    /// Request with the fixed parameters the player panel uses
    pub fn for_video(source: &Path, settings: &DetectionSettings) -> Self {
        Self {
            source: source.to_path_buf(),
            weights: settings.yolo_weights.clone(),
            project: settings.project_dir(),
            conf_thres: CONFIDENCE_THRESHOLD,
            save_txt: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("detection exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// Blocking detection entry point
pub trait Detector {
    fn run(&self, request: &DetectionRequest) -> Result<(), DetectionError>;
}

/// Runs `detect.py` from a YOLOv5 checkout
pub struct YoloV5Detector {
    python: PathBuf,
    script: PathBuf,
}

impl YoloV5Detector {
    pub fn new(settings: &DetectionSettings) -> Self {
        Self {
            python: python_interpreter(&settings.venv_dir),
            script: settings.yolov5_dir.join("detect.py"),
        }
    }

    /// Build the command line without running it
    fn command(&self, request: &DetectionRequest) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script)
            .arg("--source")
            .arg(&request.source)
            .arg("--weights")
            .arg(&request.weights)
            .arg("--project")
            .arg(&request.project)
            .arg("--conf-thres")
            .arg(request.conf_thres.to_string());
        if request.save_txt {
            cmd.arg("--save-txt");
        }
        if let Some(dir) = self.script.parent().filter(|p| !p.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Detector for YoloV5Detector {
    fn run(&self, request: &DetectionRequest) -> Result<(), DetectionError> {
        std::fs::create_dir_all(&request.project).map_err(|source| DetectionError::OutputDir {
            path: request.project.clone(),
            source,
        })?;

        tracing::info!("[START] YOLOv5 detection on {}", request.source.display());

        let output = self
            .command(request)
            .output()
            .map_err(|source| DetectionError::Spawn {
                program: self.python.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!("YOLOv5 detection failed: {}", stderr);
            return Err(DetectionError::Failed {
                status: output.status,
                stderr,
            });
        }

        tracing::info!("[END] YOLOv5 detection, results in {}", request.project.display());
        Ok(())
    }
}

/// Interpreter inside the virtual environment when present, otherwise the system one
fn python_interpreter(venv_dir: &Path) -> PathBuf {
    let venv_python = if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    };

    if venv_python.is_file() {
        venv_python
    } else if cfg!(windows) {
        PathBuf::from("python")
    } else {
        PathBuf::from("python3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn settings() -> DetectionSettings {
        DetectionSettings {
            venv_dir: PathBuf::from("/nonexistent/venv"),
            yolov5_dir: PathBuf::from("/opt/yolov5"),
            yolo_weights: PathBuf::from("/models/best.pt"),
            output_dir: PathBuf::from("/data/out"),
            output_folder_name: "detections".to_string(),
        }
    }

    #[test]
    fn test_request_uses_fixed_parameters() {
        let request = DetectionRequest::for_video(Path::new("/videos/clip.mp4"), &settings());

        assert_eq!(request.source, PathBuf::from("/videos/clip.mp4"));
        assert_eq!(request.weights, PathBuf::from("/models/best.pt"));
        assert_eq!(request.project, PathBuf::from("/data/out/detections"));
        assert_eq!(request.conf_thres, 0.5);
        assert!(request.save_txt);
    }

    #[test]
    fn test_command_line() {
        let detector = YoloV5Detector::new(&settings());
        let request = DetectionRequest::for_video(Path::new("/videos/clip.mp4"), &settings());
        let cmd = detector.command(&request);

        let args: Vec<&OsStr> = cmd.get_args().collect();
        let expected: Vec<&OsStr> = [
            "/opt/yolov5/detect.py",
            "--source",
            "/videos/clip.mp4",
            "--weights",
            "/models/best.pt",
            "--project",
            "/data/out/detections",
            "--conf-thres",
            "0.5",
            "--save-txt",
        ]
        .iter()
        .map(OsStr::new)
        .collect();
        assert_eq!(args, expected);
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/opt/yolov5")));
    }

    #[test]
    fn test_save_txt_flag_omitted_when_disabled() {
        let detector = YoloV5Detector::new(&settings());
        let mut request = DetectionRequest::for_video(Path::new("a.mp4"), &settings());
        request.save_txt = false;

        let cmd = detector.command(&request);
        assert!(!cmd.get_args().any(|a| a == "--save-txt"));
    }

    #[test]
    fn test_falls_back_to_system_python_without_venv() {
        let python = python_interpreter(Path::new("/nonexistent/venv"));
        let expected = if cfg!(windows) { "python" } else { "python3" };
        assert_eq!(python, PathBuf::from(expected));
    }

    #[test]
    fn test_prefers_venv_python() {
        let venv = std::env::temp_dir().join(format!("vdp-venv-{}", std::process::id()));
        let bin = if cfg!(windows) { venv.join("Scripts") } else { venv.join("bin") };
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join(if cfg!(windows) { "python.exe" } else { "python" });
        std::fs::write(&exe, b"").unwrap();

        assert_eq!(python_interpreter(&venv), exe);

        let _ = std::fs::remove_dir_all(&venv);
    }
}
