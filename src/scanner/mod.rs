// Scanner module - lists playable video files in a folder
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported video extensions
const VIDEO_EXTENSIONS: &[&str] = &[".mov", ".mp4", ".m4v", ".avi", ".mkv", ".webm"];

/// Directories to skip
const SKIP_DIRS: &[&str] = &["node_modules", "__MACOSX", ".Trash", ".Spotlight-V100", ".fseventsd"];

/// How deep to descend below the chosen folder
const MAX_DEPTH: usize = 4;

/// Find video files under `path`, sorted by path
pub fn find_video_files(path: &Path) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(false)
        .max_depth(MAX_DEPTH)
        .into_iter()
        .filter_entry(|entry| {
            // The root itself is always walked, even if hidden
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            // Skip hidden files and directories
            if name.starts_with('.') {
                return false;
            }
            // Skip known non-video directories
            if entry.file_type().is_dir() {
                return !SKIP_DIRS.contains(&name.as_ref());
            }
            true
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_video_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    videos.sort();
    tracing::debug!("Found {} videos in {}", videos.len(), path.display());
    videos
}

/// Whether the file name carries a supported video extension
pub fn is_video_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        })
        .unwrap_or(false)
}
