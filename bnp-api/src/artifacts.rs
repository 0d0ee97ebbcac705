//! Audio, spectrogram and chart files on disk
//!
//! Layout: `<extracted>/By_Date/<date>/<species_folder>/<file_name>` with the
//! spectrogram at `<file_name>.png`, and daily charts at
//! `<extracted>/Charts/Combo-<date>.png`.
//!
//! Every client-supplied segment must be a single normal path component, and
//! resolved files must stay under their base directory.

use bnp_common::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use bnp_common::time::format_date;

/// Folder name a clip is stored under, derived from its file name
///
/// BirdNET-Pi names clips `<Common_Name>-<score>-<YYYY-MM-DD>-birdnet-<...>`,
/// and the folder is the leading `<Common_Name>` (which may itself contain
/// hyphens). Other names fall back to the text before the first `-`.
/// Returns `None` when the result is not a safe single path component.
pub fn species_folder(file_name: &str) -> Option<String> {
    let folder = birdnet_common_name(file_name)
        .or_else(|| file_name.split('-').next())
        .unwrap_or(file_name);

    is_safe_component(folder).then(|| folder.to_string())
}

fn birdnet_common_name(file_name: &str) -> Option<&str> {
    let (prefix, _) = file_name.rsplit_once("-birdnet-")?;

    // prefix = <name>-<score>-<YYYY>-<MM>-<DD>
    let mut parts = prefix.rsplitn(5, '-');
    let numeric: Vec<&str> = parts.by_ref().take(4).collect();
    let name = parts.next()?;

    let all_numeric = numeric.len() == 4
        && numeric
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    (all_numeric && !name.is_empty()).then_some(name)
}

/// True when `segment` is exactly one normal path component
pub fn is_safe_component(segment: &str) -> bool {
    if segment.is_empty() || segment.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Join client-supplied segments onto `base`, refusing anything that escapes it
///
/// Existing targets are canonicalised so symlinks cannot lead outside `base`.
pub fn resolve_within(base: &Path, segments: &[&str]) -> Result<PathBuf> {
    let mut path = base.to_path_buf();
    for segment in segments {
        if !is_safe_component(segment) {
            warn!(segment = %segment, "Rejected unsafe path segment");
            return Err(Error::Forbidden(format!("Invalid path segment: {}", segment)));
        }
        path.push(segment);
    }

    if path.exists() {
        let canonical_base = base.canonicalize()?;
        let canonical = path.canonicalize()?;
        if !canonical.starts_with(&canonical_base) {
            warn!(path = %path.display(), "Resolved path escapes base directory");
            return Err(Error::Forbidden("Access denied".to_string()));
        }
        return Ok(canonical);
    }

    Ok(path)
}

/// Audio MIME type from the file extension
pub fn audio_content_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/wav",
    }
}

/// Spectrogram file name for a clip (`<file>.png`)
pub fn spectrogram_name(file_name: &str) -> String {
    if file_name.ends_with(".png") {
        file_name.to_string()
    } else {
        format!("{}.png", file_name)
    }
}

/// Audio and spectrogram paths of a detection, if its names are safe
pub fn detection_artifacts(by_date: &Path, date: NaiveDate, file_name: &str) -> Option<[PathBuf; 2]> {
    if !is_safe_component(file_name) {
        return None;
    }
    let folder = species_folder(file_name)?;
    let dir = by_date.join(format_date(date)).join(folder);
    Some([dir.join(file_name), dir.join(spectrogram_name(file_name))])
}

/// Confirm `path` is a regular file, mapping absence to `NotFound`
pub async fn require_file(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(Error::NotFound(format!("File not found: {}", display_name(path)))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(format!("File not found: {}", display_name(path))))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete files, returning those actually removed
///
/// Missing files are skipped; other failures are logged and skipped.
pub async fn remove_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed artifact");
                removed.push(path.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove artifact"),
        }
    }
    removed
}

/// Recursively delete directories, returning those actually removed
pub async fn remove_dirs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in paths {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed artifact directory");
                removed.push(path.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove artifact directory"),
        }
    }
    removed
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesRecordings {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingFile {
    pub name: String,
    pub has_spectrogram: bool,
    pub size: u64,
}

/// `By_Date` subdirectories named like `YYYY-MM-DD`, newest first
pub async fn recording_dates(by_date: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(by_date).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut dates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if looks_like_date(&name) {
            dates.push(name);
        }
    }
    dates.sort_unstable_by(|a, b| b.cmp(a));
    Ok(dates)
}

fn looks_like_date(name: &str) -> bool {
    name.len() == 10 && name.matches('-').count() == 2
}

/// Species folders recorded on `date` with their clip counts, busiest first
pub async fn species_for_date(by_date: &Path, date: &str) -> Result<Vec<SpeciesRecordings>> {
    let date_dir = resolve_within(by_date, &[date])?;
    let mut entries = read_dir_or_not_found(&date_dir, date).await?;

    let mut species = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let count = count_clips(&entry.path()).await?;
        species.push(SpeciesRecordings {
            name: entry.file_name().to_string_lossy().into_owned(),
            count,
        });
    }
    species.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    Ok(species)
}

/// Clips of one species on `date`, name descending
pub async fn files_for_species(by_date: &Path, date: &str, species: &str) -> Result<Vec<RecordingFile>> {
    let species_dir = resolve_within(by_date, &[date, species])?;
    let mut entries = read_dir_or_not_found(&species_dir, species).await?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !metadata.is_file() || name.ends_with(".png") {
            continue;
        }
        let has_spectrogram = tokio::fs::try_exists(species_dir.join(spectrogram_name(&name)))
            .await
            .unwrap_or(false);
        files.push(RecordingFile {
            name,
            has_spectrogram,
            size: metadata.len(),
        });
    }
    files.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(files)
}

async fn read_dir_or_not_found(dir: &Path, what: &str) -> Result<tokio::fs::ReadDir> {
    match tokio::fs::read_dir(dir).await {
        Ok(entries) => Ok(entries),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(format!("No recordings for {}", what)))
        }
        Err(e) => Err(e.into()),
    }
}

async fn count_clips(dir: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        let is_png = entry.file_name().to_string_lossy().ends_with(".png");
        if !is_png && entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_species_folder_birdnet_layout() {
        assert_eq!(
            species_folder("American_Robin-87-2024-05-01-birdnet-06:00:00.mp3").as_deref(),
            Some("American_Robin")
        );
        assert_eq!(
            species_folder("Red-winged_Blackbird-78-2024-05-01-birdnet-RTSP_1-06:12:01.mp3").as_deref(),
            Some("Red-winged_Blackbird")
        );
    }

    #[test]
    fn test_species_folder_fallback() {
        assert_eq!(species_folder("Robin-clip.wav").as_deref(), Some("Robin"));
        assert_eq!(species_folder("clip.wav").as_deref(), Some("clip.wav"));
        assert_eq!(species_folder("..-x-birdnet-y"), None);
        assert_eq!(species_folder(""), None);
    }

    #[test]
    fn test_is_safe_component() {
        assert!(is_safe_component("2024-05-01"));
        assert!(is_safe_component("American_Robin"));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("."));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("/etc"));
        assert!(!is_safe_component("..\\secret"));
    }

    #[test]
    fn test_resolve_within_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let result = resolve_within(dir.path(), &["2024-05-01", "..", "passwd"]);
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_within_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), base.path().join("link")).unwrap();

        let result = resolve_within(base.path(), &["link", "secret.txt"]);
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_audio_content_type() {
        assert_eq!(audio_content_type("a.mp3"), "audio/mpeg");
        assert_eq!(audio_content_type("a.FLAC"), "audio/flac");
        assert_eq!(audio_content_type("a.ogg"), "audio/ogg");
        assert_eq!(audio_content_type("a.wav"), "audio/wav");
        assert_eq!(audio_content_type("a"), "audio/wav");
    }

    #[test]
    fn test_detection_artifacts_paths() {
        let base = Path::new("/data/By_Date");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let [audio, png] =
            detection_artifacts(base, date, "American_Robin-87-2024-05-01-birdnet-06:00:00.mp3").unwrap();
        assert_eq!(
            audio,
            Path::new("/data/By_Date/2024-05-01/American_Robin/American_Robin-87-2024-05-01-birdnet-06:00:00.mp3")
        );
        assert!(png.to_string_lossy().ends_with(".mp3.png"));
        assert!(detection_artifacts(base, date, "../escape.mp3").is_none());
    }

    #[tokio::test]
    async fn test_media_listings() {
        let dir = TempDir::new().unwrap();
        let by_date = dir.path();
        let robin = by_date.join("2024-05-01/American_Robin");
        let cardinal = by_date.join("2024-05-01/Northern_Cardinal");
        std::fs::create_dir_all(&robin).unwrap();
        std::fs::create_dir_all(&cardinal).unwrap();
        std::fs::create_dir_all(by_date.join("2024-04-30")).unwrap();
        std::fs::create_dir_all(by_date.join("scratch")).unwrap();

        std::fs::write(robin.join("a.mp3"), b"aaaa").unwrap();
        std::fs::write(robin.join("a.mp3.png"), b"png").unwrap();
        std::fs::write(robin.join("b.mp3"), b"bb").unwrap();
        std::fs::write(cardinal.join("c.mp3"), b"c").unwrap();

        let dates = recording_dates(by_date).await.unwrap();
        assert_eq!(dates, vec!["2024-05-01", "2024-04-30"]);

        let species = species_for_date(by_date, "2024-05-01").await.unwrap();
        assert_eq!(
            species,
            vec![
                SpeciesRecordings { name: "American_Robin".to_string(), count: 2 },
                SpeciesRecordings { name: "Northern_Cardinal".to_string(), count: 1 },
            ]
        );

        let files = files_for_species(by_date, "2024-05-01", "American_Robin").await.unwrap();
        assert_eq!(
            files,
            vec![
                RecordingFile { name: "b.mp3".to_string(), has_spectrogram: false, size: 2 },
                RecordingFile { name: "a.mp3".to_string(), has_spectrogram: true, size: 4 },
            ]
        );

        assert!(matches!(
            species_for_date(by_date, "2023-01-01").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_require_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.mp3"), b"audio").unwrap();

        assert!(require_file(&dir.path().join("clip.mp3")).await.is_ok());
        assert!(matches!(
            require_file(&dir.path().join("missing.mp3")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(require_file(dir.path()).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_files_reports_only_removed() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present.mp3");
        std::fs::write(&present, b"x").unwrap();
        let missing = dir.path().join("missing.mp3");

        let removed = remove_files(&[present.clone(), missing]).await;
        assert_eq!(removed, vec![present.clone()]);
        assert!(!present.exists());
    }
}
