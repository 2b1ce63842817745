use std::fs;
use std::path::{Path, PathBuf};

/// `NAME<suffix>` becomes `NAME`. `None` when the file does not carry the
/// suffix or the suffix is the whole name.
pub fn strip_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(suffix)?;
    if stem.is_empty() || suffix.is_empty() {
        return None;
    }
    Some(path.with_file_name(stem))
}

pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    strip_suffix(path, suffix).is_some()
}

/// Output path when `-N` restores the name stored in the header. Only the
/// final component of the stored name is used, so the file always lands
/// next to its input.
pub fn restored_name(input: &Path, stored: &str) -> Option<PathBuf> {
    let name = Path::new(stored).file_name()?;
    Some(input.with_file_name(name))
}

/// True when both paths name the same file. Paths that do not exist yet
/// are compared as given.
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub fn format_size(size: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{:.0} {}", size, UNITS[unit_idx])
    } else {
        format!("{:.1} {}", size, UNITS[unit_idx])
    }
}

/// Space saved by compression, as gzip reports it (`1 - compressed/original`)
pub fn format_ratio(compressed: usize, original: usize) -> String {
    if original == 0 {
        "0.0%".to_string()
    } else {
        let saved = 1.0 - compressed as f64 / original as f64;
        format!("{:.1}%", saved * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_suffix() {
        assert_eq!(
            strip_suffix(Path::new("dir/notes.txt.gz"), ".gz"),
            Some(PathBuf::from("dir/notes.txt"))
        );
        assert_eq!(
            strip_suffix(Path::new("a.tgz"), "gz"),
            Some(PathBuf::from("a.t"))
        );
        assert_eq!(strip_suffix(Path::new("notes.txt"), ".gz"), None);
        assert_eq!(strip_suffix(Path::new(".gz"), ".gz"), None);
        assert_eq!(strip_suffix(Path::new("x.gz"), ""), None);
    }

    #[test]
    fn test_restored_name_stays_in_directory() {
        assert_eq!(
            restored_name(Path::new("in/a.gz"), "report.csv"),
            Some(PathBuf::from("in/report.csv"))
        );
        assert_eq!(
            restored_name(Path::new("in/a.gz"), "../../etc/passwd"),
            Some(PathBuf::from("in/passwd"))
        );
        assert_eq!(restored_name(Path::new("in/a.gz"), ".."), None);
    }

    #[test]
    fn test_same_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.gz");
        fs::write(&file, b"x").unwrap();

        assert!(same_file(&file, &file));
        assert!(same_file(&file, &dir.path().join(".").join("a.gz")));
        assert!(!same_file(&file, &dir.path().join("a")));
        assert!(!same_file(&dir.path().join("b"), &dir.path().join("c")));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(50, 100), "50.0%");
        assert_eq!(format_ratio(100, 100), "0.0%");
        assert_eq!(format_ratio(10, 0), "0.0%");
        assert_eq!(format_ratio(150, 100), "-50.0%");
    }
}
