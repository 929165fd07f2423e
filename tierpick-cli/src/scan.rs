/// Image discovery. Non-recursive; ids are file names relative to the folder.
use std::io;
use std::path::Path;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Image file names directly inside `dir`, sorted.
pub fn scan_images(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if !is_image(&path) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => log::warn!("skipping non-UTF-8 file name {name:?}"),
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_ignores_case() {
        assert!(is_image(Path::new("a.PNG")));
        assert!(is_image(Path::new("dir/b.JpEg")));
        assert!(is_image(Path::new("c.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("png")));
    }

    #[test]
    fn test_scan_is_flat_and_sorted() {
        let dir = tempdir().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "c.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.png"), b"x").unwrap();
        fs::create_dir(dir.path().join("folder.png")).unwrap();

        assert_eq!(scan_images(dir.path()).unwrap(), vec!["a.PNG", "b.jpg", "c.gif"]);
    }

    #[test]
    fn test_scan_missing_dir_errors() {
        let dir = tempdir().unwrap();
        assert!(scan_images(&dir.path().join("nope")).is_err());
    }
}
