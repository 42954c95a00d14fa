//! EPUB container serialization.
//!
//! The one byte-exact external contract in the crate: the Open Container
//! Format requires the `mimetype` entry to be the archive's first member,
//! stored without compression, so reading software can sniff the file
//! type from the first bytes before parsing the ZIP structure.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Serialize a book directory into an EPUB archive at `epub_path`.
///
/// The `mimetype` file is written first and stored; every other file in
/// the tree is deflate-compressed under its book-relative forward-slash
/// path. Files named `mimetype` (already written) and `*.epub` (the
/// output artifact of a prior run) are excluded.
pub fn write_epub_archive(book_dir: &Path, epub_path: &Path) -> Result<()> {
    let file = File::create(epub_path)?;
    let mut zip = ZipWriter::new(file);

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(&fs::read(book_dir.join("mimetype"))?)?;

    let mut files = Vec::new();
    collect_files(book_dir, &mut files)?;

    for path in files {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name == "mimetype" || name.ends_with(".epub") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(book_dir) else {
            continue;
        };
        let member = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(member, deflated)?;
        zip.write_all(&fs::read(&path)?)?;
    }

    zip.finish()?;
    Ok(())
}

/// Collect every file under `dir`, depth-first, entries sorted per
/// directory so the archive layout is deterministic.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
