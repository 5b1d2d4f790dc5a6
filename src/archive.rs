//! Archive backends for SVX containers

use crate::error::{Result, SvxError};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Upper bound on the buffer reserved up front from a declared entry size
const MAX_PRESIZE: u64 = 1 << 20;

/// Read-only access to the named entries of an SVX container.
///
/// Implementations release their underlying handle on drop, so a
/// conversion that owns the archive releases it on every exit path.
pub trait SliceArchive {
    /// Names of all entries in the container
    fn entry_names(&self) -> Vec<String>;

    /// Size in bytes of an entry
    fn entry_size(&mut self, name: &str) -> Result<u64>;

    /// Open an entry as a streaming reader
    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>>;

    /// Find an entry by case-insensitive name
    fn find_entry_ci(&self, name: &str) -> Option<String> {
        self.entry_names()
            .into_iter()
            .find(|entry| entry.eq_ignore_ascii_case(name))
    }

    /// Read a whole entry into memory.
    ///
    /// The declared size only seeds the buffer; the entry is read to its end.
    fn read_entry(&mut self, name: &str) -> Result<Bytes> {
        let size = self.entry_size(name)?;
        let mut reader = self.open_entry(name)?;
        let mut data = Vec::with_capacity(size.min(MAX_PRESIZE) as usize);
        reader.read_to_end(&mut data)?;
        Ok(Bytes::from(data))
    }
}

/// Zip-backed archive
pub struct ZipArchiveSource<R: Read + Seek> {
    inner: ZipArchive<R>,
}

impl<R: Read + Seek> ZipArchiveSource<R> {
    /// Wrap any seekable reader holding a zip container
    pub fn new(reader: R) -> Result<Self> {
        let inner = ZipArchive::new(reader).map_err(|e| SvxError::ArchiveOpen {
            path: "<reader>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { inner })
    }
}

fn entry_error(name: &str, err: ZipError) -> SvxError {
    match err {
        ZipError::FileNotFound => SvxError::SliceNotFound(name.to_string()),
        ZipError::Io(e) => SvxError::Io(e),
        other => SvxError::Decode {
            name: name.to_string(),
            reason: other.to_string(),
        },
    }
}

impl<R: Read + Seek> SliceArchive for ZipArchiveSource<R> {
    fn entry_names(&self) -> Vec<String> {
        self.inner.file_names().map(str::to_string).collect()
    }

    fn entry_size(&mut self, name: &str) -> Result<u64> {
        let entry = self.inner.by_name(name).map_err(|e| entry_error(name, e))?;
        Ok(entry.size())
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let entry = self.inner.by_name(name).map_err(|e| entry_error(name, e))?;
        Ok(Box::new(entry))
    }
}

/// Open an SVX file from disk
pub fn open_archive(path: impl AsRef<Path>) -> Result<ZipArchiveSource<BufReader<File>>> {
    let path = path.as_ref();
    let open_error = |reason: String| SvxError::ArchiveOpen {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| open_error(e.to_string()))?;
    let inner = ZipArchive::new(BufReader::new(file)).map_err(|e| open_error(e.to_string()))?;
    Ok(ZipArchiveSource { inner })
}

/// In-memory archive of named entries
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Bytes>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.entries.insert(name.into(), data.into());
    }

    pub fn with_entry(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(name, data);
        self
    }

    fn get(&self, name: &str) -> Result<&Bytes> {
        self.entries
            .get(name)
            .ok_or_else(|| SvxError::SliceNotFound(name.to_string()))
    }
}

impl SliceArchive for MemoryArchive {
    fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn entry_size(&mut self, name: &str) -> Result<u64> {
        Ok(self.get(name)?.len() as u64)
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.get(name)?.clone())))
    }

    fn read_entry(&mut self, name: &str) -> Result<Bytes> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_zip_entries() {
        let data = build_zip(&[("Manifest.XML", b"<grid/>"), ("density/slice0.png", b"abc")]);
        let mut archive = ZipArchiveSource::new(Cursor::new(data)).unwrap();

        assert_eq!(archive.entry_names().len(), 2);
        assert_eq!(
            archive.find_entry_ci("manifest.xml").as_deref(),
            Some("Manifest.XML")
        );
        assert_eq!(archive.entry_size("density/slice0.png").unwrap(), 3);
        assert_eq!(&archive.read_entry("Manifest.XML").unwrap()[..], b"<grid/>");

        // Entry lookups other than the manifest are exact
        assert!(matches!(
            archive.read_entry("DENSITY/SLICE0.PNG"),
            Err(SvxError::SliceNotFound(_))
        ));
    }

    #[test]
    fn test_open_archive_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.svx");
        assert!(matches!(
            open_archive(&missing),
            Err(SvxError::ArchiveOpen { .. })
        ));

        let garbage = temp_dir.path().join("garbage.svx");
        std::fs::write(&garbage, b"definitely not a zip").unwrap();
        assert!(matches!(
            open_archive(&garbage),
            Err(SvxError::ArchiveOpen { .. })
        ));
    }

    #[test]
    fn test_memory_archive() {
        let mut archive = MemoryArchive::new().with_entry("a.png", vec![1u8, 2, 3]);
        assert_eq!(archive.entry_size("a.png").unwrap(), 3);

        let mut buf = Vec::new();
        archive.open_entry("a.png").unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![1, 2, 3]);
        assert!(archive.find_entry_ci("A.PNG").is_some());
        assert!(matches!(
            archive.entry_size("b.png"),
            Err(SvxError::SliceNotFound(_))
        ));
    }

    /// Reports a bogus size for every entry
    struct MisreportedSize(MemoryArchive);

    impl SliceArchive for MisreportedSize {
        fn entry_names(&self) -> Vec<String> {
            self.0.entry_names()
        }

        fn entry_size(&mut self, _name: &str) -> Result<u64> {
            Ok(u64::MAX / 2)
        }

        fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
            self.0.open_entry(name)
        }
    }

    #[test]
    fn test_read_entry_ignores_declared_size() {
        let mut archive =
            MisreportedSize(MemoryArchive::new().with_entry("manifest.xml", &b"<grid/>"[..]));
        assert_eq!(&archive.read_entry("manifest.xml").unwrap()[..], b"<grid/>");
        assert!(matches!(
            archive.read_entry("missing.xml"),
            Err(SvxError::SliceNotFound(_))
        ));
    }
}
