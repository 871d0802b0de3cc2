//! Saved songs: four stem paths per record, persisted newest first.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::audio::SUPPORTED_EXTENSIONS;
use crate::error::LibraryError;

const LIBRARY_VERSION: u32 = 1;

/// Stem file names without extension, in channel order
pub const STEM_FILES: [&str; 4] = ["vocals", "other", "drums", "bass"];

/// The four stem files of one song, in channel order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemPaths {
    pub vocals: PathBuf,
    pub other: PathBuf,
    pub drums: PathBuf,
    pub bass: PathBuf,
}

impl StemPaths {
    pub fn from_array(paths: [PathBuf; 4]) -> Self {
        let [vocals, other, drums, bass] = paths;
        Self {
            vocals,
            other,
            drums,
            bass,
        }
    }

    pub fn as_array(&self) -> [PathBuf; 4] {
        [
            self.vocals.clone(),
            self.other.clone(),
            self.drums.clone(),
            self.bass.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub id: u64,
    pub title: String,
    pub stems: StemPaths,
    pub folder: PathBuf,
}

/// Find `vocals.*`, `other.*`, `drums.*` and `bass.*` in a song folder
pub fn resolve_stems(folder: &Path) -> Result<StemPaths, LibraryError> {
    Ok(StemPaths {
        vocals: find_stem(folder, STEM_FILES[0])?,
        other: find_stem(folder, STEM_FILES[1])?,
        drums: find_stem(folder, STEM_FILES[2])?,
        bass: find_stem(folder, STEM_FILES[3])?,
    })
}

fn find_stem(folder: &Path, stem: &'static str) -> Result<PathBuf, LibraryError> {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| folder.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| LibraryError::StemNotFound {
            stem,
            folder: folder.to_path_buf(),
        })
}

/// Versioned on-disk wrapper shared by the library and queue files
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    items: Vec<T>,
}

/// Read a versioned JSON list; a missing file is an empty list
pub(crate) fn read_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LibraryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let envelope: Envelope<T> =
        serde_json::from_str(&json).map_err(|source| LibraryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if envelope.version > LIBRARY_VERSION {
        return Err(LibraryError::UnsupportedVersion {
            found: envelope.version,
            supported: LIBRARY_VERSION,
        });
    }
    Ok(envelope.items)
}

pub(crate) fn write_json_list<T: Serialize + Clone>(
    path: &Path,
    items: &[T],
) -> Result<(), LibraryError> {
    let io_err = |source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let envelope = Envelope {
        version: LIBRARY_VERSION,
        items: items.to_vec(),
    };
    let json = serde_json::to_string_pretty(&envelope).map_err(|source| LibraryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}

pub trait LibraryStore {
    fn load(&self) -> Result<Vec<SongRecord>, LibraryError>;
    fn save(&self, songs: &[SongRecord]) -> Result<(), LibraryError>;
}

/// Library persisted as a pretty-printed JSON file
pub struct JsonLibraryStore {
    path: PathBuf,
}

impl JsonLibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LibraryStore for JsonLibraryStore {
    fn load(&self) -> Result<Vec<SongRecord>, LibraryError> {
        read_json_list(&self.path)
    }

    fn save(&self, songs: &[SongRecord]) -> Result<(), LibraryError> {
        write_json_list(&self.path, songs)
    }
}

#[derive(Default)]
pub struct MemoryLibraryStore {
    songs: Mutex<Vec<SongRecord>>,
}

impl LibraryStore for MemoryLibraryStore {
    fn load(&self) -> Result<Vec<SongRecord>, LibraryError> {
        Ok(self.songs.lock().clone())
    }

    fn save(&self, songs: &[SongRecord]) -> Result<(), LibraryError> {
        *self.songs.lock() = songs.to_vec();
        Ok(())
    }
}

/// Saved songs, newest first
pub struct SongLibrary<S: LibraryStore> {
    store: S,
    songs: Vec<SongRecord>,
}

impl<S: LibraryStore> SongLibrary<S> {
    pub fn open(store: S) -> Result<Self, LibraryError> {
        let songs = store.load()?;
        Ok(Self { store, songs })
    }

    pub fn songs(&self) -> &[SongRecord] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Insert at the front and persist. Returns the new record's id.
    pub fn add(
        &mut self,
        title: &str,
        folder: &Path,
        stems: StemPaths,
    ) -> Result<u64, LibraryError> {
        let id = self.songs.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        self.songs.insert(
            0,
            SongRecord {
                id,
                title: title.to_string(),
                stems,
                folder: folder.to_path_buf(),
            },
        );
        if let Err(e) = self.store.save(&self.songs) {
            self.songs.remove(0);
            return Err(e);
        }
        log::info!("Added '{}' to library (id {})", title, id);
        Ok(id)
    }

    /// Resolve the stems in `folder` and add them under `title`
    pub fn add_folder(&mut self, title: &str, folder: &Path) -> Result<u64, LibraryError> {
        let stems = resolve_stems(folder)?;
        self.add(title, folder, stems)
    }

    pub fn remove(&mut self, id: u64) -> Result<SongRecord, LibraryError> {
        let index = self
            .songs
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| LibraryError::SongNotFound(id.to_string()))?;
        let removed = self.songs.remove(index);
        if let Err(e) = self.store.save(&self.songs) {
            self.songs.insert(index, removed);
            return Err(e);
        }
        log::info!("Removed '{}' from library", removed.title);
        Ok(removed)
    }

    pub fn get(&self, id: u64) -> Option<&SongRecord> {
        self.songs.iter().find(|s| s.id == id)
    }

    /// Case-insensitive exact title match; the newest wins
    pub fn find_by_title(&self, title: &str) -> Option<&SongRecord> {
        self.songs
            .iter()
            .find(|s| s.title.eq_ignore_ascii_case(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_sine_wav, TEST_RATE};

    fn stems(folder: &str) -> StemPaths {
        let dir = PathBuf::from(folder);
        StemPaths::from_array(STEM_FILES.map(|s| dir.join(format!("{}.mp3", s))))
    }

    #[test]
    fn resolves_mixed_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_sine_wav(dir.path(), "vocals.wav", 440.0, 0.1, TEST_RATE);
        for name in ["other.mp3", "drums.flac", "bass.ogg"] {
            std::fs::write(dir.path().join(name), b"stub").unwrap();
        }
        let resolved = resolve_stems(dir.path()).unwrap();
        assert_eq!(resolved.vocals, dir.path().join("vocals.wav"));
        assert_eq!(resolved.drums, dir.path().join("drums.flac"));
        assert_eq!(resolved.bass, dir.path().join("bass.ogg"));
    }

    #[test]
    fn missing_stem_is_named() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["vocals.wav", "other.wav", "bass.wav", "drums.txt"] {
            std::fs::write(dir.path().join(name), b"stub").unwrap();
        }
        match resolve_stems(dir.path()) {
            Err(LibraryError::StemNotFound { stem, .. }) => assert_eq!(stem, "drums"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn newest_first_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        let mut library = SongLibrary::open(JsonLibraryStore::new(&path)).unwrap();
        let first = library.add("First", Path::new("/a"), stems("/a")).unwrap();
        let second = library.add("Second", Path::new("/b"), stems("/b")).unwrap();
        assert_ne!(first, second);

        let reopened = SongLibrary::open(JsonLibraryStore::new(&path)).unwrap();
        let titles: Vec<_> = reopened.songs().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Second", "First"]);
        assert_eq!(reopened.get(first).unwrap().stems, stems("/a"));
    }

    #[test]
    fn remove_keeps_ids_stable() {
        let mut library = SongLibrary::open(MemoryLibraryStore::default()).unwrap();
        let a = library.add("A", Path::new("/a"), stems("/a")).unwrap();
        let b = library.add("B", Path::new("/b"), stems("/b")).unwrap();
        library.remove(a).unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.find_by_title("b").unwrap().id, b);
        assert!(matches!(library.remove(a), Err(LibraryError::SongNotFound(_))));
        let c = library.add("C", Path::new("/c"), stems("/c")).unwrap();
        assert!(c > b);
    }

    #[test]
    fn rejects_newer_file_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, r#"{ "version": 99, "items": [] }"#).unwrap();
        assert!(matches!(
            JsonLibraryStore::new(&path).load(),
            Err(LibraryError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn missing_file_is_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLibraryStore::new(dir.path().join("none.json"));
        let library = SongLibrary::open(store).unwrap();
        assert!(library.is_empty());
    }
}
