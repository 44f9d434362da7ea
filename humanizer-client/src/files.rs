use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_TEXT_MARKDOWN: &str = "text/markdown";

/// Extensions accepted for attachment, matched case-insensitively.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Debug)]
pub enum FileError {
    UnsupportedExtension(String),
    Read(io::Error),
    WriteTmp(io::Error),
    Rename(io::Error),
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::UnsupportedExtension(name) => {
                write!(f, "{name}: only .txt and .md files are supported")
            }
            FileError::Read(e) => write!(f, "read failed: {e}"),
            FileError::WriteTmp(e) => write!(f, "tmp write failed: {e}"),
            FileError::Rename(e) => write!(f, "rename failed: {e}"),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::Read(e) | FileError::WriteTmp(e) | FileError::Rename(e) => Some(e),
            FileError::UnsupportedExtension(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: u64,
    pub name: String,
    pub content: String,
    pub mime: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Md,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Md => "md",
        }
    }
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "txt" => Some(MIME_TEXT_PLAIN),
        "md" => Some(MIME_TEXT_MARKDOWN),
        _ => None,
    }
}

/// Session-local store of attached files. Ids are unique for the lifetime
/// of the store; nothing here is sent anywhere until the user picks a file
/// as input.
#[derive(Debug, Default)]
pub struct FileStore {
    files: Vec<UploadedFile>,
    next_id: u64,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn get(&self, id: u64) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.id == id)
    }

    pub fn attach(&mut self, path: &Path) -> Result<u64, FileError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = path
            .extension()
            .and_then(|ext| mime_for_extension(&ext.to_string_lossy()))
            .ok_or_else(|| FileError::UnsupportedExtension(name.clone()))?;

        let content = fs::read_to_string(path).map_err(FileError::Read)?;
        let size_bytes = content.len() as u64;

        self.next_id += 1;
        let id = self.next_id;
        self.files.push(UploadedFile {
            id,
            name,
            content,
            mime: mime.to_owned(),
            size_bytes,
        });
        Ok(id)
    }

    pub fn remove(&mut self, id: u64) {
        self.files.retain(|file| file.id != id);
    }
}

pub fn export_path(dir: &Path, stem: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{stem}.{}", format.extension()))
}

/// Write the exported text via tmp file + rename so a failed write never
/// leaves a truncated file at the destination. The tmp name keeps the
/// format suffix (`humanized.txt.tmp`) so exports of different formats
/// into the same directory never share a scratch file.
pub fn export_text(path: &Path, content: &str) -> Result<(), FileError> {
    let tmp = match path.extension() {
        Some(ext) => path.with_extension(format!("{}.tmp", ext.to_string_lossy())),
        None => path.with_extension("tmp"),
    };
    fs::write(&tmp, content.as_bytes()).map_err(FileError::WriteTmp)?;

    if path.exists() {
        let _ = fs::remove_file(path);
    }

    fs::rename(&tmp, path).map_err(FileError::Rename)?;
    Ok(())
}
