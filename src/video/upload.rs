use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::status::StatusBoard;

/// 受け付ける動画の拡張子
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// アップロードされた動画。デコード用に一時ファイルへ書き出し、drop で削除される。
#[derive(Debug)]
pub struct UploadedVideo {
    name: String,
    file: NamedTempFile,
}

/// 拡張子が許可リストにあれば小文字で返す
pub fn accepted_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn require_extension(name: &str) -> Result<String> {
    match accepted_extension(name) {
        Some(ext) => Ok(ext),
        None => bail!(
            "Unsupported file type: {} (accepted: {})",
            name,
            ALLOWED_EXTENSIONS.join(", ")
        ),
    }
}

impl UploadedVideo {
    /// 任意のストリームから受け取る
    pub fn from_reader<R: Read>(name: &str, mut reader: R) -> Result<Self> {
        let ext = require_extension(name)?;

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .context("Failed to create temporary file")?;
        let bytes = io::copy(&mut reader, &mut file).context("Failed to store uploaded video")?;
        log::debug!("stored {name} ({bytes} bytes) at {}", file.path().display());

        Ok(Self {
            name: name.to_string(),
            file,
        })
    }

    /// ローカルのファイルをアップロードとして扱う
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?;
        require_extension(name)?;
        let reader = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(name, reader)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// デコーダに渡す一時ファイルのパス
    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

/// 動画を受け取る窓口
pub trait UploadSurface {
    /// 受け付けた動画。ユーザーが何も渡さずに終えたら `None`
    fn wait_for_upload(&mut self, status: &mut dyn StatusBoard) -> Result<Option<UploadedVideo>>;
}

/// 起動引数のパス、なければ入力ストリームからパスを受け取る
pub struct PromptUpload<R: BufRead> {
    initial: Option<PathBuf>,
    input: R,
}

impl<R: BufRead> PromptUpload<R> {
    pub fn new(initial: Option<PathBuf>, input: R) -> Self {
        Self { initial, input }
    }
}

impl PromptUpload<io::StdinLock<'static>> {
    pub fn stdin(initial: Option<PathBuf>) -> Self {
        Self::new(initial, io::stdin().lock())
    }
}

impl<R: BufRead> UploadSurface for PromptUpload<R> {
    fn wait_for_upload(&mut self, status: &mut dyn StatusBoard) -> Result<Option<UploadedVideo>> {
        if let Some(path) = self.initial.take() {
            match UploadedVideo::from_path(&path) {
                Ok(video) => return Ok(Some(video)),
                Err(e) => status.error(&format!("{e:#}")),
            }
        }

        loop {
            print!("Upload a video of a person ({}): ", ALLOWED_EXTENSIONS.join(", "));
            io::stdout().flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let path = line.trim();
            if path.is_empty() {
                return Ok(None);
            }

            match UploadedVideo::from_path(path) {
                Ok(video) => return Ok(Some(video)),
                Err(e) => status.error(&format!("{e:#}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::RecordingStatus;
    use std::io::Cursor;

    #[test]
    fn test_accepted_extension() {
        assert_eq!(accepted_extension("run.mp4").as_deref(), Some("mp4"));
        assert_eq!(accepted_extension("RUN.MOV").as_deref(), Some("mov"));
        assert_eq!(accepted_extension("clip.avi").as_deref(), Some("avi"));
        assert_eq!(accepted_extension("notes.txt"), None);
        assert_eq!(accepted_extension("mp4"), None);
    }

    #[test]
    fn test_from_reader_writes_temp_file() {
        let video = UploadedVideo::from_reader("squat.mp4", &b"fake video bytes"[..]).unwrap();
        assert_eq!(video.name(), "squat.mp4");
        let path = video.path();
        assert!(path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake video bytes");

        drop(video);
        assert!(!path.exists());
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let err = UploadedVideo::from_reader("photo.png", &b""[..]).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_from_path_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("lunge.MOV");
        std::fs::write(&src, b"abc").unwrap();

        let video = UploadedVideo::from_path(&src).unwrap();
        assert_eq!(std::fs::read(video.path()).unwrap(), b"abc");
        assert!(video.path().to_string_lossy().ends_with(".mov"));
    }

    #[test]
    fn test_prompt_retries_after_rejected_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("deadlift.avi");
        std::fs::write(&good, b"x").unwrap();

        let input = format!("notes.txt\n{}\n", good.display());
        let mut upload = PromptUpload::new(None, Cursor::new(input));
        let mut status = RecordingStatus::default();

        let video = upload.wait_for_upload(&mut status).unwrap().unwrap();
        assert_eq!(video.name(), "deadlift.avi");
        assert_eq!(status.errors().count(), 1);
    }

    #[test]
    fn test_prompt_empty_input_gives_up() {
        let mut upload = PromptUpload::new(None, Cursor::new(""));
        let mut status = RecordingStatus::default();
        assert!(upload.wait_for_upload(&mut status).unwrap().is_none());
    }

    #[test]
    fn test_initial_path_is_used_first() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("jump.mp4");
        std::fs::write(&good, b"x").unwrap();

        let mut upload = PromptUpload::new(Some(good), Cursor::new(""));
        let mut status = RecordingStatus::default();
        assert!(upload.wait_for_upload(&mut status).unwrap().is_some());
    }
}
