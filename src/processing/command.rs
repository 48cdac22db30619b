//! External processing tool invoked once per frame.
//!
//! Invocation, inside a fresh temporary directory:
//!
//! ```text
//! <program> [args]... [--<key>=<value>]... --output <dir>/out.png --thumbnail <dir>/thumb.jpg <dir>/input.png
//! ```
//!
//! Client options are joined to their key with `=`, so a value can never be
//! read as a flag of its own. The tool must write `out.png`; `thumb.jpg` is
//! optional. A non-zero exit is
//! a processing failure carrying the tool's stderr.

use super::{Processed, ProcessingDelegate, ProcessingOptions};
use crate::error::FrameError;
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const INPUT_NAME: &str = "input.png";
const OUTPUT_NAME: &str = "out.png";
const THUMBNAIL_NAME: &str = "thumb.jpg";

pub struct CommandDelegate {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandDelegate {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn arguments(&self, options: &ProcessingOptions, dir: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        for (key, value) in options {
            args.push(format!("--{key}={value}"));
        }
        args.push("--output".into());
        args.push(dir.join(OUTPUT_NAME).to_string_lossy().into_owned());
        args.push("--thumbnail".into());
        args.push(dir.join(THUMBNAIL_NAME).to_string_lossy().into_owned());
        args.push(dir.join(INPUT_NAME).to_string_lossy().into_owned());
        args
    }
}

impl ProcessingDelegate for CommandDelegate {
    fn process(&self, canvas: &RgbaImage, options: &ProcessingOptions) -> Result<Processed, FrameError> {
        let dir = TempDir::new()?;
        canvas.save_with_format(dir.path().join(INPUT_NAME), ImageFormat::Png)?;

        let args = self.arguments(options, dir.path());
        tracing::debug!(program = %self.program.display(), ?args, "running processor");
        let output = Command::new(&self.program).args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FrameError::Processing(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let image = std::fs::read(dir.path().join(OUTPUT_NAME)).map_err(|e| {
            FrameError::Processing(format!("processor produced no {OUTPUT_NAME}: {e}"))
        })?;
        let thumbnail = std::fs::read(dir.path().join(THUMBNAIL_NAME)).ok();
        Ok(Processed { image, thumbnail })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_helpers::solid;
    use image::Rgba;

    /// Copies the input to both outputs and logs its arguments next to itself.
    const COPY_SCRIPT: &str = r#"
log="$(dirname "$0")/args.txt"
printf '%s\n' "$@" > "$log"
out=""
thumb=""
while [ $# -gt 1 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    --thumbnail) thumb="$2"; shift 2 ;;
    *) shift ;;
  esac
done
cp "$1" "$out"
cp "$1" "$thumb"
"#;

    fn script_delegate(dir: &Path, body: &str) -> CommandDelegate {
        let script = dir.join("proc.sh");
        std::fs::write(&script, body).unwrap();
        CommandDelegate::new("/bin/sh", vec![script.to_string_lossy().into_owned()])
    }

    #[test]
    fn runs_tool_and_collects_outputs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let delegate = script_delegate(tmp.path(), COPY_SCRIPT);
        let canvas = solid(8, 6, Rgba([10, 20, 30, 255]));
        let mut options = ProcessingOptions::new();
        options.insert("dimension".into(), "800x480".into());
        options.insert("tone-mode".into(), "contrast".into());

        let processed = delegate.process(&canvas, &options).unwrap();
        let decoded = image::load_from_memory(&processed.image).unwrap().to_rgba8();
        assert_eq!(decoded, canvas);
        assert_eq!(processed.thumbnail.as_deref(), Some(processed.image.as_slice()));

        let logged = std::fs::read_to_string(tmp.path().join("args.txt")).unwrap();
        let args: Vec<&str> = logged.lines().collect();
        assert_eq!(&args[..2], ["--dimension=800x480", "--tone-mode=contrast"]);
        assert_eq!(args[2], "--output");
        assert!(args[3].ends_with("out.png"));
        assert_eq!(args[4], "--thumbnail");
        assert!(args[5].ends_with("thumb.jpg"));
        assert!(args[6].ends_with("input.png"));
    }

    #[test]
    fn flag_like_values_stay_attached_to_their_key() {
        let tmp = tempfile::TempDir::new().unwrap();
        let delegate = script_delegate(tmp.path(), COPY_SCRIPT);
        let mut options = ProcessingOptions::new();
        options.insert("exposure".into(), "-0.5".into());
        options.insert("tone-mode".into(), "--output".into());

        let processed = delegate
            .process(&solid(4, 4, Rgba([1, 2, 3, 255])), &options)
            .unwrap();
        assert!(!processed.image.is_empty());

        let logged = std::fs::read_to_string(tmp.path().join("args.txt")).unwrap();
        let args: Vec<&str> = logged.lines().collect();
        assert_eq!(&args[..2], ["--exposure=-0.5", "--tone-mode=--output"]);
        assert_eq!(args.iter().filter(|a| **a == "--output").count(), 1);
    }

    #[test]
    fn missing_thumbnail_is_fine() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body = r#"
while [ $# -gt 1 ]; do
  case "$1" in --output) out="$2"; shift 2 ;; *) shift ;; esac
done
cp "$1" "$out"
"#;
        let delegate = script_delegate(tmp.path(), body);
        let processed = delegate
            .process(&solid(2, 2, Rgba([0, 0, 0, 255])), &ProcessingOptions::new())
            .unwrap();
        assert!(!processed.image.is_empty());
        assert!(processed.thumbnail.is_none());
    }

    #[test]
    fn failing_tool_reports_stderr() {
        let tmp = tempfile::TempDir::new().unwrap();
        let delegate = script_delegate(tmp.path(), "echo 'palette rejected' >&2\nexit 3\n");
        let err = delegate
            .process(&solid(2, 2, Rgba([0, 0, 0, 255])), &ProcessingOptions::new())
            .unwrap_err();
        match err {
            FrameError::Processing(msg) => assert!(msg.contains("palette rejected"), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_io_error() {
        let delegate = CommandDelegate::new("/nonexistent/processor", Vec::new());
        let err = delegate
            .process(&solid(2, 2, Rgba([0, 0, 0, 255])), &ProcessingOptions::new())
            .unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }
}
