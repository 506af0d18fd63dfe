use anyhow::{Context, bail};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Consumer of finished RGBA frames.
pub trait FrameSink {
    fn accept(&mut self, width: usize, height: usize, rgba: &[u8]) -> anyhow::Result<()>;

    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Appends frames as headerless `rgba` video.
///
/// The first frame fixes the frame size; later frames of a different size
/// are skipped. Play back with
/// `ffmpeg -f rawvideo -pix_fmt rgba -s WxH -r 20 -i PATH`.
pub struct RawVideoSink<W: Write = BufWriter<File>> {
    out: W,
    path: Option<PathBuf>,
    size: Option<(usize, usize)>,
    frames_written: u64,
    frames_skipped: u64,
}

impl RawVideoSink<BufWriter<File>> {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path).with_context(|| format!("create recording {}", path.display()))?;
        let mut sink = Self::new(BufWriter::new(file));
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }
}

impl<W: Write> RawVideoSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            path: None,
            size: None,
            frames_written: 0,
            frames_skipped: 0,
        }
    }

    pub fn frame_size(&self) -> Option<(usize, usize)> {
        self.size
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for RawVideoSink<W> {
    fn accept(&mut self, width: usize, height: usize, rgba: &[u8]) -> anyhow::Result<()> {
        if rgba.len() != width.saturating_mul(height).saturating_mul(4) {
            bail!("frame buffer is {} bytes, expected {width}x{height} rgba", rgba.len());
        }
        match self.size {
            None => self.size = Some((width, height)),
            Some(size) if size != (width, height) => {
                self.frames_skipped += 1;
                tracing::warn!(
                    expected_w = size.0,
                    expected_h = size.1,
                    width,
                    height,
                    "recording skipped a frame after a resize"
                );
                return Ok(());
            }
            Some(_) => {}
        }
        self.out.write_all(rgba).context("write recorded frame")?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.out.flush().context("flush recording")?;
        if let (Some(path), Some((w, h))) = (&self.path, self.size) {
            tracing::info!(
                path = %path.display(),
                frames = self.frames_written,
                skipped = self.frames_skipped,
                "recording closed; play with: ffmpeg -f rawvideo -pix_fmt rgba -s {w}x{h} -r 20 -i <file>"
            );
        }
        Ok(())
    }
}
