use crate::render::{Frame, Renderer, begin_frame, draw_overlay_popup, end_frame, write_hud};
use anyhow::{Context, anyhow};
use base64::Engine;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap, shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use std::fs;
use std::io::Write;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

const TRANSPORT_ENV: &str = "MINKOWSKI_KITTY_TRANSPORT";

/// How pixel data reaches the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KittyTransport {
    Shm,
    File,
    Direct,
}

impl KittyTransport {
    fn label(self) -> &'static str {
        match self {
            Self::Shm => "shm",
            Self::File => "file",
            Self::Direct => "direct",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "direct" | "d" => Some(Self::Direct),
            "file" | "f" | "temp" | "tempfile" => Some(Self::File),
            "shm" | "s" | "shared" => Some(Self::Shm),
            _ => None,
        }
    }

    /// Preferred order: a forced transport, else shared memory first
    /// except under Ghostty where direct payloads are the reliable path.
    fn chain() -> Vec<Self> {
        if let Some(forced) = std::env::var(TRANSPORT_ENV).ok().as_deref().and_then(Self::parse) {
            return vec![forced];
        }
        let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default().to_ascii_lowercase();
        if term_program.contains("ghostty") {
            vec![Self::Direct, Self::File, Self::Shm]
        } else {
            vec![Self::Shm, Self::Direct, Self::File]
        }
    }
}

/// POSIX shared-memory object mapped read/write, resized on demand.
struct ShmRegion {
    name: String,
    ptr: Option<NonNull<std::ffi::c_void>>,
    len: usize,
}

impl ShmRegion {
    fn new(name: String) -> Self {
        Self { name, ptr: None, len: 0 }
    }

    fn unmap(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: `ptr` came from mmap with exactly `self.len` bytes.
            unsafe {
                let _ = munmap(ptr, self.len);
            }
        }
        self.len = 0;
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let len = bytes.len();
        let len_nz = NonZeroUsize::new(len).context("empty pixel buffer")?;
        if self.len != len || self.ptr.is_none() {
            self.unmap();
            let fd = shm_open(
                self.name.as_str(),
                nix::fcntl::OFlag::O_CREAT | nix::fcntl::OFlag::O_RDWR,
                Mode::from_bits_truncate(0o600),
            )
            .with_context(|| format!("shm_open({})", self.name))?;
            ftruncate(&fd, len as i64).context("ftruncate shm")?;
            // SAFETY: fresh shared mapping of a descriptor we just sized to `len`.
            let ptr = unsafe {
                mmap(
                    None,
                    len_nz,
                    ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                    MapFlags::MAP_SHARED,
                    fd,
                    0,
                )
            }
            .context("mmap shm")?;
            self.ptr = Some(ptr);
            self.len = len;
        }
        let ptr = self.ptr.ok_or_else(|| anyhow!("shm not mapped"))?;
        // SAFETY: the mapping is `len` bytes long and does not alias `bytes`.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr().cast::<u8>(), len);
        }
        Ok(())
    }
}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        self.unmap();
        let _ = shm_unlink(self.name.as_str());
    }
}

/// Kitty graphics protocol presenter (2x4 canvas pixels per cell, scaled by the terminal).
pub struct KittyRenderer {
    image_id: u32,
    shm: ShmRegion,
    shm_payload_b64: String,
    temp_path: String,
    temp_payload_b64: String,
    transports: Vec<KittyTransport>,
    active: usize,
    b64_buf: Vec<u8>,
    overlay_visible_last: bool,
    last_hud_rows: u16,
}

impl KittyRenderer {
    pub fn new() -> Self {
        let b64 = &base64::engine::general_purpose::STANDARD;
        let pid = std::process::id();
        // Short name: some platforms cap shm names tightly.
        let shm_name = format!("/mkg{pid}");
        let temp_path = std::env::temp_dir()
            .join(format!("minkowski-grid-{pid}.rgba"))
            .to_string_lossy()
            .into_owned();

        Self {
            image_id: 1,
            shm_payload_b64: b64.encode(shm_name.as_bytes()),
            shm: ShmRegion::new(shm_name),
            temp_payload_b64: b64.encode(temp_path.as_bytes()),
            temp_path,
            transports: KittyTransport::chain(),
            active: 0,
            b64_buf: Vec::new(),
            overlay_visible_last: false,
            last_hud_rows: 0,
        }
    }

    fn transmit(
        &mut self,
        transport: KittyTransport,
        frame: &Frame<'_>,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let (w, h) = (frame.pixel_width, frame.pixel_height);
        let (cols, rows) = (frame.term_cols, frame.visual_rows);
        let header = |medium: char| {
            format!(
                "\x1b_Ga=T,f=32,s={w},v={h},t={medium},i={},p=1,c={cols},r={rows},C=1,q=2,z=-1",
                self.image_id
            )
        };
        match transport {
            KittyTransport::Direct => {
                let head = header('d');
                write_direct_payload(out, &head, frame.pixels_rgba, &mut self.b64_buf)
            }
            KittyTransport::File => {
                fs::write(self.temp_path.as_str(), frame.pixels_rgba)
                    .with_context(|| format!("write kitty temp file {}", self.temp_path))?;
                write!(out, "{};{}\x1b\\", header('f'), self.temp_payload_b64)?;
                Ok(())
            }
            KittyTransport::Shm => {
                self.shm.write(frame.pixels_rgba)?;
                write!(out, "{};{}\x1b\\", header('s'), self.shm_payload_b64)?;
                Ok(())
            }
        }
    }
}

impl Default for KittyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for KittyRenderer {
    fn name(&self) -> &'static str {
        "kitty"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let visual_rows = frame.visual_rows as usize;
        if frame.term_cols == 0 || visual_rows == 0 || frame.pixel_width == 0 || frame.pixel_height == 0 {
            return Ok(());
        }

        begin_frame(out, frame.sync_updates)?;

        if let Some(text) = frame.overlay {
            // Hide the image so the text popup is readable.
            write!(out, "\x1b_Ga=d,d=I,i={}\x1b\\", self.image_id)?;
            clear_text_rows(out, frame.term_rows as usize)?;
            write_hud(out, frame)?;
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
            self.overlay_visible_last = true;
            self.last_hud_rows = frame.hud_rows;
            end_frame(out, frame.sync_updates)?;
            return Ok(());
        }

        out.write_all(b"\x1b[H")?;
        let start = self.active.min(self.transports.len().saturating_sub(1));
        let mut last_err: Option<anyhow::Error> = None;
        let mut sent = false;
        for step in 0..self.transports.len() {
            let idx = (start + step) % self.transports.len();
            let transport = self.transports[idx];
            match self.transmit(transport, frame, out) {
                Ok(()) => {
                    if idx != self.active {
                        tracing::info!(transport = transport.label(), "kitty transport selected");
                    }
                    self.active = idx;
                    sent = true;
                    break;
                }
                // Terminal I/O failure: another transport cannot help.
                Err(err) if err.downcast_ref::<std::io::Error>().is_some() => return Err(err),
                Err(err) => {
                    tracing::debug!(transport = transport.label(), error = %err, "kitty transport failed");
                    last_err = Some(err.context(format!("kitty transport '{}' failed", transport.label())));
                }
            }
        }
        if !sent {
            return Err(last_err.unwrap_or_else(|| anyhow!("no kitty transport succeeded")));
        }

        if frame.hud_rows != self.last_hud_rows {
            clear_text_rows(out, frame.term_rows as usize)?;
        }
        if self.overlay_visible_last {
            clear_text_rows(out, visual_rows)?;
        }
        write_hud(out, frame)?;

        self.overlay_visible_last = false;
        self.last_hud_rows = frame.hud_rows;
        end_frame(out, frame.sync_updates)?;
        Ok(())
    }
}

impl Drop for KittyRenderer {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.temp_path.as_str());
    }
}

/// Send `rgba` inline as chunked base64 (4096 encoded bytes per escape).
fn write_direct_payload(
    out: &mut dyn Write,
    header: &str,
    rgba: &[u8],
    b64_buf: &mut Vec<u8>,
) -> anyhow::Result<()> {
    const RAW_CHUNK: usize = 3 * 1024;
    if rgba.is_empty() {
        return Ok(());
    }

    let mut chunks = rgba.chunks(RAW_CHUNK).peekable();
    let mut first = true;
    while let Some(chunk) = chunks.next() {
        let more = chunks.peek().is_some();
        let b64_len = chunk.len().div_ceil(3) * 4;
        if b64_buf.len() < b64_len {
            b64_buf.resize(b64_len, 0);
        }
        let written = base64::engine::general_purpose::STANDARD
            .encode_slice(chunk, &mut b64_buf[..b64_len])
            .context("base64 encode pixels")?;

        let m = u8::from(more);
        if first {
            write!(out, "{header},m={m};")?;
            first = false;
        } else {
            write!(out, "\x1b_Gm={m};")?;
        }
        out.write_all(&b64_buf[..written])?;
        out.write_all(b"\x1b\\")?;
    }
    Ok(())
}

fn clear_text_rows(out: &mut dyn Write, rows: usize) -> std::io::Result<()> {
    for row in 1..=rows {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_payload_chunks_with_continuation_flags() {
        let rgba = vec![7u8; 3 * 1024 * 2 + 12];
        let mut out = Vec::new();
        let mut buf = Vec::new();
        write_direct_payload(&mut out, "\x1b_Ga=T", &rgba, &mut buf).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\x1b_Ga=T,m=1;"));
        assert_eq!(text.matches("\x1b_Gm=1;").count(), 1);
        assert_eq!(text.matches("\x1b_Gm=0;").count(), 1);
    }

    #[test]
    fn transport_tokens_parse() {
        assert_eq!(KittyTransport::parse("SHM"), Some(KittyTransport::Shm));
        assert_eq!(KittyTransport::parse("tempfile"), Some(KittyTransport::File));
        assert_eq!(KittyTransport::parse("carrier-pigeon"), None);
    }
}
