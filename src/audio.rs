use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Analysis window length in samples.
pub const FFT_SIZE: usize = 256;
/// Frequency bins published per analysis frame.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

/// Anything that can report the latest byte-scaled spectrum.
pub trait AudioEnergySource {
    fn latest_bins(&self) -> [u8; BIN_COUNT];

    /// Mean bin level normalized to `[0, 2]`.
    fn energy(&self) -> f32 {
        normalized_energy(&self.latest_bins())
    }
}

pub fn normalized_energy(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| b as u64).sum();
    (sum as f64 / (bins.len() as f64 * 255.0) * 2.0) as f32
}

/// Seqlock-published spectrum, four bins packed per word.
pub struct AtomicSpectrum {
    seq: AtomicU64,
    words: [AtomicU32; BIN_COUNT / 4],
}

impl AtomicSpectrum {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            words: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    pub fn store(&self, bins: &[u8; BIN_COUNT]) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        for (dst, chunk) in self.words.iter().zip(bins.chunks_exact(4)) {
            dst.store(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]), Ordering::Relaxed);
        }
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self) -> [u8; BIN_COUNT] {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let mut bins = [0u8; BIN_COUNT];
            for (chunk, src) in bins.chunks_exact_mut(4).zip(&self.words) {
                chunk.copy_from_slice(&src.load(Ordering::Relaxed).to_le_bytes());
            }
            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return bins;
            }
        }
    }
}

impl Default for AtomicSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEnergySource for AtomicSpectrum {
    fn latest_bins(&self) -> [u8; BIN_COUNT] {
        self.load()
    }
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureInfo {
    pub device_name: String,
    pub sample_rate_hz: u32,
}

/// Microphone capture running on its own thread.
///
/// The thread opens the device, reports the outcome once through `poll_ready`,
/// then analyzes samples until the capture is dropped. The cpal stream never
/// leaves that thread. Dropping a capture whose device is still opening does
/// not wait for it.
pub struct AudioCapture {
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    spectrum: Arc<AtomicSpectrum>,
    ready: mpsc::Receiver<anyhow::Result<CaptureInfo>>,
    live: bool,
}

impl AudioCapture {
    pub fn start(device_query: Option<String>) -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let spectrum = Arc::new(AtomicSpectrum::new());
        let (tx, ready) = mpsc::channel();

        let stop_for_thread = Arc::clone(&stop);
        let spectrum_for_thread = Arc::clone(&spectrum);
        let worker = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                capture_thread(device_query.as_deref(), &stop_for_thread, &spectrum_for_thread, tx)
            })
            .context("spawn audio capture thread")?;

        Ok(Self {
            stop,
            worker: Some(worker),
            spectrum,
            ready,
            live: false,
        })
    }

    /// Non-blocking: `Some` exactly once, when the device has opened or failed.
    pub fn poll_ready(&mut self) -> Option<anyhow::Result<CaptureInfo>> {
        match self.ready.try_recv() {
            Ok(outcome) => {
                self.live = outcome.is_ok();
                Some(outcome)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(anyhow!("audio capture thread exited"))),
        }
    }

    pub fn spectrum(&self) -> Arc<AtomicSpectrum> {
        Arc::clone(&self.spectrum)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(h) = self.worker.take() else {
            return;
        };
        // An opening device can stall inside cpal; that thread exits on its own once it returns.
        if self.live || h.is_finished() {
            let _ = h.join();
        }
    }
}

fn capture_thread(
    device_query: Option<&str>,
    stop: &AtomicBool,
    spectrum: &AtomicSpectrum,
    ready: mpsc::Sender<anyhow::Result<CaptureInfo>>,
) {
    let opened = open_input_stream(device_query);
    let (stream, mut cons, info) = match opened {
        Ok(parts) => parts,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if stop.load(Ordering::Relaxed) || ready.send(Ok(info)).is_err() {
        return;
    }
    analyze_loop(&mut cons, stop, spectrum);
    drop(stream);
}

fn open_input_stream(
    device_query: Option<&str>,
) -> anyhow::Result<(cpal::Stream, ringbuf::HeapCons<f32>, CaptureInfo)> {
    let host = cpal::default_host();
    let device = select_input_device(&host, device_query)?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
    let supported = device
        .default_input_config()
        .context("get default input config")?;
    let sample_rate_hz = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.clone().into();

    let rb = HeapRb::<f32>::new((sample_rate_hz as usize).max(FFT_SIZE * 4));
    let (mut prod, cons) = rb.split();

    let err_fn = |err| tracing::warn!(error = %err, "audio stream error");

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
            err_fn,
            None,
        )?,
        fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
    };
    stream.play().context("start input stream")?;

    Ok((
        stream,
        cons,
        CaptureInfo {
            device_name,
            sample_rate_hz,
        },
    ))
}

fn select_input_device(host: &cpal::Host, device_query: Option<&str>) -> anyhow::Result<cpal::Device> {
    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        let devices = host
            .input_devices()
            .context("enumerate input devices")?
            .collect::<Vec<_>>();
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(data: &[T], channels: usize, prod: &mut ringbuf::HeapProd<f32>) {
    let channels = channels.max(1);
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let _ = prod.try_push(acc / channels as f32);
    }
}

/// Sliding-window spectrum analysis shaped like a browser analyser node.
pub struct SpectrumAnalyzer {
    hann: Vec<f32>,
    fft: Arc<dyn rustfft::Fft<f32>>,
    fft_buf: Vec<Complex<f32>>,
    smoothed: [f32; BIN_COUNT],
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let n = FFT_SIZE;
        let hann = (0..n)
            .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
            .collect::<Vec<_>>();
        let mut planner = FftPlanner::<f32>::new();
        Self {
            hann,
            fft: planner.plan_fft_forward(n),
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: [0.0; BIN_COUNT],
        }
    }

    /// Analyze `FFT_SIZE` samples of a ring starting at `start` and return byte levels.
    pub fn process(&mut self, ring: &[f32], start: usize) -> [u8; BIN_COUNT] {
        let n = FFT_SIZE;
        for i in 0..n {
            let s = ring.get((start + i) % ring.len().max(1)).copied().unwrap_or(0.0);
            self.fft_buf[i] = Complex { re: s * self.hann[i], im: 0.0 };
        }
        self.fft.process(&mut self.fft_buf);

        let mut bins = [0u8; BIN_COUNT];
        for (k, out) in bins.iter_mut().enumerate() {
            let c = self.fft_buf[k];
            let mag = (c.re * c.re + c.im * c.im).sqrt() / n as f32;
            self.smoothed[k] = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * mag;
            *out = db_to_byte(20.0 * self.smoothed[k].max(1e-12).log10());
        }
        bins
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn db_to_byte(db: f32) -> u8 {
    if !db.is_finite() {
        return 0;
    }
    let scaled = (db - MIN_DB) / (MAX_DB - MIN_DB) * 255.0;
    scaled.clamp(0.0, 255.0).floor() as u8
}

fn analyze_loop(cons: &mut ringbuf::HeapCons<f32>, stop: &AtomicBool, spectrum: &AtomicSpectrum) {
    let n = FFT_SIZE;
    let hop = FFT_SIZE / 2;
    let mut analyzer = SpectrumAnalyzer::new();
    let mut scratch = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            scratch[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            filled = (filled + 1).min(n);
            since_last += 1;
            if filled == n && since_last >= hop {
                since_last = 0;
                spectrum.store(&analyzer.process(&scratch, write_pos));
            }
        }
        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioStatus {
    Off,
    Pending,
    Live,
    Unavailable,
}

enum LinkState {
    Off,
    Pending(AudioCapture),
    Live(AudioCapture, CaptureInfo),
    Unavailable(String),
}

/// Render-loop side of audio acquisition. Never blocks; failure leaves audio off.
pub struct AudioLink {
    device_query: Option<String>,
    state: LinkState,
}

impl AudioLink {
    pub fn new(device_query: Option<String>) -> Self {
        Self {
            device_query,
            state: LinkState::Off,
        }
    }

    pub fn enable(&mut self) {
        if matches!(self.state, LinkState::Pending(_) | LinkState::Live(..)) {
            return;
        }
        self.state = match AudioCapture::start(self.device_query.clone()) {
            Ok(capture) => {
                tracing::info!(device = ?self.device_query, "requesting audio input");
                LinkState::Pending(capture)
            }
            Err(err) => {
                tracing::warn!(error = %err, "audio capture could not start");
                LinkState::Unavailable(err.to_string())
            }
        };
    }

    pub fn disable(&mut self) {
        self.state = LinkState::Off;
    }

    /// Advance a pending request. Returns the status after the check.
    pub fn poll(&mut self) -> AudioStatus {
        if let LinkState::Pending(capture) = &mut self.state {
            match capture.poll_ready() {
                Some(Ok(info)) => {
                    tracing::info!(device = %info.device_name, sample_rate_hz = info.sample_rate_hz, "audio input live");
                    if let LinkState::Pending(capture) = std::mem::replace(&mut self.state, LinkState::Off) {
                        self.state = LinkState::Live(capture, info);
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %format!("{err:#}"), "audio input unavailable");
                    self.state = LinkState::Unavailable(format!("{err:#}"));
                }
                None => {}
            }
        }
        self.status()
    }

    pub fn status(&self) -> AudioStatus {
        match self.state {
            LinkState::Off => AudioStatus::Off,
            LinkState::Pending(_) => AudioStatus::Pending,
            LinkState::Live(..) => AudioStatus::Live,
            LinkState::Unavailable(_) => AudioStatus::Unavailable,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            LinkState::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }

    /// Latest normalized energy, only while live.
    pub fn energy(&self) -> Option<f32> {
        match &self.state {
            LinkState::Live(capture, _) => Some(capture.spectrum.energy()),
            _ => None,
        }
    }

    pub fn hud_label(&self) -> &'static str {
        match self.status() {
            AudioStatus::Off => "off",
            AudioStatus::Pending => "opening",
            AudioStatus::Live => "live",
            AudioStatus::Unavailable => "unavailable",
        }
    }
}
