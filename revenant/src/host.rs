use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use wisp::{AudioSink, Frame, FrameSink, KeySource, Keys, SerialSink};

/// A host without a screen, speakers, or controller. It counts frames and asks the emulator to
/// stop once the frame limit is reached or once it has been interrupted.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    frames: u64,
    frame_limit: Option<u64>,
    interrupt: Option<Arc<AtomicBool>>,
    print_serial: bool,
    serial: Vec<u8>,
    audio_writes: u64,
}

impl HeadlessHost {
    pub fn new(frame_limit: Option<u64>, print_serial: bool) -> Self {
        Self {
            frame_limit,
            print_serial,
            ..Self::default()
        }
    }

    /// Asks the emulator to stop as soon as the flag is raised (e.g. by a Ctrl-C handler).
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Everything that was sent over the serial port.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    pub fn audio_writes(&self) -> u64 {
        self.audio_writes
    }
}

impl FrameSink for HeadlessHost {
    fn present(&mut self, _frame: &Frame) {
        self.frames += 1;
        if self.frames % 600 == 0 {
            debug!("{} frames presented", self.frames);
        }
    }
}

impl KeySource for HeadlessHost {
    fn poll(&mut self) -> Keys {
        if self
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            info!("Interrupted, powering off");
            return Keys::quit();
        }
        match self.frame_limit {
            Some(limit) if self.frames >= limit => {
                info!("Reached the frame limit of {limit}");
                Keys::quit()
            }
            _ => Keys::new(),
        }
    }
}

impl AudioSink for HeadlessHost {
    fn register_write(&mut self, addr: u16, value: u8) {
        if self.audio_writes == 0 {
            debug!("Sound is not played, ignoring writes to the sound registers (first: 0x{value:0>2X} to 0x{addr:0>4X})");
        }
        self.audio_writes += 1;
    }
}

impl SerialSink for HeadlessHost {
    fn transfer(&mut self, byte: u8) {
        self.serial.push(byte);
        if self.print_serial {
            let mut stdout = std::io::stdout().lock();
            if let Err(err) = stdout.write_all(&[byte]).and_then(|_| stdout.flush()) {
                warn!("Could not print serial output: {err}");
            }
        }
    }
}
