use std::thread;
use std::time::Duration;

use log::warn;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

pub const SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_FREQ: u32 = 800;
pub const DEFAULT_MS: u64 = 200;

// Roughly the 4000/32768 the reference tone used.
const VOLUME: f32 = 0.12;

/// Single-tone beeper. A tone is synthesized to its exact duration and
/// handed to a detached sink, so playback can never outlive the call: the
/// caller sleeps for the same duration the buffer holds.
pub struct Beeper {
    handle: Option<OutputStreamHandle>,
}

impl Beeper {
    /// Open the default output device. The returned stream must stay on the
    /// calling thread and outlive playback; the `Beeper` itself may be
    /// shared across threads. A missing device is not fatal: beeps degrade
    /// to their blocking sleep, matching a muted console.
    pub fn open() -> (Option<OutputStream>, Beeper) {
        match OutputStream::try_default() {
            Ok((stream, handle)) => (
                Some(stream),
                Beeper {
                    handle: Some(handle),
                },
            ),
            Err(e) => {
                warn!("No audio output available, beeps will be silent: {}", e);
                (None, Beeper { handle: None })
            }
        }
    }

    /// A beeper with no output device, for quiet operation.
    pub fn silent() -> Beeper {
        Beeper { handle: None }
    }

    /// The default tone: 800 Hz for 200 ms.
    pub fn beep(&self) {
        self.beep_freq(DEFAULT_FREQ, DEFAULT_MS);
    }

    /// Play a sine tone at `freq` Hz and block for `ms` milliseconds.
    pub fn beep_freq(&self, freq: u32, ms: u64) {
        if let Some(handle) = &self.handle {
            match Sink::try_new(handle) {
                Ok(sink) => {
                    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, sine_samples(freq, ms)));
                    sink.detach();
                }
                Err(e) => warn!("Beep failed: {}", e),
            }
        }
        thread::sleep(Duration::from_millis(ms));
    }
}

fn sine_samples(freq: u32, ms: u64) -> Vec<f32> {
    let total = (SAMPLE_RATE as u64 * ms / 1000) as usize;
    let step = freq as f32 / SAMPLE_RATE as f32;
    (0..total)
        .map(|i| VOLUME * (i as f32 * step * std::f32::consts::TAU).sin())
        .collect()
}
