//! Shared scaffolding for the integration tests: a scripted [`HostController`] fake and a
//! no-op [`Timer`].
//!
//! The fake is an ordered script rather than a call-expectation mock: each test pushes the
//! exact sequence of commands it expects `init`/`read_sectors`/`write_sectors` to issue, in
//! order, along with the response words (or host error) each one should produce. A command
//! arriving out of order, with an unexpected index, or with a mismatched argument panics
//! immediately with a message naming both sides, which is more informative for a state machine
//! this linear than a generic "unexpected call" failure would be.

use std::collections::VecDeque;
use std::time::Duration;

use sdmmc::command::Command;
use sdmmc::response::RawResponse;
use sdmmc::{BusWidth, ClockSpeed, HostController, HostError, Slot, Timer};

/// One scripted exchange: the command this step expects next, and what the controller should
/// report back.
pub struct Step {
    index: u8,
    argument: Option<u32>,
    outcome: Outcome,
    /// Bytes copied into whatever buffer is currently staged via `set_buffer`, simulating a
    /// data block arriving on DAT alongside this response (used for SWITCH_FUNC's status
    /// block).
    data: Option<Vec<u8>>,
}

enum Outcome {
    Ok(RawResponse),
    Err(HostError),
}

impl Step {
    pub fn ok(index: u8, words: RawResponse) -> Self {
        Step { index, argument: None, outcome: Outcome::Ok(words), data: None }
    }

    pub fn ok_arg(index: u8, argument: u32, words: RawResponse) -> Self {
        Step { index, argument: Some(argument), outcome: Outcome::Ok(words), data: None }
    }

    pub fn ok_with_data(index: u8, argument: u32, words: RawResponse, data: Vec<u8>) -> Self {
        Step { index, argument: Some(argument), outcome: Outcome::Ok(words), data: Some(data) }
    }

    pub fn err(index: u8, argument: u32, err: HostError) -> Self {
        Step { index, argument: Some(argument), outcome: Outcome::Err(err), data: None }
    }
}

/// Enables `log` output (via `env_logger`, respecting `RUST_LOG`) for the calling test, so a
/// failure's `debug!`/`info!`/`warn!` trail from `init.rs`/`io.rs` shows up in test output.
/// Safe to call from every test in a binary: `try_init` just reports the repeat attempt, which
/// is discarded.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The argument a command encodes, read the same way the driver itself reads it.
pub fn arg<C: Command>(c: &C) -> u32 {
    u32::from(c.argument())
}

/// Packs a 128-bit register value into the four MSB-first words `R2::read` expects.
pub fn r2_words(v: u128) -> RawResponse {
    [
        ((v >> 96) & 0xffff_ffff) as u32,
        ((v >> 64) & 0xffff_ffff) as u32,
        ((v >> 32) & 0xffff_ffff) as u32,
        (v & 0xffff_ffff) as u32,
    ]
}

/// Packs a 32-bit response into the low word other response types use.
pub fn r32(low: u32) -> RawResponse {
    [0, 0, 0, low]
}

/// Assembles raw CSD content out of `(start_bit, width, value)` triples, mirroring the layout
/// tables in `card::reg`.
pub fn csd_with(fields: &[(u32, u32, u64)]) -> u128 {
    let mut v: u128 = 0;
    for &(start, size, val) in fields {
        let mask: u128 = if size >= 128 { u128::MAX } else { (1u128 << size) - 1 };
        v |= ((val as u128) & mask) << start;
    }
    v
}

/// Packs an R6 (published RCA) response.
pub fn r6_word(rca: u16, status: u16) -> RawResponse {
    r32(((rca as u32) << 16) | status as u32)
}

pub struct MockHost {
    steps: VecDeque<Step>,
    last_response: RawResponse,
    buffer: Option<(*mut u8, usize)>,
    slider_unlocked: bool,
    clock_hz: u32,
    pub clock_log: Vec<(Slot, ClockSpeed)>,
    pub bus_width_log: Vec<(Slot, BusWidth)>,
    pub init_port_called: bool,
}

impl MockHost {
    pub fn new(steps: Vec<Step>) -> Self {
        MockHost {
            steps: steps.into(),
            last_response: [0; 4],
            buffer: None,
            slider_unlocked: true,
            clock_hz: 400_000,
            clock_log: Vec::new(),
            bus_width_log: Vec::new(),
            init_port_called: false,
        }
    }

    pub fn lock_slider(&mut self) {
        self.slider_unlocked = false;
    }

    /// True once every scripted step has been consumed. Tests assert this at the end so a
    /// script that over-specifies (more steps than the driver actually issues) fails loudly
    /// instead of silently passing.
    pub fn exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

impl HostController for MockHost {
    fn init_port(&mut self, _slot: Slot) {
        self.init_port_called = true;
    }

    fn set_clock_immediately(&mut self, slot: Slot, speed: ClockSpeed) {
        self.clock_log.push((slot, speed));
        self.clock_hz = clock_hz_for(speed);
    }

    fn set_clock(&mut self, slot: Slot, speed: ClockSpeed) {
        self.clock_log.push((slot, speed));
        self.clock_hz = clock_hz_for(speed);
    }

    fn set_bus_width(&mut self, slot: Slot, width: BusWidth) {
        self.bus_width_log.push((slot, width));
    }

    fn set_block_len(&mut self, _slot: Slot, _len: u32) {}

    fn set_buffer(&mut self, _slot: Slot, buffer: &mut [u8]) {
        self.buffer = Some((buffer.as_mut_ptr(), buffer.len()));
    }

    fn send_command<C: Command>(&mut self, _slot: Slot, cmd: &C) -> Result<(), HostError> {
        let step = self
            .steps
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected CMD{} sent, script exhausted", C::INDEX));
        assert_eq!(
            step.index,
            C::INDEX,
            "expected CMD{}, driver sent CMD{}",
            step.index,
            C::INDEX
        );
        let argument = arg(cmd);
        if let Some(expected) = step.argument {
            assert_eq!(
                expected, argument,
                "CMD{} argument mismatch: expected {:#x}, got {:#x}",
                C::INDEX, expected, argument
            );
        }
        if let Some(data) = &step.data {
            let (ptr, len) = self.buffer.expect("data-bearing step but no buffer staged");
            assert!(data.len() <= len, "scripted response data larger than staged buffer");
            unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len()) };
        }
        match step.outcome {
            Outcome::Ok(words) => {
                self.last_response = words;
                Ok(())
            }
            Outcome::Err(e) => Err(e),
        }
    }

    fn response(&self, _slot: Slot) -> RawResponse {
        self.last_response
    }

    fn card_slider_unlocked(&self, _slot: Slot) -> bool {
        self.slider_unlocked
    }

    fn clock_hz(&self, _slot: Slot) -> u32 {
        self.clock_hz
    }
}

fn clock_hz_for(speed: ClockSpeed) -> u32 {
    match speed {
        ClockSpeed::Identification => 400_000,
        ClockSpeed::DefaultSpeed => 25_000_000,
        ClockSpeed::HighSpeed => 50_000_000,
    }
}

/// A [`Timer`] that never actually sleeps; it just counts how many times `wait` was asked to.
pub struct FakeTimer {
    pub waits: std::cell::Cell<u32>,
}

impl FakeTimer {
    pub fn new() -> Self {
        FakeTimer { waits: std::cell::Cell::new(0) }
    }
}

impl Timer for FakeTimer {
    fn wait_for<C: Fn() -> bool>(&self, condition: C, _timeout: Duration) -> Result<Duration, ()> {
        if condition() {
            Ok(Duration::from_secs(0))
        } else {
            Err(())
        }
    }

    fn wait(&self, _d: Duration) {
        self.waits.set(self.waits.get() + 1);
    }

    fn wait_cycles(&self, _n: u64) {}
}
