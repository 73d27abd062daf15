//! The host controller interface this driver is written against.
//!
//! The physical host controller (register map, clock generator, DMA engine) lives outside
//! this crate; callers supply an implementation of [`HostController`] that drives their own
//! hardware. This mirrors the split [`Timer`](super::timer::Timer) already makes for
//! timekeeping, just one layer further out.

use super::command::Command;
use super::response::{RawResponse, Response};

/// Response framing a [`HostController`] must recognize to size its capture correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    NoResponse,
    /// 48-bit response (R1, R1b, R3, R6, R7).
    _48Bits,
    /// 48-bit response with a busy signal held on DAT0 afterward (R1b).
    _48BitsBusy,
    /// 136-bit response (R2).
    _136Bits,
}

/// Bus clock target, used during transfer-speed tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSpeed {
    /// Identification-phase clock, at most 400 kHz.
    Identification,
    /// Default-speed data transfer clock, at most 25 MHz (SD) / 26 MHz ((e)MMC).
    DefaultSpeed,
    /// High-speed data transfer clock, at most 50 MHz.
    HighSpeed,
}

/// Which of the two slots a [`HostController`] call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The removable card slot.
    Card,
    /// The embedded (e)MMC slot.
    EMmc,
}
impl Slot {
    /// The process-wide device-record index this slot maps to. Kept internal to the crate so
    /// the two-slot array shape in [`super::device::Controller`] never leaks into the public
    /// `Slot` API.
    pub(crate) fn index(self) -> usize {
        match self {
            Slot::Card => 0,
            Slot::EMmc => 1,
        }
    }
}

/// The external collaborator this driver issues every command and data transfer through.
///
/// Implementations own the physical register map, the clock generator, and whatever DMA or
/// PIO path moves data in and out of `buffer`. This driver never touches hardware registers
/// directly; every operation in the init state machine and the sector I/O dispatcher goes
/// through this trait.
pub trait HostController {
    /// One-time power-up and line initialization for `slot`. Called once before any command
    /// is issued to that slot.
    fn init_port(&mut self, slot: Slot);

    /// Switch the slot's clock to `speed` and hold it there until a future call changes it,
    /// without waiting for any particular settling time. Used only for the very first clock
    /// activation before CMD0.
    fn set_clock_immediately(&mut self, slot: Slot, speed: ClockSpeed);

    /// Switch the slot's clock to `speed`, observing whatever settling/stabilization delay the
    /// controller requires before the new clock may be used to clock out a command.
    fn set_clock(&mut self, slot: Slot, speed: ClockSpeed);

    /// Program the data bus width used for the next and all following data transfers.
    fn set_bus_width(&mut self, slot: Slot, width: super::common::BusWidth);

    /// Program the block length, in bytes, used for the next and all following data transfers.
    fn set_block_len(&mut self, slot: Slot, len: u32);

    /// Point the controller's transfer engine at `buffer` for the next data-bearing command.
    /// `buffer` must remain valid until the matching [`send_command`](Self::send_command)
    /// returns.
    fn set_buffer(&mut self, slot: Slot, buffer: &mut [u8]);

    /// Issue `cmd` on `slot` and report whether the controller observed a command/response-level
    /// failure. The response itself, if any, is retrieved afterward with
    /// [`response`](Self::response).
    fn send_command<C: Command>(
        &mut self,
        slot: Slot,
        cmd: &C,
    ) -> Result<(), super::error::HostError>;

    /// Read back the raw response words captured by the most recent
    /// [`send_command`](Self::send_command) call.
    fn response(&self, slot: Slot) -> RawResponse;

    /// True when the slot's physical write-protect slider reports the card unlocked for
    /// writing (or the slot has no slider at all).
    fn card_slider_unlocked(&self, slot: Slot) -> bool;

    /// The clock frequency, in Hz, the slot is currently running at. Used to report bus speed
    /// to callers; has no effect on driver behavior.
    fn clock_hz(&self, slot: Slot) -> u32;
}

/// Convenience built on [`HostController::send_command`] +
/// [`HostController::response`]: issue `cmd` and decode its response type in one call.
pub fn issue<H: HostController, C: Command<RESPONSE = R>, R: Response>(
    host: &mut H,
    slot: Slot,
    cmd: &C,
) -> Result<R, super::error::HostError> {
    host.send_command(slot, cmd)?;
    Ok(R::read(host.response(slot)))
}
