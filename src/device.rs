//! Process-wide card state and the public device facade.
//!
//! Exactly two slots are tracked, guarded by a single [`spin::Mutex`] rather than per-slot
//! locks: the driver's cooperative, single-threaded scheduling model means contention is never
//! expected, and a single lock keeps `init`/`deinit` from observing a half-updated slot pair.

use spin::Mutex;

use super::card::reg::CID;
use super::card::CardType;
use super::common::{BusWidth, RCA};
use super::host::{HostController, Slot};

/// Everything the facade remembers about one slot between calls.
#[derive(Debug, Clone, Copy)]
pub struct Device {
    pub(crate) card_type: CardType,
    pub(crate) spec_vers: u8,
    pub(crate) rca: Option<RCA>,
    pub(crate) ccc: u16,
    pub(crate) cid: Option<CID>,
    pub(crate) sectors: u64,
    pub(crate) bus_width: BusWidth,
}
impl Device {
    pub const fn none() -> Self {
        Device {
            card_type: CardType::None,
            spec_vers: 0,
            rca: None,
            ccc: 0,
            cid: None,
            sectors: 0,
            bus_width: BusWidth::_1Bit,
        }
    }

    pub fn is_present(&self) -> bool {
        self.card_type != CardType::None
    }
}

/// Information about an initialized card, returned by [`Controller::get_info`].
#[derive(Debug, Clone, Copy)]
pub struct CardInfo {
    pub card_type: CardType,
    /// (e)MMC CSD spec version; always 0 for SD.
    pub spec_vers: u8,
    pub rca: RCA,
    pub sectors: u64,
    /// Currently configured host clock, read live from the host controller.
    pub clock_hz: u32,
    pub cid: CID,
    /// Command class bitmap from CSD: bit *i* set means class *i* is supported.
    pub ccc: u16,
    pub bus_width: BusWidth,
}

/// The two-slot process-wide device table.
///
/// A single instance is expected to be held in a `static` by the caller (e.g.
/// `static CONTROLLER: sdmmc::Controller = sdmmc::Controller::new();`), the same way the
/// rest of this driver's ambient state is meant to be shared across a cooperative scheduler
/// without an allocator.
pub struct Controller {
    slots: Mutex<[Device; 2]>,
}
impl Controller {
    pub const fn new() -> Self {
        Controller {
            slots: Mutex::new([Device::none(), Device::none()]),
        }
    }

    pub(crate) fn with_slot<R>(&self, slot: Slot, f: impl FnOnce(&mut Device) -> R) -> R {
        let mut slots = self.slots.lock();
        f(&mut slots[slot.index()])
    }

    /// Snapshot of `slot`'s card metadata, or `None` if no card is initialized there.
    ///
    /// `clock_hz` is read live from `host` rather than cached, since the bus clock can change
    /// independently of the cached device record (e.g. a caller reprogramming the controller
    /// directly).
    pub fn get_info<H: HostController>(&self, slot: Slot, host: &H) -> Option<CardInfo> {
        self.with_slot(slot, |d| {
            d.is_present().then(|| CardInfo {
                card_type: d.card_type,
                spec_vers: d.spec_vers,
                rca: d.rca.expect("present card always has an rca"),
                sectors: d.sectors,
                clock_hz: host.clock_hz(slot),
                cid: d.cid.expect("present card always has a cid"),
                ccc: d.ccc,
                bus_width: d.bus_width,
            })
        })
    }

    /// The card identification register captured during `init`, if any.
    pub fn get_cid(&self, slot: Slot) -> Option<CID> {
        self.with_slot(slot, |d| d.cid)
    }

    /// Total addressable 512-byte sectors, or `0` if no card is initialized.
    pub fn get_sectors(&self, slot: Slot) -> u64 {
        self.with_slot(slot, |d| d.sectors)
    }

    /// Forgets `slot`'s card, allowing `init` to be called again for it. Does not touch the
    /// host controller: callers are expected to power down or reset the slot themselves before
    /// calling `init` again.
    pub fn deinit(&self, slot: Slot) {
        self.with_slot(slot, |d| *d = Device::none());
    }
}
impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
