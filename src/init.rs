//! The card identification and transfer-speed tuning state machine.
//!
//! Walks a freshly powered slot from an unknown electrical state through to the Transfer
//! state: GO_IDLE_STATE, card-type discrimination (SD v2+ / SD v1 / (e)MMC), identification,
//! relative address assignment, CSD readout, selection, and finally bus-width/high-speed
//! tuning. Each OCR poll iteration re-issues the app command (or CMD1) before reading a fresh
//! OCR, rather than reusing the response captured before the loop began.

use core::time::Duration;

use log::{debug, info, warn};

use super::card::reg::OCR;
use super::card::CardType;
use super::command::{CMD0, CMD2, CMD55, CMD7, CMD8, CMD9, ACMD41};
use super::command::{MmcSetRelativeAddr, MmcSwitch, SdAppSetBusWidth, SdAppSetClrCardDetect};
use super::command::{SdSendRelativeAddr, SdSwitchFunc, SdSwitchFuncArg};
use super::common::{BusWidth, SupplyVoltage, VoltageWindow, RCA};
use super::decode::decode_csd;
use super::device::{CardInfo, Controller, Device};
use super::error::{Error, HostError};
use super::host::{self, ClockSpeed, HostController, Slot};
use super::response::{R1, R1b, R3, R6};
use super::timer::Timer;

/// Host-side multiplier on the 74-clock-cycle warm-up the card specs mandate before the first
/// command: the timer this driver waits against ticks at twice the controller's init clock, so
/// the cycle count to wait is doubled to compensate.
const WARMUP_CYCLES: u64 = 74 * 2;

const OCR_POLL_INTERVAL: Duration = Duration::from_millis(5);
const OCR_POLL_BUDGET: u32 = 200; // ~1 second, in OCR_POLL_INTERVAL steps

/// Brings up the card in `slot` and records its metadata in `controller`.
///
/// Fails with [`Error::Initialized`] if `slot` already holds a card; call
/// [`Controller::deinit`] first to re-run identification.
pub fn init<H: HostController, T: Timer>(
    controller: &Controller,
    host: &mut H,
    timer: &T,
    slot: Slot,
) -> Result<CardInfo, Error> {
    if controller.get_info(slot, host).is_some() {
        return Err(Error::Initialized);
    }

    // Phase 0: power-up preparation.
    host.init_port(slot);
    host.set_clock_immediately(slot, ClockSpeed::Identification);
    timer.wait_cycles(WARMUP_CYCLES);

    // Phase 1: GO_IDLE_STATE.
    host::issue::<H, CMD0, _>(host, slot, &CMD0).map_err(|_| Error::GoIdleState)?;
    debug!("card went idle");

    // Phase 2: card-type discrimination.
    let card_type = discriminate_card_type(host, timer, slot)?;
    info!("card type: {:?}", card_type);

    // Phase 3: identification. Stop the clock at idle between commands now that OCR
    // negotiation is done; a continuous clock was only required for that negotiation.
    host.set_clock(slot, ClockSpeed::Identification);
    let cid = host::issue::<H, CMD2, _>(host, slot, &CMD2)
        .map_err(|_| Error::AllSendCid)?
        .0;

    // Phase 4: relative address assignment.
    let rca = if card_type.is_mmc_family() {
        let rca = RCA::from(1u16);
        host::issue::<H, MmcSetRelativeAddr, R1>(host, slot, &MmcSetRelativeAddr(rca))
            .map_err(|_| Error::SetSendRca)?;
        rca
    } else {
        let r6: R6 = host::issue(host, slot, &SdSendRelativeAddr).map_err(|_| Error::SetSendRca)?;
        r6.published_rca()
    };
    debug!("rca assigned");

    // Phase 5: CSD readout, selection, lock check.
    host.set_clock(slot, ClockSpeed::DefaultSpeed);
    let csd = host::issue::<H, CMD9, _>(host, slot, &CMD9(rca))
        .map_err(|_| Error::SendCsd)?
        .0;
    let decoded = decode_csd(csd.raw(), card_type);

    let status: R1b = host::issue(host, slot, &CMD7(rca)).map_err(|_| Error::SelectCard)?;
    if status.0.CARD_IS_LOCKED() {
        return Err(Error::Locked);
    }

    // Phase 6: transfer-state tuning.
    let bus_width =
        tune_transfer_speed(host, slot, rca, card_type, decoded.spec_vers, decoded.ccc)?;

    host.set_block_len(slot, 512);

    controller.with_slot(slot, |d: &mut Device| {
        d.card_type = card_type;
        d.spec_vers = decoded.spec_vers;
        d.rca = Some(rca);
        d.ccc = decoded.ccc;
        d.cid = Some(cid);
        d.sectors = decoded.sectors;
        d.bus_width = bus_width;
    });

    Ok(controller.get_info(slot, host).expect("just initialized"))
}

/// Assembles the ACMD41/CMD1 operating-condition argument: XPC set, the 3.2-3.3V window this
/// driver negotiates, and HCS set only when [`discriminate_card_type`]'s preceding CMD8 (SEND_IF_COND)
/// succeeded.
fn acmd41_arg(hcs: bool) -> ACMD41 {
    let mut a = ACMD41::new();
    a.set_XPC(true);
    a.set_HCS(hcs);
    a.set_voltage_window(VoltageWindow::host_supported());
    a
}

/// Outcome of a single [`poll_sd_ocr`] pass, distinguishing a timeout on the very first
/// SD_SEND_OP_COND send (the card may simply be (e)MMC, which never answers an app command)
/// from every other failure, which never falls back.
enum OcrPollError {
    /// The first CMD55/ACMD41 attempt timed out; the card may be (e)MMC.
    FirstAttemptTimeout,
    Failed(Error),
}

fn discriminate_card_type<H: HostController, T: Timer>(
    host: &mut H,
    timer: &T,
    slot: Slot,
) -> Result<CardType, Error> {
    let if_cond = host::issue::<H, CMD8, _>(host, slot, &CMD8::new(SupplyVoltage::HighVoltage, 0xAA));

    // HCS is only ever requested when SEND_IF_COND itself succeeded; a CMD8 timeout means a
    // pre-2.00 SD card or an (e)MMC card, neither of which is asked for high-capacity addressing
    // here. Either way the very next command is the same SD_SEND_OP_COND poll: whether that
    // times out on its first attempt is what actually decides SD vs. (e)MMC, matching the
    // reference driver's single discrimination call after CMD8.
    let hcs = match if_cond {
        Ok(r7) => {
            if u8::from(r7.check_pattern()) != 0xAA {
                return Err(Error::IfCondResp);
            }
            true
        }
        Err(HostError::CmdTimeout) => {
            warn!("SEND_IF_COND timed out, proceeding with HCS clear");
            false
        }
        Err(_) => return Err(Error::SendIfCond),
    };

    match poll_sd_ocr(host, timer, slot, acmd41_arg(hcs)) {
        Ok(ocr) => Ok(match ocr.CCS() {
            super::card::reg::CCS::Other => CardType::Sdhc,
            super::card::reg::CCS::SDSC => CardType::Sdsc,
        }),
        Err(OcrPollError::FirstAttemptTimeout) => {
            warn!("SD_SEND_OP_COND timed out on the first attempt, falling back to (e)MMC discrimination");
            poll_mmc_ocr(host, timer, slot)?;
            Ok(CardType::Mmc)
        }
        Err(OcrPollError::Failed(e)) => Err(e),
    }
}

/// Polls ACMD41 (prefixed by CMD55 each iteration) until the card reports power-up complete,
/// re-reading a fresh OCR on every pass rather than trusting a value read before the loop.
///
/// Only a `HostError::CmdTimeout` on the very first iteration is reported as
/// [`OcrPollError::FirstAttemptTimeout`] (the card may be (e)MMC, which never answers an app
/// command); any other failure, on the first iteration or a later one, is a genuine
/// `Error::SendOpCond` with no (e)MMC fallback.
fn poll_sd_ocr<H: HostController, T: Timer>(
    host: &mut H,
    timer: &T,
    slot: Slot,
    template: ACMD41,
) -> Result<OCR, OcrPollError> {
    let rca = RCA::from(0u16);
    for attempt in 0..OCR_POLL_BUDGET {
        let cmd55 = host::issue::<H, CMD55, R1>(host, slot, &CMD55(rca));
        let result = match cmd55 {
            Ok(_) => host::issue::<H, ACMD41, R3>(host, slot, &template),
            Err(e) => Err(e),
        };

        let r3 = match result {
            Ok(r3) => r3,
            Err(HostError::CmdTimeout) if attempt == 0 => return Err(OcrPollError::FirstAttemptTimeout),
            Err(_) => return Err(OcrPollError::Failed(Error::SendOpCond)),
        };

        if r3.0.card_power_up_status() {
            if !r3.0.voltage_window()._3_2_to_3_3() {
                return Err(OcrPollError::Failed(Error::VoltSupport));
            }
            return Ok(r3.0);
        }
        timer.wait(OCR_POLL_INTERVAL);
    }
    Err(OcrPollError::Failed(Error::OpCondTmout))
}

/// Polls CMD1 until the (e)MMC card reports power-up complete.
///
/// The high-capacity access-mode bit is intentionally never examined here: like the reference
/// implementation, this driver has no Extended CSD reader, so there would be nothing to do with
/// a "this card is high-capacity" signal even if we read it. Every (e)MMC card this driver
/// initializes is treated as [`CardType::Mmc`]; see the capacity-decoding gap documented
/// alongside [`super::decode::decode_csd`].
fn poll_mmc_ocr<H: HostController, T: Timer>(
    host: &mut H,
    timer: &T,
    slot: Slot,
) -> Result<(), Error> {
    let mut template = super::command::CMD1::new();
    template.set_voltage_window(VoltageWindow::host_supported());

    for _ in 0..OCR_POLL_BUDGET {
        let r3: R3 = host::issue(host, slot, &template).map_err(|_| Error::SendOpCond)?;
        if r3.0.card_power_up_status() {
            if !r3.0.voltage_window()._3_2_to_3_3() {
                return Err(Error::VoltSupport);
            }
            return Ok(());
        }
        timer.wait(OCR_POLL_INTERVAL);
    }
    Err(Error::OpCondTmout)
}

/// `[415:400]` function-group-1 support bitmap in the 64-byte SWITCH_FUNC status block
/// (MSB-first, big-endian): byte index `63 - 400/8` carries it; bit 1 of that byte is function
/// 1 ("High Speed").
fn switch_func_reports_high_speed(status: &[u8; 64]) -> bool {
    status[63 - 400 / 8] & (1 << 1) != 0
}

fn tune_transfer_speed<H: HostController>(
    host: &mut H,
    slot: Slot,
    rca: RCA,
    card_type: CardType,
    spec_vers: u8,
    ccc: u16,
) -> Result<BusWidth, Error> {
    if card_type.is_mmc_family() {
        // Very old 1-bit-bus (e)MMCs fault on SWITCH; only attempt it from spec 4.0 onward.
        if spec_vers < 4 {
            return Ok(BusWidth::_1Bit);
        }

        host::issue::<H, MmcSwitch, _>(host, slot, &MmcSwitch::bus_width(BusWidth::_4Bit))
            .map_err(|_| Error::SetBusWidth)?;
        host.set_bus_width(slot, BusWidth::_4Bit);

        host::issue::<H, MmcSwitch, _>(host, slot, &MmcSwitch::high_speed(true))
            .map_err(|_| Error::SwitchHs)?;
        host.set_clock(slot, ClockSpeed::HighSpeed);

        Ok(BusWidth::_4Bit)
    } else {
        app_cmd::<H, SdAppSetClrCardDetect, R1>(host, slot, rca, &SdAppSetClrCardDetect { connect: false })
            .map_err(|_| Error::SetClrCd)?;

        app_cmd::<H, SdAppSetBusWidth, R1>(host, slot, rca, &SdAppSetBusWidth::new(BusWidth::_4Bit))
            .map_err(|_| Error::SetBusWidth)?;
        host.set_bus_width(slot, BusWidth::_4Bit);

        const CLASS_10_SWITCH: u16 = 1 << 10;
        if ccc & CLASS_10_SWITCH != 0 {
            host.set_block_len(slot, 64);
            let mut status = [0u8; 64];
            host.set_buffer(slot, &mut status);
            host::issue::<H, SdSwitchFunc, R1>(
                host,
                slot,
                &SdSwitchFunc(SdSwitchFuncArg::switch_to_high_speed()),
            )
            .map_err(|_| Error::SwitchHs)?;
            host.set_block_len(slot, 512);

            if switch_func_reports_high_speed(&status) {
                host.set_clock(slot, ClockSpeed::HighSpeed);
            }
        }

        Ok(BusWidth::_4Bit)
    }
}

fn app_cmd<H: HostController, C: super::command::Command<RESPONSE = R>, R: super::response::Response>(
    host: &mut H,
    slot: Slot,
    rca: RCA,
    cmd: &C,
) -> Result<R, HostError> {
    host::issue::<H, CMD55, R1>(host, slot, &CMD55(rca))?;
    host::issue(host, slot, cmd)
}
