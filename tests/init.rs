//! End-to-end exercises of the card identification state machine against a scripted host
//! controller, covering the SD v2 (SDHC), SD v1 (SDSC), and (e)MMC discrimination branches,
//! the locked-card and OCR-timeout failure paths, and the already-initialized guard.

mod support;

use sdmmc::command::{
    ACMD41, CMD1, MmcSwitch, SdAppSetBusWidth, SdAppSetClrCardDetect, SdSwitchFunc,
    SdSwitchFuncArg,
};
use sdmmc::common::VoltageWindow;
use sdmmc::{BusWidth, CardType, ClockSpeed, Controller, Error, HostError, RCA, Slot};

use support::{arg, csd_with, r2_words, r32, r6_word, FakeTimer, MockHost, Step};

const CMD8_ARG: u32 = 0x1AA;

fn cmd8_response() -> [u32; 4] {
    r32(0x1AA)
}

fn sd_ocr_acmd41(hcs: bool) -> ACMD41 {
    let mut a = ACMD41::new();
    a.set_XPC(true);
    a.set_HCS(hcs);
    a.set_voltage_window(VoltageWindow::host_supported());
    a
}

fn mmc_cmd1() -> CMD1 {
    let mut c = CMD1::new();
    c.set_voltage_window(VoltageWindow::host_supported());
    c
}

#[test]
fn s1_sdhc_card_initializes_and_tunes_high_speed() {
    support::init_logging();
    let controller = Controller::new();
    let timer = FakeTimer::new();

    let rca = RCA::from(0x1234u16);
    let csd = csd_with(&[(126, 2, 1), (84, 12, 0x400), (48, 22, 7737)]);
    let cid_raw: u128 = 0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10;

    let acmd41 = sd_ocr_acmd41(true);
    let clr_cd = SdAppSetClrCardDetect { connect: false };
    let bus_width_cmd = SdAppSetBusWidth::new(BusWidth::_4Bit);
    let switch_hs = SdSwitchFunc(SdSwitchFuncArg::switch_to_high_speed());

    let mut status = [0u8; 64];
    status[63 - 400 / 8] = 0b10; // function group 1 (High Speed) supported

    let steps = vec![
        Step::ok(0, r32(0)),                                   // CMD0
        Step::ok_arg(8, CMD8_ARG, cmd8_response()),            // CMD8
        Step::ok_arg(55, 0, r32(0)),                           // CMD55 (rca=0, OCR poll)
        Step::ok_arg(41, arg(&acmd41), r32(0xC0FF8000)),       // ACMD41: SDHC, power-up complete
        Step::ok(2, r2_words(cid_raw)),                        // CMD2 ALL_SEND_CID
        Step::ok(3, r6_word(u16::from(rca), 0)),               // CMD3 SD_SEND_RELATIVE_ADDR
        Step::ok_arg(9, rca.shifted(), r2_words(csd)),         // CMD9 SEND_CSD
        Step::ok_arg(7, rca.shifted(), r32(0)),                // CMD7 SELECT_CARD, not locked
        Step::ok_arg(55, rca.shifted(), r32(0)),               // CMD55 before ACMD42
        Step::ok_arg(42, arg(&clr_cd), r32(0)),                // ACMD42
        Step::ok_arg(55, rca.shifted(), r32(0)),               // CMD55 before ACMD6
        Step::ok_arg(6, arg(&bus_width_cmd), r32(0)),          // ACMD6 SET_BUS_WIDTH
        Step::ok_with_data(6, arg(&switch_hs), r32(0), status.to_vec()), // CMD6 SWITCH_FUNC
    ];
    let mut host = MockHost::new(steps);

    let info = sdmmc::init(&controller, &mut host, &timer, Slot::Card).expect("init succeeds");

    assert_eq!(info.card_type, CardType::Sdhc);
    assert_eq!(info.sectors, 7_938_048);
    assert_eq!(info.rca, rca);
    assert_eq!(info.cid.raw(), cid_raw);
    assert_eq!(info.bus_width, BusWidth::_4Bit);
    assert!(info.ccc & 0x400 != 0);
    assert!(host.clock_log.contains(&(Slot::Card, ClockSpeed::HighSpeed)));
    assert!(host.exhausted(), "driver issued fewer commands than scripted");
}

#[test]
fn s2_sdsc_card_falls_back_to_legacy_discrimination() {
    support::init_logging();
    let controller = Controller::new();
    let timer = FakeTimer::new();

    let rca = RCA::from(0x5678u16);
    // Legacy CSD: READ_BL_LEN=9 (512B), C_SIZE=0x3FF, C_SIZE_MULT=7, no class-10 switch bit.
    let csd = csd_with(&[(126, 2, 0), (80, 4, 9), (62, 12, 0x3FF), (47, 3, 7)]);
    let cid_raw: u128 = 0xDEAD_BEEF_0000_0001_0000_0000_0000_0001;

    let legacy_acmd41 = sd_ocr_acmd41(false);
    let clr_cd = SdAppSetClrCardDetect { connect: false };
    let bus_width_cmd = SdAppSetBusWidth::new(BusWidth::_4Bit);

    let steps = vec![
        Step::ok(0, r32(0)),                                // CMD0
        Step::err(8, CMD8_ARG, HostError::CmdTimeout),      // CMD8 times out: pre-2.00 card
        Step::ok_arg(55, 0, r32(0)),                        // CMD55 (legacy OCR poll)
        Step::ok_arg(41, arg(&legacy_acmd41), r32(0x80FF8000)), // ACMD41: power-up complete
        Step::ok(2, r2_words(cid_raw)),                     // CMD2 ALL_SEND_CID
        Step::ok(3, r6_word(u16::from(rca), 0)),            // CMD3 SD_SEND_RELATIVE_ADDR
        Step::ok_arg(9, rca.shifted(), r2_words(csd)),      // CMD9 SEND_CSD
        Step::ok_arg(7, rca.shifted(), r32(0)),             // CMD7 SELECT_CARD, not locked
        Step::ok_arg(55, rca.shifted(), r32(0)),            // CMD55 before ACMD42
        Step::ok_arg(42, arg(&clr_cd), r32(0)),             // ACMD42
        Step::ok_arg(55, rca.shifted(), r32(0)),            // CMD55 before ACMD6
        Step::ok_arg(6, arg(&bus_width_cmd), r32(0)),       // ACMD6 SET_BUS_WIDTH
        // No class-10 bit in CCC: SWITCH_FUNC is never issued.
    ];
    let mut host = MockHost::new(steps);

    let info = sdmmc::init(&controller, &mut host, &timer, Slot::Card).expect("init succeeds");

    assert_eq!(info.card_type, CardType::Sdsc);
    assert!(!info.card_type.is_block_addressed());
    assert_eq!(info.sectors, ((0x3FFu64 + 1) * (1 << 9) * 512) / 512);
    assert!(!host.clock_log.contains(&(Slot::Card, ClockSpeed::HighSpeed)));
    assert!(host.exhausted());
}

#[test]
fn s3_mmc_card_falls_back_past_sd_discrimination_and_switches() {
    support::init_logging();
    let controller = Controller::new();
    let timer = FakeTimer::new();

    let rca = RCA::from(1u16);
    // (e)MMC CSD, spec_vers=4 to exercise the SWITCH path.
    let csd = csd_with(&[(126, 2, 0), (122, 4, 4), (80, 4, 9), (62, 12, 0x3FF), (47, 3, 7)]);
    let cid_raw: u128 = 0x1111_2222_3333_4444_5555_6666_7777_8888;

    let legacy_acmd41 = sd_ocr_acmd41(false);
    let cmd1 = mmc_cmd1();
    let sw_bus_width = MmcSwitch::bus_width(BusWidth::_4Bit);
    let sw_hs = MmcSwitch::high_speed(true);

    let steps = vec![
        Step::ok(0, r32(0)),                                  // CMD0
        Step::err(8, CMD8_ARG, HostError::CmdTimeout),        // CMD8 times out
        Step::ok_arg(55, 0, r32(0)),                          // CMD55
        Step::err(41, arg(&legacy_acmd41), HostError::CmdTimeout), // ACMD41 unsupported by MMC
        Step::ok_arg(1, arg(&cmd1), r32(0x80FF8080)),         // CMD1: power-up complete
        Step::ok(2, r2_words(cid_raw)),                       // CMD2 ALL_SEND_CID
        Step::ok_arg(3, rca.shifted(), r32(0)),               // CMD3 MMC_SET_RELATIVE_ADDR
        Step::ok_arg(9, rca.shifted(), r2_words(csd)),        // CMD9 SEND_CSD
        Step::ok_arg(7, rca.shifted(), r32(0)),               // CMD7 SELECT_CARD, not locked
        Step::ok_arg(6, arg(&sw_bus_width), r32(0)),          // CMD6 SWITCH bus width
        Step::ok_arg(6, arg(&sw_hs), r32(0)),                 // CMD6 SWITCH high speed
    ];
    let mut host = MockHost::new(steps);

    let info = sdmmc::init(&controller, &mut host, &timer, Slot::Card).expect("init succeeds");

    assert_eq!(info.card_type, CardType::Mmc);
    assert_eq!(info.rca, rca);
    assert_eq!(info.bus_width, BusWidth::_4Bit);
    assert!(host.clock_log.contains(&(Slot::Card, ClockSpeed::HighSpeed)));
    assert!(host.exhausted());
}

#[test]
fn s4_ocr_poll_exhausts_its_budget() {
    support::init_logging();
    let controller = Controller::new();
    let timer = FakeTimer::new();

    let acmd41 = sd_ocr_acmd41(true);
    let mut steps = vec![Step::ok(0, r32(0)), Step::ok_arg(8, CMD8_ARG, cmd8_response())];
    for _ in 0..200 {
        steps.push(Step::ok_arg(55, 0, r32(0)));
        // card_power_up_status (bit 31) never set: card is permanently busy.
        steps.push(Step::ok_arg(41, arg(&acmd41), r32(0)));
    }
    let mut host = MockHost::new(steps);

    let result = sdmmc::init(&controller, &mut host, &timer, Slot::Card);

    assert_eq!(result.unwrap_err(), Error::OpCondTmout);
    assert_eq!(timer.waits.get(), 200);
    assert!(host.exhausted());
}

#[test]
fn s5_locked_card_is_rejected_after_select() {
    support::init_logging();
    let controller = Controller::new();
    let timer = FakeTimer::new();

    let rca = RCA::from(0x9ABCu16);
    let csd = csd_with(&[(126, 2, 1), (48, 22, 1000)]);
    let cid_raw: u128 = 0xAAAA_BBBB_CCCC_DDDD_EEEE_FFFF_0000_1111;
    let acmd41 = sd_ocr_acmd41(true);

    const CARD_IS_LOCKED: u32 = 1 << 25;

    let steps = vec![
        Step::ok(0, r32(0)),
        Step::ok_arg(8, CMD8_ARG, cmd8_response()),
        Step::ok_arg(55, 0, r32(0)),
        Step::ok_arg(41, arg(&acmd41), r32(0xC0FF8000)),
        Step::ok(2, r2_words(cid_raw)),
        Step::ok(3, r6_word(u16::from(rca), 0)),
        Step::ok_arg(9, rca.shifted(), r2_words(csd)),
        Step::ok_arg(7, rca.shifted(), r32(CARD_IS_LOCKED)),
    ];
    let mut host = MockHost::new(steps);

    let result = sdmmc::init(&controller, &mut host, &timer, Slot::Card);

    assert_eq!(result.unwrap_err(), Error::Locked);
    assert!(host.exhausted(), "driver must not tune transfer speed on a locked card");
}

#[test]
fn init_on_already_initialized_slot_issues_no_commands() {
    support::init_logging();
    let controller = Controller::new();
    let timer = FakeTimer::new();

    let rca = RCA::from(0x1234u16);
    let csd = csd_with(&[(126, 2, 1), (48, 22, 7737)]);
    let cid_raw: u128 = 0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10;
    let acmd41 = sd_ocr_acmd41(true);
    let clr_cd = SdAppSetClrCardDetect { connect: false };
    let bus_width_cmd = SdAppSetBusWidth::new(BusWidth::_4Bit);

    let steps = vec![
        Step::ok(0, r32(0)),
        Step::ok_arg(8, CMD8_ARG, cmd8_response()),
        Step::ok_arg(55, 0, r32(0)),
        Step::ok_arg(41, arg(&acmd41), r32(0xC0FF8000)),
        Step::ok(2, r2_words(cid_raw)),
        Step::ok(3, r6_word(u16::from(rca), 0)),
        Step::ok_arg(9, rca.shifted(), r2_words(csd)),
        Step::ok_arg(7, rca.shifted(), r32(0)),
        Step::ok_arg(55, rca.shifted(), r32(0)),
        Step::ok_arg(42, arg(&clr_cd), r32(0)),
        Step::ok_arg(55, rca.shifted(), r32(0)),
        Step::ok_arg(6, arg(&bus_width_cmd), r32(0)),
    ];
    let mut host = MockHost::new(steps);
    sdmmc::init(&controller, &mut host, &timer, Slot::Card).expect("first init succeeds");
    assert!(host.exhausted());

    // Second init on the same (still-registered) slot must fail fast, with no further commands.
    let mut host2 = MockHost::new(Vec::new());
    let result = sdmmc::init(&controller, &mut host2, &timer, Slot::Card);
    assert_eq!(result.unwrap_err(), Error::Initialized);
    assert!(host2.exhausted());
}
