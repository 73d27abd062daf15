//! SD/MMC Commands to control the card
//!
//! All commands and responses are sent over the CMD line.

#![allow(non_snake_case)]

use bitfield::bitfield;

use super::card::reg::{CID, CSD};
use super::common::{BusWidth, SupplyVoltage, VoltageWindow, RCA};
use super::response::{NoResponse, R1b, Response, R1, R2, R3, R6, R7};
use CommandType::*;

/// Trait represents *Command* (CMD/ACMD) concept in SD/MMC specification.
pub trait Command {
    /// Command Index
    const INDEX: u8;
    /// Command Type
    const TYPE: CommandType;

    /// Corresponding Response type like [`R1`], [`R2`] for Command
    type RESPONSE: Response;

    /// Constructs command argument. Default value 0 means no argument.
    fn argument(&self) -> Argument {
        Argument(0) // No argument
    }

    fn data_present() -> bool {
        matches!(Self::TYPE, CommandType::ADTC)
    }
}

/// Command Types
///
/// There are four kinds of commands defined to control the SD Memory Card.
/// All commands and responses are sent over the CMD line of the SD Memory Card.
pub enum CommandType {
    /// Broadcast commands (bc), no response
    ///
    /// The broadcast feature is only if all the CMD lines are connected together in the host.
    /// If they are separated, then each card will accept it separately in its turn.
    BC,

    /// Broadcast commands with response (bcr), response from all cards simultaneously
    ///
    /// Since there is no Open Drain mode in SD Memory Card, this type of command shall be used
    /// only if all the CMD lines are separated - the command will be accepted and responded by
    /// every card separately.
    BCR,

    /// Addressed (point-to-point) commands (ac), no data transfer on DAT.
    AC,

    /// Addressed (point-to-point) data transfer commands (adtc), data transfer on DAT.
    ADTC,
}

/// Command Argument
#[derive(Debug, Copy, Clone)]
pub struct Argument(u32);
impl From<u32> for Argument {
    fn from(v: u32) -> Self {
        Argument(v)
    }
}
impl From<Argument> for u32 {
    fn from(v: Argument) -> Self {
        v.0
    }
}

// Standard Commands

/// CMD0 (GO_IDLE_STATE)
///
/// Resets all cards to idle state. When card supports boot functionalities and receives
/// this command as the first one in idle state after power up, the argument is regarded
/// as the bus mode in Fast Boot.
#[derive(Debug, Copy, Clone)]
pub struct CMD0;
impl Command for CMD0 {
    const INDEX: u8 = 0;
    const TYPE: CommandType = BC;
    type RESPONSE = NoResponse;
}

bitfield! {
    /// CMD1 (SEND_OP_COND, (e)MMC only)
    ///
    /// Asks the (e)MMC card, in idle state, to send its operating condition register content
    /// in the response on the CMD line. The host repeats CMD1 until the card's busy bit clears.
    #[derive(Copy, Clone)]
    pub struct CMD1(u32);

    impl Debug;

    /// Access mode: set when the host intends to address the card in sector (block) mode
    /// rather than byte mode, mirroring SDHC's HCS for the (e)MMC family.
    pub sector_mode, set_sector_mode: 30;

    /// VDD Voltage Window
    pub u32, from into VoltageWindow, voltage_window, set_voltage_window: 23, 0;
}
impl CMD1 {
    pub fn new() -> Self {
        CMD1(0)
    }
}
impl Command for CMD1 {
    const INDEX: u8 = 1;
    const TYPE: CommandType = BCR;
    type RESPONSE = R3;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

/// CMD2 (ALL_SEND_CID)
///
/// Asks any card to send the CID numbers on the CMD line (any card that is connected to the
/// host will respond)
#[derive(Debug, Copy, Clone)]
pub struct CMD2;
impl Command for CMD2 {
    const INDEX: u8 = 2;
    const TYPE: CommandType = BCR;
    type RESPONSE = R2<CID>;
}

/// CMD3 (SD_SEND_RELATIVE_ADDR)
///
/// Ask the card to publish a new relative address ([`RCA`]). Only SD cards self-assign an
/// address this way; (e)MMC cards are assigned one by the host with [`MmcSetRelativeAddr`].
#[derive(Debug, Copy, Clone)]
pub struct SdSendRelativeAddr;
impl Command for SdSendRelativeAddr {
    const INDEX: u8 = 3;
    const TYPE: CommandType = BCR;
    type RESPONSE = R6;
}

/// CMD3 (MMC_SET_RELATIVE_ADDR)
///
/// Assigns the relative address the host picked to the (e)MMC card currently in Identification
/// state.
#[derive(Debug, Copy, Clone)]
pub struct MmcSetRelativeAddr(pub RCA);
impl Command for MmcSetRelativeAddr {
    const INDEX: u8 = 3;
    const TYPE: CommandType = AC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0.shifted())
    }
}

/// CMD6 (SD SWITCH_FUNC)
///
/// Checks or switches the card's function group settings (e.g. high speed / bus speed mode).
/// Carries a data block with the 64-byte status response; this driver only ever switches
/// function group 1 (access mode) and discards the status block.
#[derive(Debug, Copy, Clone)]
pub struct SdSwitchFunc(pub SdSwitchFuncArg);
impl Command for SdSwitchFunc {
    const INDEX: u8 = 6;
    const TYPE: CommandType = ADTC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0 .0)
    }
}

bitfield! {
    /// Argument of [`SdSwitchFunc`].
    #[derive(Copy, Clone)]
    pub struct SdSwitchFuncArg(u32);

    impl Debug;

    /// Mode: 0 = check (query only), 1 = switch (apply).
    pub mode, set_mode: 31;

    // [30:24] reserved

    pub u8, function_group_6, set_function_group_6: 23, 20;
    pub u8, function_group_5, set_function_group_5: 19, 16;
    pub u8, function_group_4, set_function_group_4: 15, 12;
    pub u8, function_group_3, set_function_group_3: 11, 8;
    pub u8, function_group_2, set_function_group_2: 7, 4;

    /// Function group 1: Access Mode. `1` selects High Speed.
    pub u8, function_group_1, set_function_group_1: 3, 0;
}
impl SdSwitchFuncArg {
    pub fn switch_to_high_speed() -> Self {
        let mut a = SdSwitchFuncArg(0xffff_fff0);
        a.set_mode(true);
        a.set_function_group_1(1);
        a
    }
}

bitfield! {
    /// CMD6 ((e)MMC SWITCH)
    ///
    /// Writes a single byte field of the Extended CSD register. This driver uses it only to
    /// flip the BUS_WIDTH and HS_TIMING fields during transfer-speed tuning.
    #[derive(Copy, Clone)]
    pub struct MmcSwitch(u32);

    impl Debug;

    /// Access mode. `0b11` (Write Byte) is the only mode this driver issues.
    pub u8, access, set_access: 25, 24;

    /// Index of the Extended CSD byte to modify.
    pub u8, index, set_index: 23, 16;

    /// Value to write into that byte.
    pub u8, value, set_value: 15, 8;

    // [7:3] reserved

    /// Command set, always 0 (normal).
    pub u8, cmd_set, set_cmd_set: 2, 0;
}
impl MmcSwitch {
    const EXT_CSD_BUS_WIDTH: u8 = 183;
    const EXT_CSD_HS_TIMING: u8 = 185;

    pub fn bus_width(width: BusWidth) -> Self {
        let code = match width {
            BusWidth::_1Bit => 0,
            BusWidth::_4Bit => 1,
            BusWidth::_8Bit => 2,
        };
        Self::write_byte(Self::EXT_CSD_BUS_WIDTH, code)
    }

    pub fn high_speed(enable: bool) -> Self {
        Self::write_byte(Self::EXT_CSD_HS_TIMING, enable as u8)
    }

    fn write_byte(index: u8, value: u8) -> Self {
        let mut a = MmcSwitch(0);
        a.set_access(0b11);
        a.set_index(index);
        a.set_value(value);
        a
    }
}
impl Command for MmcSwitch {
    const INDEX: u8 = 6;
    const TYPE: CommandType = AC;
    type RESPONSE = R1b;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

/// CMD7 (SELECT/DESELECT_CARD)
///
/// Command toggles a card between the stand-by and transfer states or between the programming
/// and disconnect states. In both cases, the card is selected by its own relative address and
/// gets deselected by any other address; address 0 deselects all.
///
/// In the case that the RCA equals 0, then the host may do one of the following:
/// - Use other RCA number to perform card de-selection.
/// - Re-send CMD3 to change its RCA number to other than 0 and then use CMD7 with RCA=0 for
///   card de-selection.
#[derive(Debug, Copy, Clone)]
pub struct CMD7(pub RCA);
impl Command for CMD7 {
    const INDEX: u8 = 7;
    const TYPE: CommandType = AC;
    type RESPONSE = R1b;

    fn argument(&self) -> Argument {
        Argument(self.0.shifted())
    }
}

bitfield! {
    /// CMD8 (SEND_IF_COND)
    ///
    /// Sends SD Memory Card interface condition, which includes host supply voltage information and
    /// asks the card whether card supports voltage. Reserved bits shall be set to '0'.
    #[derive(Copy, Clone)]
    pub struct CMD8(u32);

    impl Debug;

    /// Host asks whether card supports VDD3 (1.2V power rail)
    ///
    /// - 0b: Not asking 1.2V support
    /// - 1b: Asking 1.2V support (VDD3 is supported by host. VDD3 shall be used if card supports it, too.)
    pub pcie_1_2v_support, set_pcie1_2v_support: 13;

    /// Host asks card's PCIe availability
    ///
    /// - 0b: Not asking PCIe availability
    /// - 1b: Asking PCIe availability (PCIe interface is supported by host. PCIe interface shall be used if card
    /// supports it, too.)
    pub pcie_availability, set_pcie_availability: 12;

    /// Host Supplied Voltage (VHS)
    pub u8, from into SupplyVoltage, VHS, set_VHS: 11, 8;

    /// Check pattern, echoed back unchanged by a compliant card in the R7 response.
    pub u8, check_pattern, set_check_pattern: 7, 0;
}
impl CMD8 {
    pub fn new(voltage: SupplyVoltage, check_pattern: u8) -> Self {
        let mut c = CMD8(0);
        c.set_VHS(voltage);
        c.set_check_pattern(check_pattern);
        c
    }
}
impl Command for CMD8 {
    const INDEX: u8 = 8;
    const TYPE: CommandType = BCR;
    type RESPONSE = R7;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

/// CMD9 (SEND_CSD)
///
/// Addressed card sends its card-specific data (CSD) on the CMD line.
#[derive(Debug, Copy, Clone)]
pub struct CMD9(pub RCA);
impl Command for CMD9 {
    const INDEX: u8 = 9;
    const TYPE: CommandType = AC;
    type RESPONSE = R2<CSD>;

    fn argument(&self) -> Argument {
        Argument(self.0.shifted())
    }
}

/// CMD55 (APP CMD)
///
/// Indicates to the card that the next command is an application specific command rather than a
/// standard command.
#[derive(Debug, Copy, Clone)]
pub struct CMD55(pub RCA);
impl Command for CMD55 {
    const INDEX: u8 = 55;
    const TYPE: CommandType = AC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0.shifted())
    }
}

/// CMD12 (STOP_TRANSMISSION)
///
/// Forces the card to stop transmission during a multiple block read, or to stop
/// programming during a multiple block write.
#[derive(Debug, Copy, Clone)]
pub struct CMD12;
impl Command for CMD12 {
    const INDEX: u8 = 12;
    const TYPE: CommandType = AC;
    type RESPONSE = R1b;
}

/// CMD17 (READ_SINGLE_BLOCK)
///
/// Reads a block of the size selected by `SET_BLOCKLEN`.
#[derive(Debug, Copy, Clone)]
pub struct CMD17(pub u32);
impl Command for CMD17 {
    const INDEX: u8 = 17;
    const TYPE: CommandType = ADTC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

/// CMD18 (READ_MULTIPLE_BLOCK)
///
/// Continuously transfers blocks from card to host until interrupted by [`CMD12`].
#[derive(Debug, Copy, Clone)]
pub struct CMD18(pub u32);
impl Command for CMD18 {
    const INDEX: u8 = 18;
    const TYPE: CommandType = ADTC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

/// CMD24 (WRITE_BLOCK)
///
/// Writes a block of the size selected by `SET_BLOCKLEN`.
#[derive(Debug, Copy, Clone)]
pub struct CMD24(pub u32);
impl Command for CMD24 {
    const INDEX: u8 = 24;
    const TYPE: CommandType = ADTC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

/// CMD25 (WRITE_MULTIPLE_BLOCK)
///
/// Continuously writes blocks from host to card until interrupted by [`CMD12`].
#[derive(Debug, Copy, Clone)]
pub struct CMD25(pub u32);
impl Command for CMD25 {
    const INDEX: u8 = 25;
    const TYPE: CommandType = ADTC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}

// Application-specific Commands

bitfield! {
    /// ACMD6 (SET_BUS_WIDTH, SD only)
    ///
    /// Defines the data bus width (`00` = 1 bit, `10` = 4 bit) to be used for data transfer.
    #[derive(Copy, Clone)]
    pub struct SdAppSetBusWidthArg(u32);

    impl Debug;

    pub u8, bus_width, set_bus_width: 1, 0;
}
#[derive(Debug, Copy, Clone)]
pub struct SdAppSetBusWidth(pub SdAppSetBusWidthArg);
impl SdAppSetBusWidth {
    pub fn new(width: BusWidth) -> Self {
        let code = match width {
            BusWidth::_1Bit => 0b00,
            BusWidth::_4Bit => 0b10,
            BusWidth::_8Bit => unreachable!("SD cards never use 8-bit bus"),
        };
        let mut a = SdAppSetBusWidthArg(0);
        a.set_bus_width(code);
        SdAppSetBusWidth(a)
    }
}
impl Command for SdAppSetBusWidth {
    const INDEX: u8 = 6;
    const TYPE: CommandType = AC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.0 .0)
    }
}

/// ACMD42 (SET_CLR_CARD_DETECT, SD only)
///
/// Connects or disconnects the 50 kOhm pull-up resistor on the card detect/DAT3 pin.
#[derive(Debug, Copy, Clone)]
pub struct SdAppSetClrCardDetect {
    pub connect: bool,
}
impl Command for SdAppSetClrCardDetect {
    const INDEX: u8 = 42;
    const TYPE: CommandType = AC;
    type RESPONSE = R1;

    fn argument(&self) -> Argument {
        Argument(self.connect as u32)
    }
}

bitfield! {
    /// ACMD41 (SD_SEND_OP_COND)
    ///
    /// - Sends host capacity support information (HCS) and asks the accessed card to send its operating
    ///   condition register ([`OCR`](super::card::reg::OCR)) content in the response on the CMD line.
    /// - HCS is effective when card receives SEND_IF_COND command.
    /// - Sends request to switch to 1.8V signaling (S18R).
    /// - Reserved bit shall be set to '0'.
    /// - CCS bit is assigned to [`OCR`](super::card::reg::OCR)[30].
    /// - XPC controls the maximum current in the default speed mode of SDXC card:
    ///   - XPC=0 means 100mA (max.) but speed class is not supported
    ///   - XPC=1 means 150mA (max.) and speed class is supported.
    #[derive(Copy, Clone)]
    pub struct ACMD41(u32);

    impl Debug;

    /// Host Capacity Support ([`OCR`](super::card::reg::OCR)[30])
    ///
    /// - 0b: SDSC Only Host
    /// - 1b: SDHC or SDXC Supported
    pub HCS, set_HCS: 30;

    /// SDXC Power Control
    ///
    /// - 0b: Power Saving
    /// - 1b: Maximum Performance
    pub XPC, set_XPC: 28;

    /// S18R : Switching to 1.8V Request
    ///
    /// - 0b: Use current signal voltage
    /// - 1b: Switch to 1.8V signal voltage
    pub S18R, set_S18R: 24;

    /// VDD Voltage Window ([`OCR`](super::card::reg::OCR)[23:8])
    pub u32, from into VoltageWindow, voltage_window, set_voltage_window: 23, 8;
}
impl ACMD41 {
    pub fn new() -> Self {
        ACMD41(0)
    }
}
impl Command for ACMD41 {
    const INDEX: u8 = 41;
    const TYPE: CommandType = BCR;
    type RESPONSE = R3;

    fn argument(&self) -> Argument {
        Argument(self.0)
    }
}
