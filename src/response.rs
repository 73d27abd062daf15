//! Responses
//!
//! All responses are sent via the command line CMD.
//!
//! There are five types of responses for the SD Memory Card. The SDIO Card supports additional response
//! types named R4 and R5.

#![allow(non_snake_case)]
#![allow(non_camel_case_types)]

use core::fmt::Debug;

use bitfield::bitfield;

use super::card::reg::{CurrentState, CID, CSD, CSR, OCR};
use super::common::{CheckPattern, SupplyVoltage, RCA};
use super::host::ResponseType;
use ResponseType::*;

/// Raw response words as handed back by [`HostController::response`](super::host::HostController::response),
/// MSB-first: `words[0]` holds bits `[127:96]` of the 128-bit response field, `words[3]` holds
/// bits `[31:0]`. For 48-bit responses only `words[3]` carries meaningful content.
pub type RawResponse = [u32; 4];

fn composite(r: RawResponse) -> u128 {
    ((r[0] as u128) << 96) | ((r[1] as u128) << 64) | ((r[2] as u128) << 32) | (r[3] as u128)
}

/// Bits `[31:0]`, used by R1/R1b/R3/R6/R7.
fn bit_31_0(r: RawResponse) -> u32 {
    r[3]
}

/// Bits `[127:0]`, used by R2 (CID/CSD content).
///
/// The long-response frame is 136 bits (start + transmission + 6 reserved bits, 127 bits of
/// register content, 1 end bit); the host controller strips the leading 8 framing bits and the
/// trailing end bit before exposing [`RawResponse`], so the composed value already lines up with
/// the register's own bit numbering (register bit 127 at composite bit 127 down to register bit
/// 1 at composite bit 1; composite bit 0 is unused padding, matching the register's own unused,
/// fixed bit 0).
fn bit_127_0(r: RawResponse) -> u128 {
    composite(r)
}

/// Trait represents *Response* concept in SD specification
pub trait Response {
    const TYPE: ResponseType;
    const COMMAND_INDEX_CHECK: bool;
    const COMMAND_CRC_CHECK: bool;

    /// Decode the response from the raw words the host controller captured.
    fn read(_: RawResponse) -> Self;
}

/// A special response type means actually no response
#[derive(Debug, Copy, Clone)]
pub struct NoResponse;
impl Response for NoResponse {
    const TYPE: ResponseType = ResponseType::NoResponse;
    const COMMAND_INDEX_CHECK: bool = false;
    const COMMAND_CRC_CHECK: bool = false;

    fn read(_: RawResponse) -> Self {
        NoResponse
    }
}

/// R1 (normal response command): 48 bits
#[derive(Debug, Copy, Clone)]
pub struct R1(pub CSR);
impl Response for R1 {
    const TYPE: ResponseType = _48Bits;
    const COMMAND_INDEX_CHECK: bool = true;
    const COMMAND_CRC_CHECK: bool = true;

    /// R1, R1b (normal response) bit range: [31:0]
    fn read(r: RawResponse) -> Self {
        R1(CSR(bit_31_0(r)))
    }
}

/// R1b is identical to R1 with an optional busy signal transmitted on the data line
#[derive(Debug, Copy, Clone)]
pub struct R1b(pub CSR);
impl Response for R1b {
    const TYPE: ResponseType = _48BitsBusy;
    const COMMAND_INDEX_CHECK: bool = true;
    const COMMAND_CRC_CHECK: bool = true;

    /// R1, R1b (normal response) bit range: [31:0]
    fn read(r: RawResponse) -> Self {
        R1b(CSR(bit_31_0(r)))
    }
}

/// R2 (CID, CSD register): 136 bits
#[derive(Debug, Copy, Clone)]
pub struct R2<I: R2Inner>(pub I);
impl Response for R2<CID> {
    const TYPE: ResponseType = _136Bits;
    const COMMAND_INDEX_CHECK: bool = false;
    const COMMAND_CRC_CHECK: bool = true;

    /// R2 (CID register) bit range [127:0]
    fn read(r: RawResponse) -> Self {
        R2(CID(bit_127_0(r)))
    }
}
impl Response for R2<CSD> {
    const TYPE: ResponseType = _136Bits;
    const COMMAND_INDEX_CHECK: bool = false;
    const COMMAND_CRC_CHECK: bool = true;

    /// R2 (CSD register) bit range [127:0]
    fn read(r: RawResponse) -> Self {
        R2(CSD::from(bit_127_0(r)))
    }
}

/// Contraint content type of R2: CID or CSD
pub trait R2Inner {}
impl R2Inner for CID {}
impl R2Inner for CSD {}

/// R3 (OCR register): 48 bits
#[derive(Debug, Copy, Clone)]
pub struct R3(pub OCR);
impl Response for R3 {
    const TYPE: ResponseType = _48Bits;
    const COMMAND_INDEX_CHECK: bool = false;
    const COMMAND_CRC_CHECK: bool = false;

    /// R3 (OCR register) bit range [31:0]
    fn read(r: RawResponse) -> Self {
        R3(OCR(bit_31_0(r)))
    }
}

// R4, R5 (SDIO) are out of scope.

bitfield! {
    /// R6 (Published RCA response): 32 bits (48 bits [39:8])
    #[derive(Copy, Clone)]
    pub struct R6(u32);

    impl Debug;

    pub u16, from into RCA, published_rca, _: 31, 16;

    // [15:0] card status bits: 23, 22, 19, [12:0]:

    /// CardStatus[23] The CRC check of the previous command failed.
    pub COM_CRC_ERROR, _: 15;

    /// CardStatus[22] Command not legal for the card state.
    pub ILLEGAL_COMMAND, _: 14;

    /// CardStatus[19] A general or an unknown error occurred during the operation.
    pub ERROR, _: 13;

    /// CardStatus[12:9]
    pub u8, into CurrentState, CURRENT_STATE, _: 12, 9;

    // [8:0] not used?
}
impl Response for R6 {
    const TYPE: ResponseType = _48Bits;
    const COMMAND_INDEX_CHECK: bool = true;
    const COMMAND_CRC_CHECK: bool = true;

    /// R6 (Published RCA response) bit range [31:0]
    fn read(r: RawResponse) -> Self {
        R6(bit_31_0(r))
    }
}

bitfield! {
    /// R7 (Card interface condition): 32 bits (48 bits [39:8])
    #[derive(Copy, Clone)]
    pub struct R7(u32);

    impl Debug;

    // [31:14] reserved

    /// Card responds whether it supports VDD3 (1.2V power rail)
    ///
    /// - 0b: Not supporting 1.2V
    /// - 1b: Supporting 1.2V
    pub pcie_1_2v_support, _: 13;

    /// Card responds PCIe acceptance
    ///
    /// - 0b: Not accepted
    /// - 1b: Accepted
    pub pcie_accepted, _: 12;

    /// Card Accepted Voltage (VCA)
    pub u8, into SupplyVoltage, VCA, _ : 11, 8;

    /// Echo-back of check pattern
    pub u8, into CheckPattern, check_pattern, _: 7, 0;
}
impl Response for R7 {
    const TYPE: ResponseType = _48Bits;
    const COMMAND_INDEX_CHECK: bool = true;
    const COMMAND_CRC_CHECK: bool = true;

    /// R7 bit range [31:0]
    fn read(r: RawResponse) -> Self {
        R7(bit_31_0(r))
    }
}
