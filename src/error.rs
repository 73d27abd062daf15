//! Closed error taxonomy returned from every driver operation.

use core::fmt;

/// Every outcome the driver can report.
///
/// There is deliberately no `None`/success variant here: success is `Ok(())`
/// (or `Ok(value)`), keeping a single return-code space from having to
/// double up `0` as both "no error" and a valid code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A parameter (slot index, sector count) was out of range.
    InvalParam,
    /// `init` was called on a slot that already holds a card.
    Initialized,
    /// A sector I/O operation was attempted on a slot with no card.
    NoCard,
    /// A write was attempted while the card slot's write-protect slider reports locked.
    WriteProt,
    /// GO_IDLE_STATE (CMD0) failed.
    GoIdleState,
    /// SEND_IF_COND (CMD8) succeeded but echoed a different argument than sent.
    IfCondResp,
    /// SEND_IF_COND (CMD8) failed for a reason other than command timeout.
    SendIfCond,
    /// SD_SEND_OP_COND (ACMD41) or SEND_OP_COND (CMD1) failed for a reason other than timeout.
    SendOpCond,
    /// The OCR polling loop exhausted its 1 second budget without the busy bit clearing.
    OpCondTmout,
    /// The card's OCR does not advertise support for the host's supply voltage.
    VoltSupport,
    /// ALL_SEND_CID (CMD2) failed.
    AllSendCid,
    /// SET_RELATIVE_ADDR / SEND_RELATIVE_ADDR (CMD3) failed.
    SetSendRca,
    /// SEND_CSD (CMD9) failed.
    SendCsd,
    /// SELECT_CARD (CMD7) failed.
    SelectCard,
    /// The card reported `CARD_IS_LOCKED` in its R1 status after SELECT_CARD.
    Locked,
    /// SET_CLR_CARD_DETECT (ACMD42) failed.
    SetClrCd,
    /// SET_BUS_WIDTH (ACMD6) or the MMC SWITCH bus-width command failed.
    SetBusWidth,
    /// The high-speed SWITCH / SWITCH_FUNC command failed.
    SwitchHs,
    /// SET_BLOCKLEN failed (unused by the current init sequence, kept for the closed set).
    SetBlocklen,
    /// A READ_*/WRITE_* command reported a transfer error.
    SectRw,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalParam => "invalid parameter",
            Error::Initialized => "slot already initialized",
            Error::NoCard => "no card present in slot",
            Error::WriteProt => "card is write-protected",
            Error::GoIdleState => "GO_IDLE_STATE failed",
            Error::IfCondResp => "SEND_IF_COND response did not echo the argument",
            Error::SendIfCond => "SEND_IF_COND failed",
            Error::SendOpCond => "SEND_OP_COND failed",
            Error::OpCondTmout => "operating condition polling timed out",
            Error::VoltSupport => "card does not support the host's supply voltage",
            Error::AllSendCid => "ALL_SEND_CID failed",
            Error::SetSendRca => "SET_RELATIVE_ADDR/SEND_RELATIVE_ADDR failed",
            Error::SendCsd => "SEND_CSD failed",
            Error::SelectCard => "SELECT_CARD failed",
            Error::Locked => "card is locked",
            Error::SetClrCd => "SET_CLR_CARD_DETECT failed",
            Error::SetBusWidth => "bus width switch failed",
            Error::SwitchHs => "high-speed switch failed",
            Error::SetBlocklen => "SET_BLOCKLEN failed",
            Error::SectRw => "sector read/write failed",
        };
        f.write_str(msg)
    }
}

/// Error reported by [`HostController::send_command`](crate::host::HostController::send_command).
///
/// Kept distinct from [`Error`] because most host errors collapse into a
/// single driver error per call site (the phase that issued the command
/// decides which [`Error`] variant a given [`HostError`] becomes), except for
/// the two places in the init state machine where a command timeout is an
/// *expected* outcome rather than a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// The card never responded (expected in two places during init).
    CmdTimeout,
    /// The controller reported a CRC or protocol error.
    CrcOrProtocol,
    /// Any other host-controller-specific failure.
    Other,
}
