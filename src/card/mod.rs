//! Card specific concepts and types

pub mod reg;

/// Card type, discriminated during the ready negotiation of the init state machine.
///
/// [`CardType::is_mmc_family`] and [`CardType::is_block_addressed`] classify by matching
/// on these variants directly rather than leaning on discriminant order at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    /// No card: the slot has not been (or is no longer) initialized.
    None,
    /// (e)MMC, standard capacity.
    Mmc,
    /// (e)MMC, high capacity (> 2 GiB). Capacity is still decoded via the legacy CSD
    /// formula since Extended CSD parsing is out of scope.
    MmcHc,
    /// SD, standard capacity.
    Sdsc,
    /// SD, high or extended capacity.
    Sdhc,
    /// SD, ultra capacity.
    Sduc,
}
impl CardType {
    /// True for the (e)MMC family, used to pick RCA assignment and transfer-tuning
    /// behavior.
    pub fn is_mmc_family(&self) -> bool {
        matches!(self, CardType::Mmc | CardType::MmcHc)
    }

    /// True for cards addressed by block index rather than byte offset: SDHC/SDUC and
    /// high-capacity (e)MMC.
    pub fn is_block_addressed(&self) -> bool {
        matches!(self, CardType::MmcHc | CardType::Sdhc | CardType::Sduc)
    }
}

/// Card State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Inactive,
    Idle,
    Ready,
    Identification,
    StandBy,
    Transfer,
    SendingData,
    ReceiveData,
    Programming,
    Disconnect,
}
