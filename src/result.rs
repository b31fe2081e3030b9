use core::fmt::Debug;

/// Error type
#[derive(Debug, PartialEq)]
pub enum Error<E: Sized + Debug> {
    /// Wire not high
    WireFault,
    /// No presence on wire
    NoPresence,
    /// Address CRC mismatch (computed, received)
    AddressCorrupt(u8, u8),
    /// Scratchpad CRC mismatch (computed, received)
    FrameCorrupt(u8, u8),
    FamilyCodeMismatch(u8, u8),
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}
