use crate::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PdcpError {
    #[error("PDCP PDU too short - {0} bytes")]
    TooShort(usize),

    // Control PDUs (status reports, ROHC feedback) are not supported.
    #[error("Malformed PDCP header - first byte {0:#04x} is not a data PDU")]
    MalformedHeader(u8),

    #[error("SDU of {0} bytes too long to transmit")]
    SduTooLong(usize),

    #[error("Dual connectivity enabled without a remote path")]
    MissingRemotePath,

    #[error("{0:?} path closed")]
    PathClosed(Path),
}
