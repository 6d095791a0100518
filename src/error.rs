use thiserror::Error;

/// Errors that can occur when talking to a Glitter Panel.
///
/// Transfer failures inside [`crate::GlitterPanel::display`] are absorbed
/// (the next periodic frame corrects the display); the variants here surface
/// everywhere else, where the caller can actually act on them.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying USB layer.
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),
    /// A USB transfer completed with an error status.
    #[error("USB transfer error: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),
    /// No Glitter Panel was found with the expected vendor/product ID.
    #[error("Glitter Panel not found (VID 0F30, PID 0040)")]
    DeviceNotFound,
    /// A device matched the panel's vendor/product ID but does not expose
    /// the expected interface/endpoint shape. Fatal for that device: the
    /// hardware does not match the protocol assumptions, so the connect
    /// attempt is aborted rather than retried.
    #[error(
        "device {vendor_id:04X}:{product_id:04X} has unexpected USB topology: {message}"
    )]
    Topology {
        /// Vendor ID of the offending device.
        vendor_id: u16,
        /// Product ID of the offending device.
        product_id: u16,
        /// What differed from the expected layout.
        message: String,
    },
    /// Display grid has the wrong number of pixels. The frame is never
    /// partially encoded, truncated, or padded.
    #[error("pixel grid length mismatch: expected {expected}, got {actual}")]
    GridSize {
        /// Required pixel count (always 256 for this panel).
        expected: usize,
        /// Length of the grid that was passed in.
        actual: usize,
    },
    /// A transfer did not complete within its timeout.
    #[error("timeout waiting for the device to accept a transfer")]
    Timeout,
    /// A transfer was attempted before the panel interface was claimed.
    #[error("panel interface is not claimed")]
    InterfaceNotClaimed,
    /// The write endpoint could not be resolved or opened.
    #[error("endpoint {address:#04X} unavailable: {message}")]
    EndpointUnavailable {
        /// Endpoint address from the interface descriptor.
        address: u8,
        /// Additional error details.
        message: String,
    },
}

/// Result type alias for Glitter Panel operations.
pub type Result<T> = std::result::Result<T, Error>;
