//! Device identification and the host USB capability seam.
//!
//! The state machine behind [`crate::GlitterPanel`] never talks to a USB
//! stack directly; it goes through the [`UsbHost`] / [`UsbConnection`]
//! traits so it can run against the real backend in [`crate::native`], a
//! test fake, or an embedder with its own permission plumbing.

use std::time::Duration;

use crate::consts;
use crate::error::{Error, Result};

/// Opaque, stable identity of one attached USB device.
///
/// Hosts hand out whatever token lets them recognize the same physical
/// device again; the core only compares ids, e.g. to match a detach event
/// against the connection it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    pub const fn new(raw: u64) -> Self {
        DeviceId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Read-only snapshot of a discovered device, supplied by the host USB
/// subsystem at enumeration time.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Number of interfaces in the active configuration.
    pub interface_count: u8,
    /// Endpoint count per interface, in interface order. Hosts that cannot
    /// read endpoint descriptors before the device is opened (desktop Linux
    /// without a udev rule) leave this empty; the endpoint shape is checked
    /// again when the interface is claimed.
    pub endpoint_counts: Vec<u8>,
    pub product_string: Option<String>,
}

/// Returns true iff the descriptor identifies a Glitter Panel.
pub fn is_glitter_panel(descriptor: &DeviceDescriptor) -> bool {
    descriptor.vendor_id == consts::TAKARATOMY_VID
        && descriptor.product_id == consts::GLITTER_PANEL_PID
}

/// Checks that a matched device exposes the interface/endpoint shape the
/// frame protocol assumes: one interface with exactly two endpoints.
///
/// Failure means the hardware does not speak this protocol; the error is
/// fatal for that device and a connect attempt must not be retried against
/// it. Unknown endpoint counts (see [`DeviceDescriptor::endpoint_counts`])
/// pass here and are verified at claim time instead.
pub fn validate_topology(descriptor: &DeviceDescriptor) -> Result<()> {
    if descriptor.interface_count != consts::REQUIRED_INTERFACE_COUNT {
        return Err(Error::Topology {
            vendor_id: descriptor.vendor_id,
            product_id: descriptor.product_id,
            message: format!(
                "expected {} interface(s), found {}",
                consts::REQUIRED_INTERFACE_COUNT,
                descriptor.interface_count
            ),
        });
    }
    if let Some(&endpoints) = descriptor.endpoint_counts.first() {
        if endpoints != consts::REQUIRED_ENDPOINT_COUNT {
            return Err(Error::Topology {
                vendor_id: descriptor.vendor_id,
                product_id: descriptor.product_id,
                message: format!(
                    "expected {} endpoints on interface 0, found {}",
                    consts::REQUIRED_ENDPOINT_COUNT,
                    endpoints
                ),
            });
        }
    }
    Ok(())
}

/// Host USB subsystem capability used by the panel state machine.
///
/// Implementations may pre-filter enumeration to the panel's vendor/product
/// ID; this crate is a driver for one device, not a generic USB stack.
pub trait UsbHost {
    type Connection: UsbConnection;

    /// Snapshot of currently attached candidate devices.
    fn devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Whether this process may open the given device right now.
    fn has_permission(&self, device: &DeviceDescriptor) -> bool;

    /// Asks the platform to prompt the user for access to the device.
    ///
    /// The outcome arrives later through
    /// [`crate::GlitterPanel::permission_result`]; hosts without a runtime
    /// prompt (udev-governed desktops) may treat this as a hint to log.
    fn request_permission(&self, device: &DeviceDescriptor) -> Result<()>;

    /// Opens a device handle. Does not claim any interface.
    fn open(&self, device: &DeviceDescriptor) -> Result<Self::Connection>;
}

/// An open device handle with interface claim and outbound transfer support.
pub trait UsbConnection {
    /// Claims an interface for exclusive use. With `force`, a kernel driver
    /// bound to the interface is detached first.
    fn claim_interface(&mut self, interface: u8, force: bool) -> Result<()>;

    /// Releases a previously claimed interface.
    fn release_interface(&mut self, interface: u8) -> Result<()>;

    /// Issues one outbound interrupt transfer on the endpoint at
    /// `endpoint_index` (descriptor order within the claimed interface),
    /// bounded by `timeout`. Returns the number of bytes transferred.
    fn write_interrupt(&mut self, endpoint_index: u8, data: &[u8], timeout: Duration)
        -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(vid: u16, pid: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            id: DeviceId::new(1),
            vendor_id: vid,
            product_id: pid,
            interface_count: 1,
            endpoint_counts: vec![2],
            product_string: None,
        }
    }

    #[test]
    fn matches_only_the_exact_vid_pid_pair() {
        for vid in [3887u16, 3888, 3889] {
            for pid in [63u16, 64, 65] {
                let expected = vid == 3888 && pid == 64;
                assert_eq!(
                    is_glitter_panel(&descriptor(vid, pid)),
                    expected,
                    "vid={vid} pid={pid}"
                );
            }
        }
    }

    #[test]
    fn expected_topology_is_accepted() {
        assert!(validate_topology(&descriptor(3888, 64)).is_ok());
    }

    #[test]
    fn wrong_interface_count_is_fatal() {
        let mut desc = descriptor(3888, 64);
        desc.interface_count = 2;
        assert!(matches!(
            validate_topology(&desc),
            Err(Error::Topology { .. })
        ));
    }

    #[test]
    fn wrong_endpoint_count_is_fatal() {
        let mut desc = descriptor(3888, 64);
        desc.endpoint_counts = vec![1];
        assert!(matches!(
            validate_topology(&desc),
            Err(Error::Topology { .. })
        ));
    }

    #[test]
    fn unknown_endpoint_counts_defer_to_claim_time() {
        let mut desc = descriptor(3888, 64);
        desc.endpoint_counts = Vec::new();
        assert!(validate_topology(&desc).is_ok());
    }
}
