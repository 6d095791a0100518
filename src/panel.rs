//! Panel connection lifecycle and frame transport.

use std::sync::Mutex;
use std::time::Duration;

use log::{debug, trace};

use crate::consts;
use crate::device::{
    is_glitter_panel, validate_topology, DeviceDescriptor, DeviceId, UsbConnection, UsbHost,
};
use crate::error::Result;
use crate::frame::{self, Brightness};

/// Lifecycle notifications fired by [`GlitterPanel`].
///
/// Exactly one observer is registered per panel, at construction time. All
/// callbacks run synchronously inside the panel's internal lock: keep them
/// short and do not call back into the panel from one.
pub trait PanelEvents {
    /// The panel was opened and its interface claimed.
    fn on_connected(&self) {}
    /// The connection was torn down, explicitly or by a detach event.
    fn on_disconnected(&self) {}
    /// A permission request was issued to the host platform.
    fn on_request_permission(&self) {}
    /// The user granted access; a reconnect is already underway.
    fn on_permission_grant(&self) {}
    /// The user declined access. A later [`GlitterPanel::connect`] call
    /// issues a fresh request.
    fn on_permission_reject(&self) {}
}

/// Observer that ignores every event.
pub struct NoEvents;

impl PanelEvents for NoEvents {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionState {
    NotRequested,
    /// A prompt is outstanding; `connect()` must not ask again.
    Requested,
    Granted,
    Rejected,
}

/// An open, claimed connection plus the endpoint frames are written to.
struct Link<C> {
    connection: C,
    device_id: DeviceId,
    write_endpoint: u8,
}

impl<C: UsbConnection> Link<C> {
    /// One best-effort outbound transfer of a complete frame, bounded by
    /// the send timeout. Callers hold the panel lock for the duration, so
    /// no two frames are ever in flight concurrently.
    fn send(&mut self, frame_bytes: &[u8]) -> Result<usize> {
        self.connection.write_interrupt(
            self.write_endpoint,
            frame_bytes,
            Duration::from_millis(consts::SEND_TIMEOUT_MS),
        )
    }
}

struct PanelState<C> {
    link: Option<Link<C>>,
    permission: PermissionState,
    /// Device reference from an attach notification; checked before a full
    /// enumeration scan when connecting.
    launch_device: Option<DeviceDescriptor>,
}

/// Connection manager for one Glitter Panel.
///
/// Owns the USB connection lifecycle (discovery, permission flow, interface
/// claim, teardown) and sends display frames while connected. Attach,
/// detach, and permission-result notifications from the host platform are
/// fed in through [`device_attached`](Self::device_attached),
/// [`device_detached`](Self::device_detached), and
/// [`permission_result`](Self::permission_result); all entry points
/// serialize on one internal lock.
pub struct GlitterPanel<H: UsbHost, E: PanelEvents> {
    host: H,
    events: E,
    state: Mutex<PanelState<H::Connection>>,
}

impl<H: UsbHost, E: PanelEvents> GlitterPanel<H, E> {
    /// Creates a disconnected panel over the given host backend.
    pub fn new(host: H, events: E) -> Self {
        GlitterPanel {
            host,
            events,
            state: Mutex::new(PanelState {
                link: None,
                permission: PermissionState::NotRequested,
                launch_device: None,
            }),
        }
    }

    /// Attempts to connect to the panel. Idempotent and safe to call
    /// opportunistically (e.g. from a periodic timer).
    ///
    /// Returns `Ok(true)` once connected. `Ok(false)` means no panel is
    /// present, a permission prompt is outstanding (or was just issued), or
    /// open/claim failed; all of these are worth retrying later. A device
    /// that matches the panel's IDs but not its USB topology is fatal and
    /// surfaces as [`crate::Error::Topology`].
    pub fn connect(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        self.connect_locked(&mut state)
    }

    fn connect_locked(&self, state: &mut PanelState<H::Connection>) -> Result<bool> {
        if state.link.is_some() {
            return Ok(true);
        }

        let device = match self.find_panel(state)? {
            Some(device) => device,
            None => return Ok(false),
        };

        validate_topology(&device)?;

        if self.host.has_permission(&device) {
            // Already allowed to open the device.
        } else if state.permission == PermissionState::Requested {
            debug!("permission request already outstanding, not asking again");
            return Ok(false);
        } else {
            // The device may have been unplugged between discovery and the
            // permission check.
            if !self.host.devices()?.iter().any(|d| d.id == device.id) {
                debug!("panel disappeared before the permission request");
                return Ok(false);
            }
            debug!("requesting permission to open the panel");
            state.permission = PermissionState::Requested;
            self.host.request_permission(&device)?;
            self.events.on_request_permission();
            return Ok(false);
        }

        let mut connection = match self.host.open(&device) {
            Ok(connection) => connection,
            Err(e) => {
                debug!("failed to open the panel: {e}");
                return Ok(false);
            }
        };
        if let Err(e) = connection.claim_interface(consts::PANEL_INTERFACE, true) {
            debug!("failed to claim the panel interface: {e}");
            return Ok(false);
        }

        state.link = Some(Link {
            connection,
            device_id: device.id,
            write_endpoint: consts::WRITE_ENDPOINT_INDEX,
        });
        state.permission = PermissionState::Granted;
        debug!(
            "connected to panel (interface {}, write endpoint index {})",
            consts::PANEL_INTERFACE,
            consts::WRITE_ENDPOINT_INDEX
        );
        self.events.on_connected();
        Ok(true)
    }

    /// Looks for a panel: first the device from an attach notification,
    /// then the host's current enumeration.
    fn find_panel(&self, state: &PanelState<H::Connection>) -> Result<Option<DeviceDescriptor>> {
        if let Some(device) = &state.launch_device {
            if is_glitter_panel(device) {
                trace!("panel found via attach notification");
                return Ok(Some(device.clone()));
            }
        }
        for device in self.host.devices()? {
            if is_glitter_panel(&device) {
                trace!("panel found via enumeration");
                return Ok(Some(device));
            }
        }
        Ok(None)
    }

    /// Releases the claimed interface and closes the connection. No-op when
    /// not connected.
    pub fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        self.disconnect_locked(&mut state);
    }

    fn disconnect_locked(&self, state: &mut PanelState<H::Connection>) {
        let Some(mut link) = state.link.take() else {
            return;
        };
        if let Err(e) = link.connection.release_interface(consts::PANEL_INTERFACE) {
            debug!("failed to release the panel interface: {e}");
        }
        // Dropping the link closes the device handle.
        drop(link);
        debug!("disconnected from panel");
        self.events.on_disconnected();
    }

    /// Delivers the outcome of a permission prompt.
    ///
    /// A grant immediately retries [`connect`](Self::connect) and returns
    /// its result; a rejection leaves the panel disconnected until the next
    /// explicit connect attempt.
    pub fn permission_result(&self, granted: bool) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if granted {
            state.permission = PermissionState::Granted;
            self.events.on_permission_grant();
            self.connect_locked(&mut state)
        } else {
            state.permission = PermissionState::Rejected;
            self.events.on_permission_reject();
            Ok(false)
        }
    }

    /// Records a device-attached notification. A matching device becomes
    /// the preferred candidate for the next connect attempt.
    pub fn device_attached(&self, descriptor: DeviceDescriptor) {
        if !is_glitter_panel(&descriptor) {
            trace!(
                "ignoring attach of {:04X}:{:04X}",
                descriptor.vendor_id,
                descriptor.product_id
            );
            return;
        }
        debug!("panel attached");
        let mut state = self.state.lock().unwrap();
        state.launch_device = Some(descriptor);
    }

    /// Handles a device-detached notification, disconnecting when the
    /// detached device is the one currently held.
    pub fn device_detached(&self, id: DeviceId) {
        let mut state = self.state.lock().unwrap();
        if state
            .launch_device
            .as_ref()
            .is_some_and(|device| device.id == id)
        {
            state.launch_device = None;
        }
        if state.link.as_ref().is_some_and(|link| link.device_id == id) {
            debug!("connected panel was detached");
            self.disconnect_locked(&mut state);
        }
    }

    /// Encodes and sends one display frame. No-op when not connected.
    ///
    /// A grid of any length other than 256 is a programmer error and
    /// returns [`crate::Error::GridSize`]. Transfer failures are absorbed:
    /// the usage pattern is a periodic caller whose next frame corrects the
    /// display, so nothing is retried here.
    pub fn display(&self, brightness: Brightness, pixels: &[bool]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(link) = state.link.as_mut() else {
            trace!("display skipped, panel not connected");
            return Ok(());
        };
        let frame_bytes = frame::encode(brightness, pixels)?;
        match link.send(&frame_bytes) {
            Ok(written) => trace!("frame sent ({written} bytes)"),
            Err(e) => debug!("frame transfer failed: {e}"),
        }
        Ok(())
    }

    /// True while an open, claimed connection is held.
    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().link.is_some()
    }
}
