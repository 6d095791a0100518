//! `nusb`-backed [`UsbHost`] implementation for desktop platforms.
//!
//! Desktop hosts have no runtime permission prompt; access to the panel is
//! governed by udev rules (see the crate docs). The permission flow in
//! [`crate::GlitterPanel`] stays fully functional for embedders that do
//! prompt (they deliver the outcome via
//! [`crate::GlitterPanel::permission_result`]).

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, trace, warn};
use nusb::transfer::{Interrupt, Out};
use nusb::MaybeFuture;

use crate::consts;
use crate::device::{DeviceDescriptor, DeviceId, UsbConnection, UsbHost};
use crate::error::{Error, Result};

/// Derives the crate-level device identity from nusb's device id.
fn key_of(info: &nusb::DeviceInfo) -> DeviceId {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    info.id().hash(&mut hasher);
    DeviceId::new(hasher.finish())
}

struct SeenDevice {
    info: nusb::DeviceInfo,
    permitted: bool,
}

/// Host USB access through `nusb`.
///
/// Enumeration is pre-filtered to the panel's vendor/product ID. Topology
/// (endpoint counts) is probed by briefly opening each candidate; when the
/// open fails (typically a missing udev rule) the device is reported with
/// unknown endpoint counts and no permission.
pub struct NusbHost {
    seen: Mutex<HashMap<DeviceId, SeenDevice>>,
}

impl NusbHost {
    pub fn new() -> Self {
        NusbHost {
            seen: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for NusbHost {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbHost for NusbHost {
    type Connection = NusbConnection;

    fn devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut seen = self.seen.lock().unwrap();
        seen.clear();

        let mut found = Vec::new();
        for info in nusb::list_devices().wait()? {
            if info.vendor_id() != consts::TAKARATOMY_VID
                || info.product_id() != consts::GLITTER_PANEL_PID
            {
                continue;
            }
            trace!(
                "found panel candidate {:04X}:{:04X}",
                info.vendor_id(),
                info.product_id()
            );

            let (interface_count, endpoint_counts, permitted) = match info.open().wait() {
                Ok(device) => match device.active_configuration() {
                    Ok(config) => {
                        let counts: Vec<u8> = config
                            .interfaces()
                            .map(|group| group.first_alt_setting().num_endpoints())
                            .collect();
                        (counts.len() as u8, counts, true)
                    }
                    Err(e) => {
                        warn!("could not read the active configuration: {e}");
                        (info.interfaces().count() as u8, Vec::new(), true)
                    }
                },
                Err(e) => {
                    debug!("panel present but not openable (missing udev rule?): {e}");
                    (info.interfaces().count() as u8, Vec::new(), false)
                }
            };

            found.push(DeviceDescriptor {
                id: key_of(&info),
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                interface_count,
                endpoint_counts,
                product_string: info.product_string().map(str::to_owned),
            });
            seen.insert(key_of(&info), SeenDevice { info, permitted });
        }
        Ok(found)
    }

    fn has_permission(&self, device: &DeviceDescriptor) -> bool {
        let seen = self.seen.lock().unwrap();
        seen.get(&device.id).is_some_and(|entry| entry.permitted)
    }

    fn request_permission(&self, device: &DeviceDescriptor) -> Result<()> {
        warn!(
            "no permission prompt on this platform; grant access to \
             {:04X}:{:04X} with a udev rule",
            device.vendor_id, device.product_id
        );
        Ok(())
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<NusbConnection> {
        let seen = self.seen.lock().unwrap();
        let entry = seen.get(&device.id).ok_or(Error::DeviceNotFound)?;
        let handle = entry.info.open().wait()?;
        Ok(NusbConnection::new(handle))
    }
}

/// An open panel handle; claims the interface and issues interrupt-OUT
/// transfers with an explicit timeout.
pub struct NusbConnection {
    device: nusb::Device,
    interface: Option<nusb::Interface>,
    /// Endpoint addresses of the panel interface, in descriptor order, so
    /// an endpoint index can be resolved to a transfer address.
    endpoint_addresses: Vec<u8>,
    write_endpoint: Option<nusb::Endpoint<Interrupt, Out>>,
}

impl NusbConnection {
    fn new(device: nusb::Device) -> Self {
        let endpoint_addresses = match device.active_configuration() {
            Ok(config) => config
                .interfaces()
                .find(|group| group.interface_number() == consts::PANEL_INTERFACE)
                .map(|group| {
                    group
                        .first_alt_setting()
                        .endpoints()
                        .map(|endpoint| endpoint.address())
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                warn!("could not read endpoint descriptors: {e}");
                Vec::new()
            }
        };
        NusbConnection {
            device,
            interface: None,
            endpoint_addresses,
            write_endpoint: None,
        }
    }
}

impl UsbConnection for NusbConnection {
    fn claim_interface(&mut self, interface: u8, force: bool) -> Result<()> {
        let claimed = if force {
            self.device.detach_and_claim_interface(interface).wait()?
        } else {
            self.device.claim_interface(interface).wait()?
        };
        debug!("claimed interface {interface} (force={force})");
        self.interface = Some(claimed);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<()> {
        // nusb releases the claim when the Interface is dropped.
        self.write_endpoint = None;
        self.interface = None;
        debug!("released interface {interface}");
        Ok(())
    }

    fn write_interrupt(
        &mut self,
        endpoint_index: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        let interface = self.interface.as_ref().ok_or(Error::InterfaceNotClaimed)?;
        let &address = self
            .endpoint_addresses
            .get(endpoint_index as usize)
            .ok_or_else(|| Error::EndpointUnavailable {
                address: endpoint_index,
                message: "no endpoint at this index".into(),
            })?;

        if self.write_endpoint.is_none() {
            let opened = interface
                .endpoint::<Interrupt, Out>(address)
                .map_err(|e| Error::EndpointUnavailable {
                    address,
                    message: e.to_string(),
                })?;
            self.write_endpoint = Some(opened);
        }
        let endpoint = self
            .write_endpoint
            .as_mut()
            .ok_or_else(|| Error::EndpointUnavailable {
                address,
                message: "endpoint handle lost".into(),
            })?;

        let mut buffer = endpoint.allocate(data.len());
        buffer.extend_from_slice(data);
        endpoint.submit(buffer);
        match endpoint.wait_next_complete(timeout) {
            Some(completion) => {
                completion.status?;
                trace!("interrupt OUT transfer of {} bytes complete", data.len());
                Ok(data.len())
            }
            None => {
                endpoint.cancel_all();
                // Drain the cancelled transfer so the queue stays clean.
                let _ = endpoint.wait_next_complete(Duration::from_millis(10));
                Err(Error::Timeout)
            }
        }
    }
}
