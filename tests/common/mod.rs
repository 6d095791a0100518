//! Shared test doubles: an in-memory USB host, its connections, and an
//! event recorder.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use glitterpanel::{
    DeviceDescriptor, DeviceId, Error, PanelEvents, Result, UsbConnection, UsbHost,
};

/// A descriptor matching the panel's IDs and expected topology.
pub fn panel_descriptor(raw_id: u64) -> DeviceDescriptor {
    DeviceDescriptor {
        id: DeviceId::new(raw_id),
        vendor_id: 3888,
        product_id: 64,
        interface_count: 1,
        endpoint_counts: vec![2],
        product_string: Some("GLITTER PANEL".into()),
    }
}

#[derive(Default)]
pub struct HostState {
    /// What `devices()` returns.
    pub devices: Vec<DeviceDescriptor>,
    /// Whether `has_permission` reports access.
    pub permitted: bool,
    /// `devices()` returns an empty list after this many calls.
    pub present_for_calls: Option<usize>,
    /// If set, `open` fails.
    pub fail_open: bool,
    /// If set, `claim_interface` on opened connections fails.
    pub fail_claim: bool,
    /// If set, writes on opened connections fail.
    pub fail_write: bool,

    // Recorded activity.
    pub devices_calls: usize,
    pub permission_requests: usize,
    pub opened_ids: Vec<DeviceId>,
}

/// Everything the fake connections did, shared across clones of the host.
#[derive(Default)]
pub struct IoLog {
    pub claims: Mutex<Vec<(u8, bool)>>,
    pub releases: Mutex<Vec<u8>>,
    pub writes: Mutex<Vec<(u8, Vec<u8>, Duration)>>,
}

/// In-memory [`UsbHost`]. Cheap to clone; clones share state, so a test can
/// keep a handle while the panel owns another.
#[derive(Clone, Default)]
pub struct FakeHost {
    pub state: Arc<Mutex<HostState>>,
    pub io: Arc<IoLog>,
}

impl FakeHost {
    pub fn with_panel(descriptor: DeviceDescriptor, permitted: bool) -> Self {
        let host = FakeHost::default();
        {
            let mut state = host.state.lock().unwrap();
            state.devices = vec![descriptor];
            state.permitted = permitted;
        }
        host
    }
}

impl UsbHost for FakeHost {
    type Connection = FakeConnection;

    fn devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut state = self.state.lock().unwrap();
        state.devices_calls += 1;
        if let Some(limit) = state.present_for_calls {
            if state.devices_calls > limit {
                return Ok(Vec::new());
            }
        }
        Ok(state.devices.clone())
    }

    fn has_permission(&self, _device: &DeviceDescriptor) -> bool {
        self.state.lock().unwrap().permitted
    }

    fn request_permission(&self, _device: &DeviceDescriptor) -> Result<()> {
        self.state.lock().unwrap().permission_requests += 1;
        Ok(())
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<FakeConnection> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(Error::DeviceNotFound);
        }
        state.opened_ids.push(device.id);
        Ok(FakeConnection {
            io: Arc::clone(&self.io),
            fail_claim: state.fail_claim,
            fail_write: state.fail_write,
        })
    }
}

pub struct FakeConnection {
    io: Arc<IoLog>,
    fail_claim: bool,
    fail_write: bool,
}

impl UsbConnection for FakeConnection {
    fn claim_interface(&mut self, interface: u8, force: bool) -> Result<()> {
        self.io.claims.lock().unwrap().push((interface, force));
        if self.fail_claim {
            return Err(Error::DeviceNotFound);
        }
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<()> {
        self.io.releases.lock().unwrap().push(interface);
        Ok(())
    }

    fn write_interrupt(
        &mut self,
        endpoint_index: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        self.io
            .writes
            .lock()
            .unwrap()
            .push((endpoint_index, data.to_vec(), timeout));
        if self.fail_write {
            return Err(Error::Timeout);
        }
        Ok(data.len())
    }
}

#[derive(Default)]
pub struct EventCounts {
    pub connected: usize,
    pub disconnected: usize,
    pub request_permission: usize,
    pub permission_grant: usize,
    pub permission_reject: usize,
}

/// Observer that counts every notification.
#[derive(Clone, Default)]
pub struct RecordingEvents {
    pub counts: Arc<Mutex<EventCounts>>,
}

impl PanelEvents for RecordingEvents {
    fn on_connected(&self) {
        self.counts.lock().unwrap().connected += 1;
    }

    fn on_disconnected(&self) {
        self.counts.lock().unwrap().disconnected += 1;
    }

    fn on_request_permission(&self) {
        self.counts.lock().unwrap().request_permission += 1;
    }

    fn on_permission_grant(&self) {
        self.counts.lock().unwrap().permission_grant += 1;
    }

    fn on_permission_reject(&self) {
        self.counts.lock().unwrap().permission_reject += 1;
    }
}
