//! # glitterpanel
//!
//! A Rust crate for driving the Takara Tomy Glitter Panel, a 16×16 LED toy
//! display connected over USB (VID `0x0F30`, PID `0x0040`).
//!
//! The crate turns a 256-element boolean grid plus a brightness level into
//! the panel's fixed 40-byte control frame and manages the device's
//! connect/permission/disconnect lifecycle around it.
//!
//! ## Features
//!
//! *   Connection lifecycle state machine (`connect`, `disconnect`,
//!     `is_connected`) that is idempotent and safe to drive from a periodic
//!     timer.
//! *   Permission flow with duplicate-request suppression; outcomes are
//!     delivered through [`GlitterPanel::permission_result`].
//! *   Attach/detach notification entry points
//!     ([`GlitterPanel::device_attached`],
//!     [`GlitterPanel::device_detached`]); a detach of the held panel tears
//!     the connection down.
//! *   Lifecycle observer ([`PanelEvents`]) with five notifications:
//!     connected, disconnected, permission requested/granted/rejected.
//! *   Bit-exact frame encoding ([`frame::encode`]) with four brightness
//!     levels ([`Brightness`]).
//! *   Best-effort display sends bounded by a 100 ms transfer timeout;
//!     a dropped frame is corrected by the caller's next one.
//! *   Host USB access behind the [`UsbHost`]/[`UsbConnection`] traits, so
//!     the state machine is testable without hardware; [`NusbHost`] is the
//!     `nusb`-backed implementation for real devices.
//!
//! ## Installation
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! glitterpanel = "0.1.0" # Replace with the latest version
//! log = "0.4"            # Optional, for logging
//! ```
//!
//! ## Basic Usage
//!
//! ```no_run
//! use glitterpanel::{Brightness, GlitterPanel, NoEvents, NusbHost, PIXELS};
//! use std::{thread, time::Duration};
//!
//! fn main() -> glitterpanel::Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let panel = GlitterPanel::new(NusbHost::new(), NoEvents);
//!
//!     if !panel.connect()? {
//!         eprintln!("No panel found. Is it plugged in, with a udev rule installed?");
//!         return Ok(());
//!     }
//!
//!     // Light every LED at half brightness for a second.
//!     panel.display(Brightness::Per50, &[true; PIXELS])?;
//!     thread::sleep(Duration::from_secs(1));
//!     panel.display(Brightness::Per50, &[false; PIXELS])?;
//!
//!     panel.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! Applications that want toasts or UI state changes implement
//! [`PanelEvents`] instead of using [`NoEvents`] and pass it to
//! [`GlitterPanel::new`]. Callbacks run inside the panel's internal lock;
//! keep them short and do not call back into the panel from one.
//!
//! ## Hardware Setup Notes
//!
//! *   **Linux udev Rules:** Grant user permission to the panel. Create
//!     `/etc/udev/rules.d/99-glitterpanel.rules`:
//!     ```udev
//!     SUBSYSTEM=="usb", ATTRS{idVendor}=="0f30", ATTRS{idProduct}=="0040", MODE="0666", GROUP="plugdev"
//!     ```
//!     *(Adjust `GROUP` if needed)*. Reload:
//!     `sudo udevadm control --reload-rules && sudo udevadm trigger`
//! *   **Pixel order:** The grid is row-major from the top-left corner,
//!     `index = x + 16 * y`. See [`frame::pixel_index`].
//!
//! ## License
//!
//! This project is licensed under the WTFPL - see the [LICENSE](LICENSE)
//! file for details.

// Make internal modules private, re-export public types
mod consts;
mod error;
pub mod device;
pub mod frame;
pub mod native;
mod panel;

pub use device::{
    is_glitter_panel, validate_topology, DeviceDescriptor, DeviceId, UsbConnection, UsbHost,
};
pub use error::{Error, Result};
pub use frame::Brightness;
pub use native::{NusbConnection, NusbHost};
pub use panel::{GlitterPanel, NoEvents, PanelEvents};

// Re-export only essential public constants
pub use consts::{
    GLITTER_PANEL_PID, PANEL_HEIGHT, PANEL_WIDTH, PIXELS, TAKARATOMY_VID,
};
