//! udev device bus
//!
//! Enumerates input devices and monitors udev for input add/remove events.
//! Readiness is checked with a zero-timeout poll so the host loop never
//! stalls.

use std::os::unix::io::{AsRawFd, BorrowedFd, RawFd};

use log::{debug, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};

use super::error::IndevError;
use super::monitor::{BusChannel, BusDevice, BusEvent, DeviceBus};

/// udev-backed device bus
#[derive(Debug, Default)]
pub struct UdevBus;

impl UdevBus {
    pub fn new() -> Self {
        Self
    }
}

fn bus_device(device: &udev::Device) -> BusDevice {
    BusDevice {
        syspath: device.syspath().to_string_lossy().into_owned(),
        devnode: device.devnode().map(|p| p.to_string_lossy().into_owned()),
    }
}

impl DeviceBus for UdevBus {
    type Channel = UdevChannel;

    fn subscribe(&mut self, subsystem: &str) -> Result<UdevChannel, IndevError> {
        let _context = udev::Udev::new().map_err(|e| IndevError::monitor("context", e))?;

        // Each step consumes the previous one; a failure drops everything
        // acquired so far.
        let socket = udev::MonitorBuilder::new()
            .map_err(|e| IndevError::monitor("monitor", e))?
            .match_subsystem(subsystem)
            .map_err(|e| IndevError::monitor("subsystem filter", e))?
            .listen()
            .map_err(|e| IndevError::monitor("enable receiving", e))?;

        let fd = socket.as_raw_fd();
        if fd < 0 {
            return Err(IndevError::monitor(
                "file descriptor",
                std::io::Error::from_raw_os_error(libc::EBADF),
            ));
        }

        debug!("udev monitor listening on {} (fd {})", subsystem, fd);
        Ok(UdevChannel { socket, fd })
    }

    fn scan(&mut self, subsystem: &str) -> Result<Vec<BusDevice>, IndevError> {
        let context = udev::Udev::new().map_err(|e| IndevError::monitor("context", e))?;
        let mut enumerator = udev::Enumerator::with_udev(context)
            .map_err(|e| IndevError::monitor("enumerator", e))?;
        enumerator
            .match_subsystem(subsystem)
            .map_err(|e| IndevError::monitor("subsystem filter", e))?;
        let devices = enumerator
            .scan_devices()
            .map_err(|e| IndevError::monitor("scan", e))?;
        Ok(devices.map(|d| bus_device(&d)).collect())
    }
}

/// Listening udev monitor socket
pub struct UdevChannel {
    socket: udev::MonitorSocket,
    fd: RawFd,
}

impl BusChannel for UdevChannel {
    fn is_ready(&mut self) -> bool {
        // fd is owned by the socket, which outlives this borrow
        let fd = unsafe { BorrowedFd::borrow_raw(self.fd) };
        let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
        match poll(&mut fds, 0) {
            Ok(n) if n > 0 => fds[0]
                .revents()
                .map(|r| r.contains(PollFlags::POLLIN))
                .unwrap_or(false),
            Ok(_) | Err(Errno::EINTR) => false,
            Err(e) => {
                warn!("udev monitor poll failed: {}", e);
                false
            }
        }
    }

    fn receive(&mut self) -> Option<BusEvent> {
        let event = self.socket.iter().next()?;
        Some(BusEvent {
            action: event.action().map(|a| a.to_string_lossy().into_owned()),
            device: bus_device(&event),
        })
    }
}
