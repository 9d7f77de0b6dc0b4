//! Midas dongle detection.
//!
//! Detection walks a fixed sequence of stages: enumerate the USB bus, match
//! the target vendor/product pair, check the OS driver binding, then open the
//! device, select its configuration and read the device descriptor as a
//! connectivity probe. A failure at any stage is terminal for that detector;
//! retrying means running detection again.

pub mod driver;
pub mod usb;

use driver::{is_generic_usb_driver, platform_driver_source, DriverBindingSource};
use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;
use usb::{NusbBus, UsbBus, UsbDevice, UsbEntry, GET_DEVICE_DESCRIPTOR};

pub use usb::UsbId;

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionError {
    #[error("USB backend unavailable: {0}")]
    Enumeration(String),
    #[error("Midas dongle not found ({0})")]
    NotFound(UsbId),
    #[error("WinUSB driver not properly installed (bound driver: {})", .found.as_deref().unwrap_or("unknown"))]
    DriverMismatch { found: Option<String> },
    #[error("Could not open device: {0}")]
    Open(String),
    #[error("Could not configure device: {0}")]
    Configure(String),
    #[error("USB connection test failed: {0}")]
    Probe(String),
}

impl DetectionError {
    pub fn remediation(&self) -> &'static str {
        match self {
            DetectionError::Enumeration(_) => {
                "Make sure USB access is available and run the program as Administrator (or root)"
            }
            DetectionError::NotFound(_) => "Ensure the device is properly connected",
            DetectionError::DriverMismatch { .. } => "Reinstall the WinUSB driver using Zadig",
            DetectionError::Open(_) | DetectionError::Configure(_) => {
                "Check the device manager and run the program as Administrator (or root)"
            }
            DetectionError::Probe(_) => "Reconnect the device and try again",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionStage {
    Uninitialized,
    Enumerated,
    Matched,
    DriverVerified,
    Configured,
    ConnectionTested,
    Failed(DetectionError),
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStage::Failed(reason) => write!(f, "Failed ({reason})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Lazy view over the devices found on the bus.
///
/// A backend failure yields an empty sequence; the cause is kept in
/// [`Enumeration::error`].
pub struct Enumeration<E> {
    entries: Box<dyn Iterator<Item = E>>,
    error: Option<DetectionError>,
}

impl<E> Enumeration<E> {
    pub fn error(&self) -> Option<&DetectionError> {
        self.error.as_ref()
    }
}

impl<E> Iterator for Enumeration<E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        self.entries.next()
    }
}

/// The matched dongle. Closing happens on drop.
pub struct DeviceHandle<E, D> {
    id: UsbId,
    entry: E,
    device: Option<D>,
    configured: bool,
    descriptor: Option<Vec<u8>>,
}

impl<E, D> DeviceHandle<E, D> {
    fn new(id: UsbId, entry: E) -> Self {
        Self {
            id,
            entry,
            device: None,
            configured: false,
            descriptor: None,
        }
    }

    pub fn id(&self) -> UsbId {
        self.id
    }

    pub fn vendor_id(&self) -> u16 {
        self.id.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.id.product_id
    }

    pub fn entry(&self) -> &E {
        &self.entry
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Raw device descriptor returned by the connectivity probe.
    pub fn descriptor(&self) -> Option<&[u8]> {
        self.descriptor.as_deref()
    }
}

pub type DetectedDevice<B> = DeviceHandle<<B as UsbBus>::Entry, <B as UsbBus>::Device>;

pub struct DeviceDetector<B: UsbBus> {
    bus: B,
    drivers: Box<dyn DriverBindingSource>,
    target: UsbId,
    probe_timeout: Duration,
    stage: DetectionStage,
}

impl DeviceDetector<NusbBus> {
    /// Detector over the host USB stack with this platform's driver metadata.
    pub fn for_platform() -> Self {
        Self::new(NusbBus, platform_driver_source())
    }
}

impl<B: UsbBus> DeviceDetector<B> {
    pub fn new(bus: B, drivers: Box<dyn DriverBindingSource>) -> Self {
        Self {
            bus,
            drivers,
            target: UsbId::MIDAS_DONGLE,
            probe_timeout: PROBE_TIMEOUT,
            stage: DetectionStage::Uninitialized,
        }
    }

    pub fn stage(&self) -> &DetectionStage {
        &self.stage
    }

    pub fn target(&self) -> UsbId {
        self.target
    }

    pub fn driver_verification_supported(&self) -> bool {
        self.drivers.driver_verification_supported()
    }

    fn fail(&mut self, err: DetectionError) -> DetectionError {
        self.stage = DetectionStage::Failed(err.clone());
        err
    }

    pub fn enumerate(&mut self) -> Enumeration<B::Entry> {
        match self.bus.list() {
            Ok(entries) => {
                self.stage = DetectionStage::Enumerated;
                Enumeration {
                    entries,
                    error: None,
                }
            }
            Err(err) => {
                warn!("Error listing USB devices: {err}");
                let err = self.fail(err);
                Enumeration {
                    entries: Box::new(std::iter::empty()),
                    error: Some(err),
                }
            }
        }
    }

    /// Returns the first enumerated device matching the target id.
    pub fn find_target(&mut self) -> Result<DetectedDevice<B>, DetectionError> {
        let mut devices = self.enumerate();
        if let Some(err) = devices.error() {
            return Err(err.clone());
        }

        let target = self.target;
        let found = devices.find(|entry| {
            let id = entry.id();
            debug!("Device: {id}");
            id == target
        });

        match found {
            Some(entry) => {
                info!("Midas dongle found ({target})");
                self.stage = DetectionStage::Matched;
                Ok(DeviceHandle::new(target, entry))
            }
            None => Err(self.fail(DetectionError::NotFound(target))),
        }
    }

    /// Checks that the generic USB driver is bound to the device.
    ///
    /// Always passes, with a warning, where the platform has no driver
    /// binding metadata.
    pub fn verify_driver(&mut self, handle: &DetectedDevice<B>) -> bool {
        if !self.drivers.driver_verification_supported() {
            warn!("Driver binding cannot be inspected on this platform; skipping driver check");
            self.stage = DetectionStage::DriverVerified;
            return true;
        }

        match self.drivers.query_driver_binding(handle.id()) {
            Ok(driver) if is_generic_usb_driver(&driver) => {
                info!("WinUSB driver properly installed");
                self.stage = DetectionStage::DriverVerified;
                true
            }
            Ok(driver) => {
                warn!("Device is bound to '{driver}', WinUSB required. Please install using Zadig");
                self.fail(DetectionError::DriverMismatch {
                    found: Some(driver),
                });
                false
            }
            Err(err) => {
                warn!("Could not verify driver: {err}");
                self.fail(DetectionError::DriverMismatch { found: None });
                false
            }
        }
    }

    pub fn open_and_configure(
        &mut self,
        mut handle: DetectedDevice<B>,
    ) -> Result<DetectedDevice<B>, DetectionError> {
        let opened = self.bus.open(&handle.entry);
        let mut device = opened.map_err(|e| self.fail(e))?;

        let configured = device.select_default_configuration();
        configured.map_err(|e| self.fail(e))?;
        handle.configured = true;
        self.stage = DetectionStage::Configured;

        let probe = device.control_in(&GET_DEVICE_DESCRIPTOR, self.probe_timeout);
        let descriptor = probe.map_err(|e| self.fail(e))?;
        debug!("Device descriptor: {} bytes", descriptor.len());

        handle.device = Some(device);
        handle.descriptor = Some(descriptor);
        self.stage = DetectionStage::ConnectionTested;
        info!("USB connection test successful");
        Ok(handle)
    }

    /// Runs every stage in order and returns the configured, probed device.
    pub fn detect(&mut self) -> Result<DetectedDevice<B>, DetectionError> {
        let handle = self.find_target()?;

        if !self.verify_driver(&handle) {
            return Err(match &self.stage {
                DetectionStage::Failed(err) => err.clone(),
                _ => DetectionError::DriverMismatch { found: None },
            });
        }

        self.open_and_configure(handle)
    }
}
