use super::DetectionError;
use std::fmt;
use std::time::Duration;

pub const TARGET_VENDOR_ID: u16 = 0x16C0;
pub const TARGET_PRODUCT_ID: u16 = 0x05DC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsbId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl UsbId {
    pub const MIDAS_DONGLE: UsbId = UsbId {
        vendor_id: TARGET_VENDOR_ID,
        product_id: TARGET_PRODUCT_ID,
    };

    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VID=0x{:04X}, PID=0x{:04X}",
            self.vendor_id, self.product_id
        )
    }
}

/// Setup packet of a device-to-host control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

/// Standard GET_DESCRIPTOR(DEVICE) request, used as a connectivity probe.
pub const GET_DEVICE_DESCRIPTOR: ControlRequest = ControlRequest {
    request_type: 0x80,
    request: 0x06,
    value: 0x0100,
    index: 0x0000,
    length: 18,
};

/// One device seen during enumeration.
pub trait UsbEntry {
    fn id(&self) -> UsbId;
}

pub trait UsbDevice {
    /// Selects the device's first configuration and claims interface 0.
    fn select_default_configuration(&mut self) -> Result<(), DetectionError>;

    fn control_in(
        &mut self,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<Vec<u8>, DetectionError>;
}

/// Host USB stack as seen by the detector.
pub trait UsbBus {
    type Entry: UsbEntry + 'static;
    type Device: UsbDevice;

    fn list(&self) -> Result<Box<dyn Iterator<Item = Self::Entry>>, DetectionError>;

    fn open(&self, entry: &Self::Entry) -> Result<Self::Device, DetectionError>;
}

pub struct NusbBus;

pub struct NusbEntry(nusb::DeviceInfo);

impl UsbEntry for NusbEntry {
    fn id(&self) -> UsbId {
        UsbId::new(self.0.vendor_id(), self.0.product_id())
    }
}

pub struct NusbDevice {
    device: nusb::Device,
    interface: Option<nusb::Interface>,
}

impl UsbBus for NusbBus {
    type Entry = NusbEntry;
    type Device = NusbDevice;

    fn list(&self) -> Result<Box<dyn Iterator<Item = NusbEntry>>, DetectionError> {
        let devices =
            nusb::list_devices().map_err(|e| DetectionError::Enumeration(e.to_string()))?;
        Ok(Box::new(devices.map(NusbEntry)))
    }

    fn open(&self, entry: &NusbEntry) -> Result<NusbDevice, DetectionError> {
        let device = entry
            .0
            .open()
            .map_err(|e| DetectionError::Open(e.to_string()))?;
        Ok(NusbDevice {
            device,
            interface: None,
        })
    }
}

impl UsbDevice for NusbDevice {
    fn select_default_configuration(&mut self) -> Result<(), DetectionError> {
        // WinUSB does not allow changing the configuration.
        #[cfg(not(target_os = "windows"))]
        {
            let value = self
                .device
                .configurations()
                .next()
                .map(|config| config.configuration_value())
                .ok_or_else(|| {
                    DetectionError::Configure("device reports no configurations".to_string())
                })?;
            self.device
                .set_configuration(value)
                .map_err(|e| DetectionError::Configure(e.to_string()))?;
        }

        let interface = self
            .device
            .claim_interface(0)
            .map_err(|e| DetectionError::Configure(format!("cannot claim interface 0: {e}")))?;
        self.interface = Some(interface);
        Ok(())
    }

    fn control_in(
        &mut self,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<Vec<u8>, DetectionError> {
        let interface = self
            .interface
            .as_ref()
            .ok_or_else(|| DetectionError::Probe("device is not configured".to_string()))?;
        let control = to_nusb_control(request)?;

        let mut buf = vec![0u8; usize::from(request.length)];
        let len = interface
            .control_in_blocking(control, &mut buf, timeout)
            .map_err(|e| DetectionError::Probe(e.to_string()))?;
        buf.truncate(len);
        Ok(buf)
    }
}

fn to_nusb_control(request: &ControlRequest) -> Result<nusb::transfer::Control, DetectionError> {
    use nusb::transfer::{Control, ControlType, Recipient};

    if request.request_type & 0x80 == 0 {
        return Err(DetectionError::Probe(format!(
            "request type 0x{:02X} is not device-to-host",
            request.request_type
        )));
    }

    let control_type = match (request.request_type >> 5) & 0x03 {
        0 => ControlType::Standard,
        1 => ControlType::Class,
        2 => ControlType::Vendor,
        _ => {
            return Err(DetectionError::Probe(format!(
                "reserved request type 0x{:02X}",
                request.request_type
            )))
        }
    };
    let recipient = match request.request_type & 0x1F {
        0 => Recipient::Device,
        1 => Recipient::Interface,
        2 => Recipient::Endpoint,
        _ => Recipient::Other,
    };

    Ok(Control {
        control_type,
        recipient,
        request: request.request,
        value: request.value,
        index: request.index,
    })
}
