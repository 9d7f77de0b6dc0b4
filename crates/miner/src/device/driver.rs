use super::usb::UsbId;

/// Drivers that give user space raw access to the device.
pub const GENERIC_USB_DRIVERS: &[&str] = &["winusb"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverLookupError {
    #[error("no driver binding recorded for {0}")]
    NotFound(UsbId),
    #[error("driver metadata unavailable: {0}")]
    Unavailable(String),
}

/// OS metadata describing which driver is bound to a USB device.
pub trait DriverBindingSource: Send + Sync {
    /// Whether this platform exposes driver binding metadata at all.
    fn driver_verification_supported(&self) -> bool;

    fn query_driver_binding(&self, id: UsbId) -> Result<String, DriverLookupError>;
}

pub fn is_generic_usb_driver(driver: &str) -> bool {
    let driver = driver.to_ascii_lowercase();
    GENERIC_USB_DRIVERS
        .iter()
        .any(|generic| driver.contains(generic))
}

/// Used on platforms without driver binding introspection.
pub struct NoDriverMetadata;

impl DriverBindingSource for NoDriverMetadata {
    fn driver_verification_supported(&self) -> bool {
        false
    }

    fn query_driver_binding(&self, _id: UsbId) -> Result<String, DriverLookupError> {
        Err(DriverLookupError::Unavailable(
            "driver binding introspection is not supported on this platform".to_string(),
        ))
    }
}

/// Reads the bound service from `HKLM\SYSTEM\CurrentControlSet\Enum\USB`.
#[cfg(windows)]
pub struct RegistryDriverSource;

#[cfg(windows)]
impl DriverBindingSource for RegistryDriverSource {
    fn driver_verification_supported(&self) -> bool {
        true
    }

    fn query_driver_binding(&self, id: UsbId) -> Result<String, DriverLookupError> {
        use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
        use winreg::RegKey;

        let path = format!(
            r"SYSTEM\CurrentControlSet\Enum\USB\VID_{:04X}&PID_{:04X}",
            id.vendor_id, id.product_id
        );
        let device_key = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey_with_flags(&path, KEY_READ)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DriverLookupError::NotFound(id),
                _ => DriverLookupError::Unavailable(e.to_string()),
            })?;

        // One subkey per device instance (usually the serial number).
        for instance in device_key.enum_keys().filter_map(Result::ok) {
            let Ok(instance_key) = device_key.open_subkey_with_flags(&instance, KEY_READ) else {
                continue;
            };
            if let Ok(service) = instance_key.get_value::<String, _>("Service") {
                return Ok(service);
            }
            if let Ok(params) = instance_key.open_subkey_with_flags("Device Parameters", KEY_READ)
            {
                if let Ok(driver_path) = params.get_value::<String, _>("DriverPath") {
                    return Ok(driver_path);
                }
            }
        }

        Err(DriverLookupError::NotFound(id))
    }
}

pub fn platform_driver_source() -> Box<dyn DriverBindingSource> {
    #[cfg(windows)]
    {
        Box::new(RegistryDriverSource)
    }

    #[cfg(not(windows))]
    {
        Box::new(NoDriverMetadata)
    }
}
