use super::memory::BYTES_TO_GB;
use std::path::Path;

/// Total and free space in GB of the filesystem holding `path`.
#[cfg(unix)]
pub fn get_storage_info(path: &Path) -> Result<(f64, f64), std::io::Error> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path_c = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };

    if unsafe { libc::statvfs(path_c.as_ptr(), &mut stat) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    #[allow(clippy::useless_conversion)]
    let blocks = u64::from(stat.f_blocks);
    #[allow(clippy::useless_conversion)]
    let frsize = u64::from(stat.f_frsize);
    #[allow(clippy::useless_conversion)]
    let bavail = u64::from(stat.f_bavail);
    let total_gb = (blocks * frsize) as f64 / BYTES_TO_GB;
    let free_gb = (bavail * frsize) as f64 / BYTES_TO_GB;
    Ok((total_gb, free_gb))
}

#[cfg(not(unix))]
pub fn get_storage_info(path: &Path) -> Result<(f64, f64), std::io::Error> {
    use sysinfo::Disks;

    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    // The disk with the longest mount point that prefixes the path.
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            (
                disk.total_space() as f64 / BYTES_TO_GB,
                disk.available_space() as f64 / BYTES_TO_GB,
            )
        })
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no disk found for {}", path.display()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_storage_info() {
        let test_dir = std::env::temp_dir();

        let (total, free) = get_storage_info(&test_dir).unwrap();
        assert!(total > 0.0, "Total storage should be greater than 0");
        assert!(free >= 0.0, "Free storage should be non-negative");
        assert!(total >= free, "Total storage should be >= free storage");
    }

    #[test]
    fn test_storage_info_missing_path() {
        let missing = Path::new("/definitely/not/a/real/path/for/midas");
        assert!(get_storage_info(missing).is_err());
    }
}
