use sysinfo::System;

pub const BYTES_TO_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn get_memory_info(sys: &System) -> (u64, u64) {
    let total_memory = sys.total_memory();
    let free_memory = sys.available_memory();
    (total_memory, free_memory)
}

pub fn convert_to_gb(memory: u64) -> f64 {
    memory as f64 / BYTES_TO_GB
}
