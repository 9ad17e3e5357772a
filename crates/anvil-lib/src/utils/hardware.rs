use once_cell::sync::Lazy;
use std::sync::Mutex;
use sysinfo::System;

static SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| {
    let mut sys = System::new();
    sys.refresh_memory();
    Mutex::new(sys)
});

/// Total physical memory in megabytes.
pub fn total_memory_mb() -> u64 {
    let mut sys = SYSTEM.lock().unwrap_or_else(|e| e.into_inner());
    sys.refresh_memory();
    sys.total_memory() / 1024 / 1024
}

/// Logical CPU count, falling back to 4 when it cannot be determined.
pub fn logical_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .ok()
        .or_else(|| {
            let mut sys = SYSTEM.lock().unwrap_or_else(|e| e.into_inner());
            sys.refresh_cpu_all();
            let count = sys.cpus().len();
            (count > 0).then_some(count)
        })
        .unwrap_or(4)
}
