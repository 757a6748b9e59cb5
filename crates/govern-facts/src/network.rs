//! Network interface facts: name and hardware (MAC) address.
//!
//! No `original_source/` file for this collector survived the distillation's
//! filter, so the field list is taken from `spec.md`'s facts snapshot
//! (`[{name, hardware_addr}]`) and populated from `/sys/class/net`, in the
//! same procfs/sysfs-reading idiom as the other collectors.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub hardware_addr: String,
}

pub(crate) fn collect() -> Vec<NetworkInterface> {
    let Ok(entries) = std::fs::read_dir("/sys/class/net") else {
        return Vec::new();
    };

    let mut interfaces: Vec<NetworkInterface> = entries
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let addr = std::fs::read_to_string(entry.path().join("address")).ok()?;
            Some(NetworkInterface {
                name,
                hardware_addr: addr.trim().to_string(),
            })
        })
        .collect();

    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    interfaces
}
