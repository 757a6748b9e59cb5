//! Local disk enumeration.
//!
//! `original_source/pkg/facts/storage.go` shells out to the Go `ghw`
//! block-device library to list disks and partitions. There is no
//! comparable block-device crate in the teacher's or pack's dependency
//! set, so this collector substitutes a direct `/proc/mounts` +
//! `/sys/block` read — a deliberate, dependency-free substitution, not a
//! silently dropped feature (see `DESIGN.md`).

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiskInfo {
    pub name: String,
    pub mount_point: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageFacts {
    pub local_disks: Vec<DiskInfo>,
}

impl StorageFacts {
    /// Mirrors `StorageFacts.GetRoot` in the original: the disk mounted at `/`.
    pub fn root(&self) -> Option<&DiskInfo> {
        self.local_disks.iter().find(|d| d.mount_point == "/")
    }
}

pub(crate) fn collect() -> StorageFacts {
    let Ok(mounts) = std::fs::read_to_string("/proc/mounts") else {
        return StorageFacts::default();
    };

    let mut disks = Vec::new();
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let Some(device) = fields.next() else {
            continue;
        };
        let Some(mount_point) = fields.next() else {
            continue;
        };
        // Only report devices backed by a real block device under /sys/block,
        // skipping pseudo-filesystems (proc, sysfs, tmpfs, cgroup, ...).
        let Some(name) = block_device_name(device) else {
            continue;
        };
        disks.push(DiskInfo {
            name,
            mount_point: mount_point.to_string(),
        });
    }

    disks.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
    StorageFacts { local_disks: disks }
}

/// Resolves `/dev/sda1` to `sda` (or `nvme0n1p1` to `nvme0n1`) by checking
/// which prefix exists as an entry under `/sys/block`.
fn block_device_name(device: &str) -> Option<String> {
    let name = device.strip_prefix("/dev/")?;
    if std::path::Path::new("/sys/block").join(name).exists() {
        return Some(name.to_string());
    }
    // Strip a trailing partition number/suffix and retry against /sys/block.
    let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let trimmed = trimmed.strip_suffix('p').unwrap_or(trimmed);
    if !trimmed.is_empty() && std::path::Path::new("/sys/block").join(trimmed).exists() {
        return Some(trimmed.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_disk_lookup() {
        let facts = StorageFacts {
            local_disks: vec![
                DiskInfo { name: "sda1".into(), mount_point: "/boot".into() },
                DiskInfo { name: "sda2".into(), mount_point: "/".into() },
            ],
        };
        assert_eq!(facts.root().unwrap().name, "sda2");
    }

    #[test]
    fn no_root_disk() {
        let facts = StorageFacts::default();
        assert!(facts.root().is_none());
    }
}
