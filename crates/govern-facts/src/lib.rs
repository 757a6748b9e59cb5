//! Read-only snapshot of host attributes consumed by templates and drivers.
//!
//! The snapshot is gathered once, explicitly, at process start and passed
//! by reference from then on — there is no process-global mutable facts
//! aggregate to initialize on module load.

mod ceph;
mod distro;
mod hardware;
mod identity;
mod network;
mod storage;

pub use ceph::{CephFacts, CephLvmVolume, CephOsd, CephVolumeTags};
pub use distro::DistroFacts;
pub use hardware::CpuInfo;
pub use network::NetworkInterface;
pub use storage::{DiskInfo, StorageFacts};

use serde::{Deserialize, Serialize};

/// Immutable snapshot of everything templates and resource drivers need to
/// know about the host they're running on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Facts {
    pub hostname: String,
    pub uid: u32,
    pub euid: u32,
    pub gid: u32,
    pub egid: u32,
    pub groups: Vec<u32>,
    pub pid: u32,
    pub ppid: u32,
    pub environ: Vec<String>,
    pub system_uuid: String,
    pub memory_total_kb: u64,
    pub init_system: String,
    pub cpu: CpuInfo,
    pub distro: DistroFacts,
    pub network: Vec<NetworkInterface>,
    pub storage: StorageFacts,
    pub ceph: Option<CephFacts>,
}

impl Facts {
    /// Gather the full snapshot. Each collector is independently
    /// best-effort: a missing `/proc` entry or absent tool degrades that
    /// one field rather than failing the whole snapshot.
    pub fn collect() -> Self {
        let id = identity::collect();
        Self {
            hostname: id.hostname,
            uid: id.uid,
            euid: id.euid,
            gid: id.gid,
            egid: id.egid,
            groups: id.groups,
            pid: id.pid,
            ppid: id.ppid,
            environ: id.environ,
            system_uuid: hardware::system_uuid(),
            memory_total_kb: hardware::memory_total_kb(),
            init_system: distro::init_system(),
            cpu: hardware::CpuInfo::collect(),
            distro: distro::detect(),
            network: network::collect(),
            storage: storage::collect(),
            ceph: ceph::collect(),
        }
    }

    /// Ordered key/value pairs for `local facts`'s aligned table output.
    /// Ordering is fixed so the table reads the same way on every run.
    pub fn as_table_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("hostname".into(), self.hostname.clone()),
            ("uid".into(), self.uid.to_string()),
            ("euid".into(), self.euid.to_string()),
            ("gid".into(), self.gid.to_string()),
            ("egid".into(), self.egid.to_string()),
            ("pid".into(), self.pid.to_string()),
            ("ppid".into(), self.ppid.to_string()),
            ("system_uuid".into(), self.system_uuid.clone()),
            ("memory_total_kb".into(), self.memory_total_kb.to_string()),
            ("init_system".into(), self.init_system.clone()),
            ("distro.name".into(), self.distro.name.clone()),
            ("distro.slug".into(), self.distro.slug.clone()),
            ("distro.family".into(), self.distro.family.clone()),
            ("distro.version".into(), self.distro.version.clone()),
            ("cpu.arch".into(), self.cpu.arch.clone()),
            ("cpu.vendor".into(), self.cpu.vendor.clone()),
            ("cpu.model".into(), self.cpu.model.clone()),
            ("cpu.cores".into(), self.cpu.cores.to_string()),
            ("cpu.threads".into(), self.cpu.threads.to_string()),
        ];
        for disk in &self.storage.local_disks {
            rows.push((
                format!("storage.disk[{}]", disk.name),
                disk.mount_point.clone(),
            ));
        }
        for iface in &self.network {
            rows.push((format!("network[{}]", iface.name), iface.hardware_addr.clone()));
        }
        if let Some(ceph) = &self.ceph {
            rows.push(("ceph.osd_count".into(), ceph.osds.len().to_string()));
        }
        rows
    }
}
