//! Ceph LVM inventory, gathered via the `ceph-volume` CLI when present.
//!
//! Grounded on `original_source/pkg/facts/ceph.go`: absence of the
//! `ceph-volume` binary is not an error, it just yields `None` (the
//! original's `log.Debug` + early-return). When present, `ceph-volume lvm
//! list --format json` is parsed the same shape as the Go structs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CephVolumeTags {
    #[serde(rename = "ceph.block_device", default)]
    pub block_device: String,
    #[serde(rename = "ceph.block_uuid", default)]
    pub block_uuid: String,
    #[serde(rename = "ceph.cluster_fsid", default)]
    pub cluster_fsid: String,
    #[serde(rename = "ceph.cluster_name", default)]
    pub cluster_name: String,
    #[serde(rename = "ceph.crush_device_class", default)]
    pub crush_device_class: String,
    #[serde(rename = "ceph.db_device", default)]
    pub db_device: String,
    #[serde(rename = "ceph.encrypted", default)]
    pub encrypted: String,
    #[serde(rename = "ceph.osd_fsid", default)]
    pub osd_fsid: String,
    #[serde(rename = "ceph.osd_id", default)]
    pub osd_id: String,
    #[serde(rename = "ceph.type", default)]
    pub kind: String,
    #[serde(rename = "ceph.wal_device", default)]
    pub wal_device: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CephLvmVolume {
    #[serde(default)]
    pub devices: Vec<String>,
    pub lv_name: String,
    pub lv_path: String,
    pub lv_uuid: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub tags: CephVolumeTags,
    #[serde(rename = "type")]
    pub kind: String,
    pub vg_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CephOsd {
    pub id: i64,
    pub volumes: Vec<CephLvmVolume>,
}

impl CephOsd {
    pub fn block_volume(&self) -> Option<&CephLvmVolume> {
        self.volumes.iter().find(|v| v.kind == "block")
    }

    pub fn db_volume(&self) -> Option<&CephLvmVolume> {
        self.volumes.iter().find(|v| v.kind == "db")
    }

    pub fn wal_volume(&self) -> Option<&CephLvmVolume> {
        self.volumes.iter().find(|v| v.kind == "wal")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CephFacts {
    pub lvm_volumes: HashMap<String, Vec<CephLvmVolume>>,
    pub osds: Vec<CephOsd>,
}

impl CephFacts {
    fn from_lvm_volumes(lvm_volumes: HashMap<String, Vec<CephLvmVolume>>) -> Self {
        let mut osds = Vec::with_capacity(lvm_volumes.len());
        for (osd_id_str, volumes) in &lvm_volumes {
            match osd_id_str.parse::<i64>() {
                Ok(id) => osds.push(CephOsd { id, volumes: volumes.clone() }),
                Err(_) => tracing::warn!(osd_id = %osd_id_str, "failed to parse OSD ID"),
            }
        }
        osds.sort_by_key(|o| o.id);
        Self { lvm_volumes, osds }
    }

    pub fn osds(&self) -> &[CephOsd] {
        &self.osds
    }
}

pub(crate) fn collect() -> Option<CephFacts> {
    if which("ceph-volume").is_none() {
        tracing::debug!("ceph-volume command not found, skipping Ceph facts");
        return None;
    }

    let output = std::process::Command::new("ceph-volume")
        .args(["lvm", "list", "--format", "json"])
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::warn!("ceph-volume lvm list exited non-zero, skipping Ceph facts");
        return None;
    }

    match serde_json::from_slice::<HashMap<String, Vec<CephLvmVolume>>>(&output.stdout) {
        Ok(volumes) => Some(CephFacts::from_lvm_volumes(volumes)),
        Err(e) => {
            tracing::error!(error = %e, "failed to parse ceph-volume lvm list JSON output");
            None
        }
    }
}

fn which(bin: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_osds_from_lvm_map() {
        let mut volumes = HashMap::new();
        volumes.insert(
            "0".to_string(),
            vec![CephLvmVolume { kind: "block".into(), ..Default::default() }],
        );
        let facts = CephFacts::from_lvm_volumes(volumes);
        assert_eq!(facts.osds().len(), 1);
        assert_eq!(facts.osds()[0].id, 0);
        assert!(facts.osds()[0].block_volume().is_some());
    }

    #[test]
    fn skips_unparseable_osd_id() {
        let mut volumes = HashMap::new();
        volumes.insert("not-a-number".to_string(), vec![CephLvmVolume::default()]);
        let facts = CephFacts::from_lvm_volumes(volumes);
        assert!(facts.osds().is_empty());
    }
}
