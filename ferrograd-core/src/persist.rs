//! On-disk name → tensor archives.
//!
//! An archive is a directory holding `index.json` plus one little-endian
//! `.bin` file per tensor. Layer weights and optimizer state both use it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::HostData;
use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use crate::tensor::Tensor;
use crate::types::DType;

pub const ARCHIVE_VERSION: u32 = 1;
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub archive_version: u32,
    #[serde(default)]
    pub step: Option<u64>,
    pub entries: Vec<IndexEntry>,
}

/// One tensor read back from an archive, still in host form.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: HostData,
}

impl ArchiveEntry {
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Allocates the entry on the device and pool of `template`, or as
    /// unaccounted host memory when there is no template.
    pub fn to_tensor(&self, template: Option<&Tensor>) -> Result<Tensor> {
        match template {
            Some(t) => t.like(self.data.clone(), self.shape.clone()),
            None => Tensor::from_host(self.data.clone(), self.shape.clone(), StorageDevice::Cpu, None),
        }
    }
}

/// Contents of an archive in index order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Archive {
    pub step: Option<u64>,
    pub entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn get(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes `tensors` under `dir`, creating it if needed. Existing index and
/// tensor files are overwritten.
pub fn write_archive<P: AsRef<Path>>(dir: P, tensors: &[(String, Tensor)], step: Option<u64>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut entries = Vec::with_capacity(tensors.len());
    for (i, (name, tensor)) in tensors.iter().enumerate() {
        if entries.iter().any(|e: &IndexEntry| &e.name == name) {
            return Err(FerrogradError::Serialization(format!("duplicate archive key '{}'", name)));
        }
        let file = format!("{:05}.bin", i);
        fs::write(dir.join(&file), tensor.host_data().to_le_bytes())?;
        entries.push(IndexEntry {
            name: name.clone(),
            shape: tensor.shape().to_vec(),
            dtype: tensor.dtype(),
            file,
        });
    }

    let index = ArchiveIndex {
        archive_version: ARCHIVE_VERSION,
        step,
        entries,
    };
    fs::write(dir.join(INDEX_FILE), serde_json::to_string_pretty(&index)?)?;
    log::debug!("wrote archive with {} tensors to {}", tensors.len(), dir.display());
    Ok(())
}

pub fn read_index<P: AsRef<Path>>(dir: P) -> Result<ArchiveIndex> {
    let text = fs::read_to_string(dir.as_ref().join(INDEX_FILE))?;
    let index: ArchiveIndex = serde_json::from_str(&text)?;
    if index.archive_version != ARCHIVE_VERSION {
        return Err(FerrogradError::Serialization(format!(
            "unsupported archive version {} (expected {})",
            index.archive_version, ARCHIVE_VERSION
        )));
    }
    Ok(index)
}

/// Reads every tensor listed in the index. Fails if a buffer file does not
/// hold exactly the element count its shape implies.
pub fn read_archive<P: AsRef<Path>>(dir: P) -> Result<Archive> {
    let dir = dir.as_ref();
    let index = read_index(dir)?;
    let mut entries = Vec::with_capacity(index.entries.len());
    for entry in index.entries {
        let bytes = fs::read(dir.join(&entry.file))?;
        let data = HostData::from_le_bytes(entry.dtype, &bytes)?;
        let expected: usize = entry.shape.iter().product();
        if data.len() != expected {
            return Err(FerrogradError::Serialization(format!(
                "'{}' holds {} elements, index shape {:?} needs {}",
                entry.name,
                data.len(),
                entry.shape,
                expected
            )));
        }
        entries.push(ArchiveEntry {
            name: entry.name,
            shape: entry.shape,
            data,
        });
    }
    log::debug!("read archive with {} tensors from {}", entries.len(), dir.display());
    Ok(Archive {
        step: index.step,
        entries,
    })
}
