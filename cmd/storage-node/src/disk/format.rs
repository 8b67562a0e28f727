use serde::{Deserialize, Serialize};

use super::DiskError;

/// Size of the on-disk record; the encoded descriptor is zero padded to it.
pub const FORMAT_RECORD_SIZE: usize = 512;
const FORMAT_MAGIC: u64 = 0x4157_534F_4D45_4653; // "AWSOMEFS"
const FORMAT_VERSION: u32 = 1;

/// Per-disk format descriptor written once when a disk set is formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub magic: u64,
    pub version: u32,
    pub deployment_id: [u8; 16],
    /// Id of the disk holding this record.
    pub disk_id: [u8; 16],
    /// Ids of every disk of the set, in configured order.
    pub disks: Vec<[u8; 16]>,
}

impl FormatDescriptor {
    pub fn new(deployment_id: uuid::Uuid, disk_id: uuid::Uuid, disks: &[uuid::Uuid]) -> Self {
        Self {
            magic: FORMAT_MAGIC,
            version: FORMAT_VERSION,
            deployment_id: *deployment_id.as_bytes(),
            disk_id: *disk_id.as_bytes(),
            disks: disks.iter().map(|id| *id.as_bytes()).collect(),
        }
    }

    pub fn deployment_id(&self) -> uuid::Uuid {
        uuid::Uuid::from_bytes(self.deployment_id)
    }

    pub fn disk_id(&self) -> uuid::Uuid {
        uuid::Uuid::from_bytes(self.disk_id)
    }

    /// Position of this disk within the set, if the record is consistent.
    pub fn disk_index(&self) -> Option<usize> {
        self.disks.iter().position(|id| *id == self.disk_id)
    }

    /// An all-zero record is a blank disk; anything else must decode cleanly.
    pub fn decode(buf: &[u8]) -> Result<Self, DiskError> {
        if buf.iter().all(|b| *b == 0) {
            return Err(DiskError::UnformattedDisk);
        }
        if buf.len() != FORMAT_RECORD_SIZE {
            return Err(DiskError::corrupted(format!(
                "format record is {} bytes, expected {}",
                buf.len(),
                FORMAT_RECORD_SIZE
            )));
        }
        let format: FormatDescriptor =
            bincode::deserialize(buf).map_err(|e| DiskError::corrupted(e.to_string()))?;
        if format.magic != FORMAT_MAGIC {
            return Err(DiskError::corrupted("invalid magic number"));
        }
        if format.version != FORMAT_VERSION {
            return Err(DiskError::corrupted(format!(
                "unsupported format version {}",
                format.version
            )));
        }
        Ok(format)
    }

    pub fn encode(&self) -> Result<Vec<u8>, DiskError> {
        let buf = bincode::serialize(self)
            .map_err(|e| DiskError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        if buf.len() > FORMAT_RECORD_SIZE {
            return Err(DiskError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("format record of {} bytes does not fit", buf.len()),
            )));
        }
        let mut padded = vec![0u8; FORMAT_RECORD_SIZE];
        padded[..buf.len()].copy_from_slice(&buf);
        Ok(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(disks: usize) -> FormatDescriptor {
        let ids: Vec<uuid::Uuid> = (0..disks).map(|_| uuid::Uuid::new_v4()).collect();
        FormatDescriptor::new(uuid::Uuid::new_v4(), ids[1], &ids)
    }

    #[test]
    fn encoded_record_is_padded_and_decodes() {
        let format = descriptor(16);
        let record = format.encode().unwrap();
        assert_eq!(record.len(), FORMAT_RECORD_SIZE);
        let decoded = FormatDescriptor::decode(&record).unwrap();
        assert_eq!(decoded, format);
        assert_eq!(decoded.disk_index(), Some(1));
    }

    #[test]
    fn zeroed_or_empty_record_is_unformatted() {
        assert!(matches!(
            FormatDescriptor::decode(&[0u8; FORMAT_RECORD_SIZE]),
            Err(DiskError::UnformattedDisk)
        ));
        assert!(matches!(
            FormatDescriptor::decode(&[]),
            Err(DiskError::UnformattedDisk)
        ));
    }

    #[test]
    fn damaged_records_are_corrupted() {
        let mut wrong_magic = descriptor(4).encode().unwrap();
        wrong_magic[0] ^= 0xff;
        assert!(matches!(
            FormatDescriptor::decode(&wrong_magic),
            Err(DiskError::CorruptedFormat { .. })
        ));

        let truncated = descriptor(4).encode().unwrap();
        assert!(matches!(
            FormatDescriptor::decode(&truncated[..100]),
            Err(DiskError::CorruptedFormat { .. })
        ));

        let mut future = descriptor(4);
        future.version = FORMAT_VERSION + 1;
        let record = future.encode().unwrap();
        assert!(matches!(
            FormatDescriptor::decode(&record),
            Err(DiskError::CorruptedFormat { .. })
        ));
    }
}
