use crate::disk::{DiskError, FormatDescriptor};

/// Category of one disk's probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiskStatus {
    Formatted,
    Offline,
    Unformatted,
    Corrupted,
    /// Failed with an error none of the categories covers.
    Unrecognized,
}

impl DiskStatus {
    pub fn of(outcome: &Result<FormatDescriptor, DiskError>) -> Self {
        match outcome {
            Ok(_) => DiskStatus::Formatted,
            Err(DiskError::DiskNotFound) => DiskStatus::Offline,
            Err(DiskError::UnformattedDisk) => DiskStatus::Unformatted,
            Err(DiskError::CorruptedFormat { .. }) => DiskStatus::Corrupted,
            Err(DiskError::Io(_)) => DiskStatus::Unrecognized,
        }
    }
}

/// Per-category counts for one probe round.
///
/// `unrecognized` disks fall in no category, so the four named counts may
/// sum to less than `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskTally {
    pub total: usize,
    pub offline: usize,
    pub unformatted: usize,
    pub corrupted: usize,
    pub formatted: usize,
    pub unrecognized: usize,
}

impl DiskTally {
    pub fn classify<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = DiskStatus>,
    {
        statuses
            .into_iter()
            .fold(DiskTally::default(), |mut tally, status| {
                tally.total += 1;
                match status {
                    DiskStatus::Formatted => tally.formatted += 1,
                    DiskStatus::Offline => tally.offline += 1,
                    DiskStatus::Unformatted => tally.unformatted += 1,
                    DiskStatus::Corrupted => tally.corrupted += 1,
                    DiskStatus::Unrecognized => tally.unrecognized += 1,
                }
                tally
            })
    }

    /// Disks that landed in one of the four named categories.
    pub fn accounted(&self) -> usize {
        self.offline + self.unformatted + self.corrupted + self.formatted
    }
}
