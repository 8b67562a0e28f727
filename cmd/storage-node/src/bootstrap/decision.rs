//! What a node should do next, given the status counts of its disk set.
//!
//! | Online | Format status                          | Action                     |
//! |--------|----------------------------------------|----------------------------|
//! | All    | all or quorum formatted                | init object layer          |
//! | All    | quorum formatted, some not             | warn to heal, init         |
//! | All    | none formatted                         | format (first node only)   |
//! | Quorum | quorum unformatted                     | wait for the rest          |
//! | None   | -                                      | wait for quorum            |

use super::status::DiskTally;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapAction {
    FormatDisks,
    WaitForHeal,
    WaitForQuorum,
    WaitForAll,
    WaitForFormatting,
    InitObjectLayer,
    Abort,
}

impl BootstrapAction {
    /// Actions after which the bootstrap loop stops probing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BootstrapAction::FormatDisks | BootstrapAction::InitObjectLayer | BootstrapAction::Abort
        )
    }
}

pub fn quorum(total_disks: usize) -> usize {
    total_disks / 2 + 1
}

/// First matching rule wins. The comparisons are deliberately uneven
/// (`>=` for unformatted and corrupted, strict `>` for formatted and
/// offline); changing any of them changes behavior at some disk-count parity.
pub fn decide(
    total_disks: usize,
    offline: usize,
    unformatted: usize,
    corrupted: usize,
    formatted: usize,
    first_disk_local: bool,
) -> BootstrapAction {
    let quorum = quorum(total_disks);

    // Blank cluster: only the owner of the first disk formats, so two nodes
    // never race to write different deployments.
    if unformatted == total_disks {
        return if first_disk_local {
            BootstrapAction::FormatDisks
        } else {
            BootstrapAction::WaitForFormatting
        };
    }
    if unformatted >= quorum && unformatted + offline == total_disks {
        return BootstrapAction::WaitForAll;
    }

    if formatted == total_disks {
        return BootstrapAction::InitObjectLayer;
    }
    if formatted > quorum && formatted + offline == total_disks {
        return BootstrapAction::InitObjectLayer;
    }
    // Some disks are neither formatted nor offline and need healing.
    if formatted > quorum {
        return BootstrapAction::InitObjectLayer;
    }

    if offline > quorum {
        return BootstrapAction::WaitForQuorum;
    }

    // Not enough good disks left to rebuild the format.
    if corrupted >= quorum {
        return BootstrapAction::Abort;
    }

    BootstrapAction::WaitForHeal
}

impl DiskTally {
    pub fn decide(&self, first_disk_local: bool) -> BootstrapAction {
        decide(
            self.total,
            self.offline,
            self.unformatted,
            self.corrupted,
            self.formatted,
            first_disk_local,
        )
    }

    /// Quorum is formatted but some disks are neither formatted nor offline.
    pub fn needs_heal(&self) -> bool {
        self.formatted > quorum(self.total) && self.formatted + self.offline < self.total
    }
}
