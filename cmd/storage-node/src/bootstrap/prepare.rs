use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;

use super::decision::{quorum, BootstrapAction};
use super::status::{DiskStatus, DiskTally};
use crate::disk::{DiskError, DiskSet, FormatDescriptor};

const MIN_ERASURE_DISKS: usize = 4;
const MAX_ERASURE_DISKS: usize = 16;
/// Floor of the wait between probe rounds, whatever the configuration says.
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("corrupted backend format: {corrupted} of {total} disks corrupted, quorum is {quorum}")]
    CorruptedFormat {
        corrupted: usize,
        total: usize,
        quorum: usize,
    },
    #[error("invalid number of disks {count}: need an even count between 4 and 16")]
    InsufficientDisks { count: usize },
    #[error("formatting disks failed: {0}")]
    Format(#[source] DiskError),
    #[error("bootstrap cancelled")]
    Cancelled,
}

/// Wait between probe rounds. The first round runs at once; later waits
/// double from `initial` up to `max`, never below [`MIN_PROBE_INTERVAL`].
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffConfig {
    pub fn next(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .max(self.initial)
            .min(self.max)
            .max(MIN_PROBE_INTERVAL)
    }
}

/// Forces a waiting bootstrap loop to probe again right away, e.g. after an
/// operator healed the disks. A wake sent while the loop is busy probing is
/// kept for its next wait.
#[derive(Debug, Clone, Default)]
pub struct HealNotifier {
    notify: Arc<Notify>,
}

impl HealNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wake(&self) {
        self.notify.notify_one();
    }
}

/// Outcome of probing every disk once.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub statuses: Vec<(String, DiskStatus)>,
    pub tally: DiskTally,
}

impl ProbeReport {
    fn endpoints_with(&self, wanted: impl Fn(DiskStatus) -> bool) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, status)| wanted(*status))
            .map(|(endpoint, _)| endpoint.as_str())
            .collect()
    }
}

pub async fn probe_disks(disks: &DiskSet) -> ProbeReport {
    let mut statuses = Vec::with_capacity(disks.len());
    for (index, disk) in disks.iter().enumerate() {
        let (endpoint, status) = match disk {
            Some(disk) => {
                let outcome = disk.load_format().await;
                if let Err(DiskError::Io(e)) = &outcome {
                    tracing::warn!("Probing {} failed: {}", disk.endpoint(), e);
                }
                (disk.endpoint().to_string(), DiskStatus::of(&outcome))
            }
            // Ignored disks count as offline.
            None => (format!("<ignored disk {}>", index), DiskStatus::Offline),
        };
        statuses.push((endpoint, status));
    }
    let tally = DiskTally::classify(statuses.iter().map(|(_, status)| *status));
    ProbeReport { statuses, tally }
}

/// Writes a fresh format descriptor to every present disk of the set.
pub async fn format_disks(disks: &DiskSet) -> Result<(), DiskError> {
    let deployment_id = uuid::Uuid::new_v4();
    let disk_ids: Vec<uuid::Uuid> = disks.iter().map(|_| uuid::Uuid::new_v4()).collect();

    for (disk, disk_id) in disks.iter().zip(&disk_ids) {
        let Some(disk) = disk else { continue };
        let format = FormatDescriptor::new(deployment_id, *disk_id, &disk_ids);
        disk.save_format(&format).await?;
    }
    tracing::info!(
        "Formatted {} disks for deployment {}",
        disks.iter().flatten().count(),
        deployment_id
    );
    Ok(())
}

pub fn check_sufficient_disks(count: usize) -> Result<(), BootstrapError> {
    if !(MIN_ERASURE_DISKS..=MAX_ERASURE_DISKS).contains(&count) || count % 2 != 0 {
        return Err(BootstrapError::InsufficientDisks { count });
    }
    Ok(())
}

enum Wakeup {
    Elapsed,
    Notified,
    Shutdown,
}

/// Probes the disk set until the decision engine settles on a terminal
/// action. Non-terminal actions just loop with a growing backoff.
pub struct BootstrapLoop {
    disks: DiskSet,
    first_disk_local: bool,
    backoff: BackoffConfig,
    notifier: HealNotifier,
}

impl BootstrapLoop {
    pub fn new(disks: DiskSet, first_disk_local: bool) -> Self {
        Self {
            disks,
            first_disk_local,
            backoff: BackoffConfig::default(),
            notifier: HealNotifier::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_notifier(mut self, notifier: HealNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn notifier(&self) -> HealNotifier {
        self.notifier.clone()
    }

    pub async fn run(self) -> Result<DiskSet, BootstrapError> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but gives up with
    /// [`BootstrapError::Cancelled`] once `shutdown` resolves during a wait.
    pub async fn run_until<F>(self, shutdown: F) -> Result<DiskSet, BootstrapError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut backoff = Duration::ZERO;

        loop {
            let wakeup = tokio::select! {
                _ = tokio::time::sleep(backoff) => Wakeup::Elapsed,
                _ = self.notifier.notify.notified() => Wakeup::Notified,
                _ = &mut shutdown => Wakeup::Shutdown,
            };

            match wakeup {
                Wakeup::Shutdown => return Err(BootstrapError::Cancelled),
                Wakeup::Notified => {
                    tracing::info!("Heal notification received, probing disks again");
                    backoff = Duration::ZERO;
                }
                Wakeup::Elapsed => {
                    let report = probe_disks(&self.disks).await;
                    let tally = report.tally;
                    let action = tally.decide(self.first_disk_local);
                    tracing::info!(
                        "Disks: {} formatted, {} unformatted, {} corrupted, {} offline, {} unrecognized of {} -> {:?}",
                        tally.formatted,
                        tally.unformatted,
                        tally.corrupted,
                        tally.offline,
                        tally.unrecognized,
                        tally.total,
                        action
                    );

                    match action {
                        BootstrapAction::Abort => {
                            tracing::error!(
                                "Corrupted disks {:?} leave too few good disks to recover the format",
                                report.endpoints_with(|s| s == DiskStatus::Corrupted)
                            );
                            return Err(BootstrapError::CorruptedFormat {
                                corrupted: tally.corrupted,
                                total: tally.total,
                                quorum: quorum(tally.total),
                            });
                        }
                        BootstrapAction::FormatDisks => {
                            format_disks(&self.disks)
                                .await
                                .map_err(BootstrapError::Format)?;
                            return Ok(self.disks);
                        }
                        BootstrapAction::InitObjectLayer => {
                            if tally.needs_heal() {
                                tracing::warn!(
                                    "Disks {:?} need healing; serving with the formatted quorum",
                                    report.endpoints_with(|s| {
                                        s != DiskStatus::Formatted && s != DiskStatus::Offline
                                    })
                                );
                            }
                            return Ok(self.disks);
                        }
                        BootstrapAction::WaitForFormatting => {
                            tracing::info!("Waiting for the first disk's node to format the cluster")
                        }
                        BootstrapAction::WaitForAll
                        | BootstrapAction::WaitForQuorum
                        | BootstrapAction::WaitForHeal => {}
                    }
                    backoff = self.backoff.next(backoff);
                    tracing::debug!("Next disk probe in {:?}", backoff);
                }
            }
        }
    }
}

/// Brings the disk set to a servable state.
///
/// A single disk is used as-is. Larger sets must pass the disk-count check
/// and then go through the [`BootstrapLoop`].
pub async fn prepare_storage<F>(
    disks: DiskSet,
    first_disk_local: bool,
    backoff: BackoffConfig,
    notifier: HealNotifier,
    shutdown: F,
) -> Result<DiskSet, BootstrapError>
where
    F: Future<Output = ()>,
{
    if disks.len() == 1 {
        return Ok(disks);
    }
    check_sufficient_disks(disks.len())?;

    BootstrapLoop::new(disks, first_disk_local)
        .with_backoff(backoff)
        .with_notifier(notifier)
        .run_until(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_starts_at_initial_and_doubles_to_max() {
        let backoff = BackoffConfig {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        let mut delay = Duration::ZERO;
        let mut seen = Vec::new();
        for _ in 0..4 {
            delay = backoff.next(delay);
            seen.push(delay.as_millis());
        }
        assert_eq!(seen, vec![100, 200, 350, 350]);
    }

    #[test]
    fn zero_backoff_still_waits_between_rounds() {
        let backoff = BackoffConfig {
            initial: Duration::ZERO,
            max: Duration::ZERO,
        };
        let mut delay = Duration::ZERO;
        for _ in 0..3 {
            delay = backoff.next(delay);
            assert_eq!(delay, MIN_PROBE_INTERVAL);
        }
    }

    #[test]
    fn disk_count_must_be_even_between_four_and_sixteen() {
        for ok in [4, 6, 8, 16] {
            assert!(check_sufficient_disks(ok).is_ok());
        }
        for bad in [0, 2, 3, 5, 15, 17, 18] {
            assert!(matches!(
                check_sufficient_disks(bad),
                Err(BootstrapError::InsufficientDisks { count }) if count == bad
            ));
        }
    }
}
