// ABOUTME: Ordered multi-volume mounting as a single transaction.
// ABOUTME: Rolls back the mounted prefix on failure and tears down in reverse order.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::MountError;
use crate::mountpoint::{MountSpec, Mounter};

enum Phase {
    Pending(usize),
    RollingBack(MountError),
    Failed(MountError),
    Committed,
}

/// Mounts and unmounts lists of volumes strictly in sequence.
///
/// List order is dependency order: a later target may live inside an earlier
/// one. Overlapping transactions on the same targets must not run concurrently.
pub struct MountSet<M> {
    mounter: M,
}

impl<M: Mounter> MountSet<M> {
    pub fn new(mounter: M) -> Self {
        Self { mounter }
    }

    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    /// Mounts `specs` in order.
    ///
    /// On success returns every target, in mount order; tearing them down
    /// afterwards is the caller's job. On the first failure the targets
    /// mounted so far are unmounted in reverse order and the original mount
    /// error is returned, whatever the rollback outcome.
    pub fn mount_all(&self, specs: &[MountSpec]) -> Result<Vec<PathBuf>, MountError> {
        let mut mounted: Vec<PathBuf> = Vec::with_capacity(specs.len());
        let mut phase = Phase::Pending(0);

        loop {
            phase = match phase {
                Phase::Pending(index) => match specs.get(index) {
                    None => Phase::Committed,
                    Some(spec) => {
                        debug!(index, target = %spec.target().display(), "mounting");
                        match self.mounter.mount(spec) {
                            Ok(()) => {
                                mounted.push(spec.target().to_path_buf());
                                Phase::Pending(index + 1)
                            }
                            Err(e) => {
                                warn!(
                                    index,
                                    target = %spec.target().display(),
                                    error = %e,
                                    rollback = mounted.len(),
                                    "mount transaction failed, rolling back"
                                );
                                Phase::RollingBack(e)
                            }
                        }
                    }
                },
                Phase::RollingBack(e) => {
                    if let Err(rollback) = self.unmount_all(&mounted) {
                        warn!(error = %rollback, "rollback incomplete");
                    }
                    Phase::Failed(e)
                }
                Phase::Failed(e) => return Err(e),
                Phase::Committed => {
                    info!(count = mounted.len(), "all volumes mounted");
                    return Ok(mounted);
                }
            };
        }
    }

    /// Attempts every target, last first; fails with [`MountError::Teardown`] if any failed.
    pub fn unmount_all<P: AsRef<Path>>(&self, targets: &[P]) -> Result<(), MountError> {
        let mut failed = 0;

        for target in targets.iter().rev() {
            if self.mounter.unmount(target.as_ref()).is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            warn!(failed, total = targets.len(), "some volumes could not be unmounted");
            return Err(MountError::Teardown {
                failed,
                total: targets.len(),
            });
        }

        Ok(())
    }
}
