use crate::partitioner::Partitioner;
use tracing::debug;

/// Outcome of feeding one encoded partition to a [`RotationTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    /// No destination was open yet.
    Open,
    /// Keep writing to the current destination.
    Continue,
    /// Close the destination of `previous` and open a new one.
    Rotate { previous: String },
}

impl Rotation {
    /// Whether a new destination has to be opened.
    pub fn opens_destination(&self) -> bool {
        !matches!(self, Rotation::Continue)
    }
}

/// Writer side bookkeeping of the currently open destination.
///
/// Records must be observed in arrival order. "No destination open" is its
/// own state and is never passed to the partitioner.
pub struct RotationTracker<'a, P: Partitioner + ?Sized> {
    partitioner: &'a P,
    current: Option<String>,
}

impl<'a, P: Partitioner + ?Sized> RotationTracker<'a, P> {
    pub fn new(partitioner: &'a P) -> Self {
        RotationTracker {
            partitioner,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn observe(&mut self, encoded_partition: &str) -> Rotation {
        let rotation = match self.current.as_deref() {
            None => Rotation::Open,
            Some(current) => {
                if self
                    .partitioner
                    .should_rotate_partition(encoded_partition, current)
                {
                    Rotation::Rotate {
                        previous: current.to_string(),
                    }
                } else {
                    Rotation::Continue
                }
            }
        };

        if rotation.opens_destination() {
            debug!(partition = encoded_partition, ?rotation, "rotating partition");
            self.current = Some(encoded_partition.to_string());
        }
        rotation
    }

    /// Forgets the open destination, e.g. after the writer closed it.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
