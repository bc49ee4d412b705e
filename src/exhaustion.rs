use crate::model::user::UserRecord;

/// Decides from a freshly fetched batch whether the source has run dry.
///
/// The user source has no authoritative end marker, so this is a judgement
/// call and is left pluggable. Any `Fn(&[UserRecord], usize) -> bool` works.
pub trait PageExhaustion: Send + Sync {
    fn is_exhausted(&self, batch: &[UserRecord], requested: usize) -> bool;
}

/// A batch shorter than what was asked for means there is nothing after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortBatch;

impl PageExhaustion for ShortBatch {
    fn is_exhausted(&self, batch: &[UserRecord], requested: usize) -> bool {
        batch.len() < requested
    }
}

impl<F> PageExhaustion for F
where
    F: Fn(&[UserRecord], usize) -> bool + Send + Sync,
{
    fn is_exhausted(&self, batch: &[UserRecord], requested: usize) -> bool {
        self(batch, requested)
    }
}
