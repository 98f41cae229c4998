use crate::Error;

/// Geometric batches stop doubling once an increment reaches this many
/// objects; later replenishments reuse the last increment unchanged.
const GEOMETRIC_CAP: usize = 32;

/// Decides how many objects the next replenishment constructs.
///
/// Built from the configured growth value `g != 0`:
///
/// - `g > 0`: every batch is exactly `g` ("fixed increment").
/// - `g < 0`: the first batch is `|g|`; each following batch doubles the
///   previous one until an increment reaches [`GEOMETRIC_CAP`], after which
///   the increment stays constant. Growth `-1` therefore yields batches
///   `1, 2, 4, 8, 16, 32, 32, ...` and growth `-3` yields
///   `3, 6, 12, 24, 48, 48, ...`.
///
/// State is advanced only by [`next_batch`](GrowthPolicy::next_batch);
/// exact-size growth bypasses the policy entirely.
#[derive(Debug)]
pub(crate) struct GrowthPolicy {
    /// Batch size of the next replenishment.
    batch: usize,
    /// Whether the batch doubles after each replenishment.
    geometric: bool,
}

impl GrowthPolicy {
    pub(crate) fn new(growth: i32) -> Result<Self, Error> {
        if growth == 0 {
            return Err(Error::ZeroGrowth);
        }
        Ok(Self {
            batch: growth.unsigned_abs() as usize,
            geometric: growth < 0,
        })
    }

    /// Size of the next batch, advancing geometric state.
    pub(crate) fn next_batch(&mut self) -> usize {
        let batch = self.batch;
        if self.geometric && batch < GEOMETRIC_CAP {
            self.batch = batch * 2;
        }
        batch
    }
}
