//! The lazy catch-up walker.
//!
//! Advances an aggregate point from its last checkpoint to a target instant
//! in clock-unit steps, applying the scheduled slope delta at each boundary
//! it crosses. One function serves every caller: the global trace, any
//! delegatee trace, mutating calls (which persist the intermediate boundary
//! checkpoints) and pure historical reads (which keep the walk in locals).
//!
//! The final checkpoint at exactly the target is *not* persisted here; the
//! caller pushes it after folding in whatever instantaneous adjustment the
//! mutation calls for.

use velock_core::constants::{round_to_unit, CLOCK_UNIT, MAX_CATCH_UP_STEPS};
use velock_core::trace::Trace;
use velock_core::types::{Point, Timestamp};

use crate::schedule::SlopeSchedule;

/// Walk `point` (recorded at `start_ts`) forward to `target`.
///
/// Returns the point decayed to `target` with every scheduled delta in
/// `(start_ts, target]` applied. When `sink` is given, each crossed
/// clock-unit boundary is persisted as an intermediate checkpoint.
///
/// Iterations are capped at [`MAX_CATCH_UP_STEPS`]. The cap can only bite
/// after an idle gap longer than the maximum lock horizon, by which time
/// every delta in the window has been applied and the point has fully
/// decayed, so stopping early loses nothing; any residue is picked up by
/// the next call.
pub(crate) fn catch_up(
    start_ts: Timestamp,
    point: Point,
    target: Timestamp,
    schedule: &SlopeSchedule,
    mut sink: Option<&mut Trace<Point>>,
) -> Point {
    let mut point = point;
    let mut last_ts = start_ts;
    if target <= start_ts {
        return point;
    }

    let mut step_ts = round_to_unit(start_ts);
    for _ in 0..MAX_CATCH_UP_STEPS {
        step_ts += CLOCK_UNIT;
        let mut delta = 0i128;
        if step_ts > target {
            step_ts = target;
        } else {
            delta = schedule.delta_at(step_ts);
        }
        point.bias -= point.slope * (step_ts - last_ts) as i128;
        point.slope += delta;
        if point.bias < 0 {
            point.bias = 0;
        }
        if point.slope < 0 {
            point.slope = 0;
        }
        last_ts = step_ts;
        if step_ts == target {
            break;
        }
        if let Some(trace) = sink.as_deref_mut() {
            trace.push(step_ts, point);
        }
    }
    point
}
