/// Ripple edits: cascading pushes that keep a track free of overlaps, and
/// left compaction that closes the space a clip leaves behind.
///
/// Planning and applying are separate so a caller can reject an edit before
/// anything is mutated.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ClipId, Gap, Seconds, TimelineError, Track, TrackId, TIME_EPSILON};

/// One clip displaced by a ripple edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipShift {
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub from: Seconds,
    pub to: Seconds,
}

impl ClipShift {
    pub fn delta(&self) -> Seconds {
        self.to - self.from
    }
}

/// Outcome of a mutating edit: every clip that moved besides the edited one,
/// plus the stagger the editor should use to animate them.
///
/// The stagger never influences where clips end up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RippleReport {
    pub shifts: Vec<ClipShift>,
    pub stagger: Duration,
}

impl RippleReport {
    pub fn new(shifts: Vec<ClipShift>, stagger: Duration) -> Self {
        Self { shifts, stagger }
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    pub fn affected_clips(&self) -> Vec<ClipId> {
        self.shifts.iter().map(|shift| shift.clip_id).collect()
    }

    /// When the animation of the `index`-th shift should start.
    pub fn delay_of(&self, index: usize) -> Duration {
        self.stagger * index as u32
    }

    /// Time until the last staggered shift has started.
    pub fn settle_time(&self) -> Duration {
        self.stagger * self.shifts.len() as u32
    }
}

/// Plan the pushes needed to make `[start, end)` free on `track`.
///
/// Every clip ending after `start` is visited in order; a clip that would
/// overlap the running cursor is pushed to the cursor, which then advances to
/// its new end. The cascade stops at the first clip that already fits, since
/// the remaining clips were non-overlapping to begin with. A locked clip in
/// the way makes the placement fail.
pub fn plan_push(
    track: &Track,
    start: Seconds,
    end: Seconds,
    exclude: Option<ClipId>,
) -> Result<Vec<ClipShift>, TimelineError> {
    let mut cursor = end;
    let mut shifts = Vec::new();

    for clip in track
        .clips
        .iter()
        .filter(|clip| Some(clip.id) != exclude && clip.end_time() > start + TIME_EPSILON)
    {
        if clip.start_time >= cursor - TIME_EPSILON {
            break;
        }
        if clip.locked {
            return Err(TimelineError::PlacementConflict {
                track_id: track.id,
                blocking: clip.id,
            });
        }
        shifts.push(ClipShift {
            clip_id: clip.id,
            track_id: track.id,
            from: clip.start_time,
            to: cursor,
        });
        cursor += clip.duration;
    }

    Ok(shifts)
}

/// Plan a left compaction after a clip vacated space.
///
/// Clips starting at or after `from` move left by up to `amount`, but never
/// past the end of the clip before them. `pinned` and locked clips stay put
/// and act as walls.
pub fn plan_compaction(
    track: &Track,
    from: Seconds,
    amount: Seconds,
    pinned: Option<ClipId>,
) -> Vec<ClipShift> {
    let mut cursor: Seconds = 0.0;
    let mut shifts = Vec::new();

    for clip in &track.clips {
        let fixed =
            Some(clip.id) == pinned || clip.locked || clip.start_time < from - TIME_EPSILON;
        if fixed {
            cursor = cursor.max(clip.end_time());
            continue;
        }

        let target = (clip.start_time - amount).max(cursor);
        if target < clip.start_time - TIME_EPSILON {
            shifts.push(ClipShift {
                clip_id: clip.id,
                track_id: track.id,
                from: clip.start_time,
                to: target,
            });
            cursor = target + clip.duration;
        } else {
            cursor = cursor.max(clip.end_time());
        }
    }

    shifts
}

pub fn apply_shifts(track: &mut Track, shifts: &[ClipShift]) {
    let track_id = track.id;
    for shift in shifts.iter().filter(|shift| shift.track_id == track_id) {
        if let Some(clip) = track.clip_mut(shift.clip_id) {
            clip.start_time = shift.to;
        }
    }
    track.sort_clips();
}

/// Gaps between consecutive clips, and optionally before the first clip.
pub fn find_gaps(track: &Track, include_leading: bool) -> Vec<Gap> {
    let mut gaps = Vec::new();

    if include_leading {
        if let Some(first) = track.clips.first() {
            if first.start_time > TIME_EPSILON {
                gaps.push(Gap::new(track.id, 0.0, first.start_time));
            }
        }
    }

    for pair in track.clips.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start_time > prev.end_time() + TIME_EPSILON {
            gaps.push(Gap::new(track.id, prev.end_time(), next.start_time));
        }
    }

    gaps
}

/// Plan closing the gap that contains `time` (edges included).
pub fn plan_close_gap(track: &Track, time: Seconds) -> Result<Vec<ClipShift>, TimelineError> {
    let gap = find_gaps(track, true)
        .into_iter()
        .find(|gap| time >= gap.start - TIME_EPSILON && time <= gap.end + TIME_EPSILON)
        .ok_or_else(|| {
            TimelineError::InvalidOp(format!("no gap at {time}s on track {}", track.id))
        })?;

    Ok(plan_compaction(track, gap.end, gap.duration, None))
}
