/// Magnetic snapping: candidate alignment points and nearest-point resolution.
use beats::Beat;

use crate::{ClipId, RippleConfig, Seconds, Timeline, ZoneCollection, TIME_EPSILON};

/// Snap `candidate` to the nearest point within `threshold`.
///
/// Equidistant points resolve to the earlier one. Without a qualifying point
/// the candidate comes back unchanged.
pub fn resolve(candidate: Seconds, points: &[Seconds], threshold: Seconds) -> Seconds {
    nearest(candidate, points, threshold)
        .map(|(point, _)| point)
        .unwrap_or(candidate)
}

fn nearest(candidate: Seconds, points: &[Seconds], threshold: Seconds) -> Option<(Seconds, Seconds)> {
    let mut best: Option<(Seconds, Seconds)> = None;

    for &point in points {
        let distance = (candidate - point).abs();
        if distance > threshold + TIME_EPSILON {
            continue;
        }
        best = match best {
            Some((best_point, best_distance))
                if distance > best_distance + TIME_EPSILON
                    || ((distance - best_distance).abs() <= TIME_EPSILON
                        && point >= best_point) =>
            {
                Some((best_point, best_distance))
            }
            _ => Some((point, distance)),
        };
    }

    best
}

/// Snap a clip by whichever edge lands closer to a point; returns the new
/// start time. Start-edge snaps win ties.
pub fn resolve_edges(
    start: Seconds,
    duration: Seconds,
    points: &[Seconds],
    threshold: Seconds,
) -> Seconds {
    let by_start = nearest(start, points, threshold);
    let by_end = nearest(start + duration, points, threshold);

    match (by_start, by_end) {
        (Some((point, _)), None) => point,
        (None, Some((point, _))) => point - duration,
        (Some((start_point, start_distance)), Some((end_point, end_distance))) => {
            if end_distance + TIME_EPSILON < start_distance {
                end_point - duration
            } else {
                start_point
            }
        }
        (None, None) => start,
    }
}

/// Every snap target of the timeline, sorted and deduplicated.
///
/// Always contains `0` and the timeline duration, plus clip edges (except
/// those of `exclude`, the clip being dragged), zone edges, and beat times
/// when beat snapping is on.
pub fn collect_snap_points(
    timeline: &Timeline,
    zones: &ZoneCollection,
    beats: &[Beat],
    config: &RippleConfig,
    exclude: Option<ClipId>,
) -> Vec<Seconds> {
    let mut points = vec![0.0, timeline.duration];

    for clip in timeline.clips().filter(|clip| Some(clip.id) != exclude) {
        points.push(clip.start_time);
        points.push(clip.end_time());
    }

    points.extend(zones.boundaries());

    if config.snap_to_beat {
        points.extend(beats.iter().map(|beat| beat.time));
    }

    points.retain(|point| point.is_finite());
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup_by(|a, b| (*a - *b).abs() <= TIME_EPSILON);
    points
}
