use beats::Beat;
use tracing::debug;

use crate::ripple::{self, ClipShift, RippleReport};
use crate::{
    snap, Clip, ClipId, ConfigUpdate, EditHistory, Gap, MagneticZone, Result, RippleConfig,
    Seconds, Snapshot, Timeline, TimelineDocument, TimelineError, Track, TrackId, TrackKind,
    ZoneCollection, ZoneId, DOCUMENT_VERSION,
};

/// Partial update of a track's display flags; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackFlags {
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub muted: Option<bool>,
}

/// Owns one editing session: the arrangement, magnetic zones, detected beats,
/// the ripple configuration and the undo history.
///
/// Every mutating edit either succeeds completely and pushes one history
/// entry, or fails and leaves the store untouched.
#[derive(Debug, Clone)]
pub struct TimelineStore {
    timeline: Timeline,
    zones: ZoneCollection,
    config: RippleConfig,
    beats: Vec<Beat>,
    history: EditHistory,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TimelineStore {
    pub fn new(duration: Seconds) -> Self {
        Self::with_config(duration, RippleConfig::default())
    }

    pub fn with_config(duration: Seconds, config: RippleConfig) -> Self {
        Self {
            timeline: Timeline::new(duration),
            zones: ZoneCollection::new(),
            config,
            beats: Vec::new(),
            history: EditHistory::default(),
        }
    }

    pub fn from_document(document: TimelineDocument) -> Result<Self> {
        document.validate()?;

        let mut timeline = Timeline::new(document.duration);
        timeline.zoom = document.zoom;
        timeline.playhead = document.playhead;
        timeline.tracks = document.tracks;
        for track in &mut timeline.tracks {
            track.sort_clips();
        }
        timeline.fit_to_content();

        Ok(Self {
            timeline,
            zones: ZoneCollection::from_zones(document.magnetic_zones),
            config: document.config,
            beats: Vec::new(),
            history: EditHistory::default(),
        })
    }

    pub fn to_document(&self) -> TimelineDocument {
        TimelineDocument {
            version: DOCUMENT_VERSION,
            duration: self.timeline.duration,
            zoom: self.timeline.zoom,
            playhead: self.timeline.playhead,
            tracks: self.timeline.tracks.clone(),
            magnetic_zones: self.zones.to_vec(),
            config: self.config.clone(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_document(TimelineDocument::from_json(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_document().to_json()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn tracks(&self) -> &[Track] {
        &self.timeline.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.timeline.track(id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.timeline.clip(id)
    }

    pub fn zones(&self) -> &ZoneCollection {
        &self.zones
    }

    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn duration(&self) -> Seconds {
        self.timeline.duration
    }

    pub fn playhead(&self) -> Seconds {
        self.timeline.playhead
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Move the playhead, clamped into `[0, duration]`.
    pub fn set_playhead(&mut self, time: Seconds) -> Seconds {
        let time = if time.is_finite() { time } else { 0.0 };
        self.timeline.playhead = time.clamp(0.0, self.timeline.duration);
        self.timeline.playhead
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<()> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(TimelineError::InvalidOp(format!("zoom {zoom} must be positive")));
        }
        self.timeline.zoom = zoom;
        Ok(())
    }

    pub fn toggle_auto_ripple(&mut self) -> bool {
        self.config.auto_ripple = !self.config.auto_ripple;
        self.config.auto_ripple
    }

    pub fn toggle_gap_closing(&mut self) -> bool {
        self.config.gap_closing = !self.config.gap_closing;
        self.config.gap_closing
    }

    pub fn toggle_snap_to_beat(&mut self) -> bool {
        self.config.snap_to_beat = !self.config.snap_to_beat;
        self.config.snap_to_beat
    }

    pub fn update_config(&mut self, update: &ConfigUpdate) -> &RippleConfig {
        update.apply(&mut self.config);
        debug!(config = ?self.config, "ripple config updated");
        &self.config
    }

    /// Replace the beat set used for beat snapping.
    pub fn set_beats(&mut self, beats: Vec<Beat>) {
        debug!(count = beats.len(), "beat set replaced");
        self.beats = beats;
    }

    pub fn get_snap_points(&self, exclude: Option<ClipId>) -> Vec<Seconds> {
        snap::collect_snap_points(&self.timeline, &self.zones, &self.beats, &self.config, exclude)
    }

    /// Snap a free time, e.g. a playhead scrub or a marker drop.
    pub fn snap_time(&self, time: Seconds, exclude: Option<ClipId>) -> Seconds {
        let points = self.get_snap_points(exclude);
        snap::resolve(time, &points, self.config.snap_threshold_seconds())
    }

    /// Preview where a dragged clip would land if snapped by either edge.
    pub fn snap_clip_edges(&self, clip_id: ClipId, start: Seconds) -> Result<Seconds> {
        let clip = self
            .timeline
            .clip(clip_id)
            .ok_or(TimelineError::ClipNotFound(clip_id))?;
        let points = self.get_snap_points(Some(clip_id));
        let snapped = snap::resolve_edges(
            start,
            clip.duration,
            &points,
            self.config.snap_threshold_seconds(),
        );
        Ok(snapped.max(0.0))
    }

    pub fn get_gaps(&self) -> Vec<Gap> {
        self.get_gaps_with(false)
    }

    pub fn get_gaps_with(&self, include_leading: bool) -> Vec<Gap> {
        self.timeline
            .tracks
            .iter()
            .flat_map(|track| ripple::find_gaps(track, include_leading))
            .collect()
    }

    pub fn add_track(&mut self, kind: TrackKind) -> TrackId {
        let track = Track::new(kind);
        let id = track.id;
        let mut tracks = self.timeline.tracks.clone();
        tracks.push(track);
        self.commit(tracks);
        debug!(track = %id, ?kind, "track added");
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Result<Track> {
        let index = self.track_index(id)?;
        if self.timeline.tracks[index].locked {
            return Err(TimelineError::Locked(format!("track {id}")));
        }
        let mut tracks = self.timeline.tracks.clone();
        let removed = tracks.remove(index);
        self.commit(tracks);
        debug!(track = %id, clips = removed.clips.len(), "track removed");
        Ok(removed)
    }

    pub fn set_track_flags(&mut self, id: TrackId, flags: TrackFlags) -> Result<()> {
        let index = self.track_index(id)?;
        let mut tracks = self.timeline.tracks.clone();
        let track = &mut tracks[index];
        if let Some(visible) = flags.visible {
            track.visible = visible;
        }
        if let Some(locked) = flags.locked {
            track.locked = locked;
        }
        if let Some(muted) = flags.muted {
            track.muted = muted;
        }
        self.commit(tracks);
        Ok(())
    }

    pub fn set_track_volume(&mut self, id: TrackId, volume: f32) -> Result<()> {
        let index = self.track_index(id)?;
        if !volume.is_finite() || volume < 0.0 {
            return Err(TimelineError::InvalidOp(format!("volume {volume} is not valid")));
        }
        let mut tracks = self.timeline.tracks.clone();
        tracks[index].volume = volume;
        self.commit(tracks);
        Ok(())
    }

    pub fn set_clip_locked(&mut self, clip_id: ClipId, locked: bool) -> Result<()> {
        let index = self.clip_track_index(clip_id)?;
        let mut tracks = self.timeline.tracks.clone();
        if let Some(clip) = tracks[index].clip_mut(clip_id) {
            clip.locked = locked;
        }
        self.commit(tracks);
        Ok(())
    }

    /// Place a new clip at `start` (snapped), rippling or rejecting overlaps
    /// per the current configuration.
    pub fn insert_clip(
        &mut self,
        track_id: TrackId,
        start: Seconds,
        duration: Seconds,
        content_ref: impl Into<String>,
    ) -> Result<(ClipId, RippleReport)> {
        validate_duration(duration)?;
        let index = self.track_index(track_id)?;
        self.ensure_track_unlocked(index)?;

        let start = self.snap_start(start, None);
        let mut tracks = self.timeline.tracks.clone();
        let shifts = self.make_room(&tracks[index], start, start + duration)?;
        ripple::apply_shifts(&mut tracks[index], &shifts);

        let clip = Clip::new(track_id, start, duration, content_ref);
        let id = clip.id;
        tracks[index].insert_clip(clip);

        let report = self.report(shifts);
        self.commit(tracks);
        debug!(clip = %id, track = %track_id, start, shifted = report.shifts.len(), "clip inserted");
        Ok((id, report))
    }

    /// Move a clip to `target_time` on `target_track`.
    ///
    /// The time is snapped against every snap point except the clip's own
    /// edges and clamped at zero. Overlaps on the destination are pushed right
    /// under auto-ripple and rejected otherwise; with gap closing the source
    /// track is compacted into the vacated space.
    pub fn move_clip(
        &mut self,
        clip_id: ClipId,
        target_track: TrackId,
        target_time: Seconds,
    ) -> Result<RippleReport> {
        let source = self.clip_track_index(clip_id)?;
        let target = self.track_index(target_track)?;
        self.ensure_clip_editable(source, clip_id)?;
        self.ensure_track_unlocked(target)?;

        let new_start = self.snap_start(target_time, Some(clip_id));

        let mut tracks = self.timeline.tracks.clone();
        let mut moving = tracks[source]
            .take_clip(clip_id)
            .ok_or(TimelineError::ClipNotFound(clip_id))?;
        let old_end = moving.end_time();
        let duration = moving.duration;

        let mut shifts = self.make_room(&tracks[target], new_start, new_start + duration)?;
        ripple::apply_shifts(&mut tracks[target], &shifts);

        moving.start_time = new_start;
        tracks[target].insert_clip(moving);

        if self.config.gap_closing {
            let compaction = ripple::plan_compaction(&tracks[source], old_end, duration, Some(clip_id));
            ripple::apply_shifts(&mut tracks[source], &compaction);
            shifts.extend(compaction);
        }

        let report = self.report(shifts);
        self.commit(tracks);
        debug!(
            clip = %clip_id,
            track = %target_track,
            start = new_start,
            shifted = report.shifts.len(),
            "clip moved"
        );
        Ok(report)
    }

    /// Change a clip's length, keeping its start. Growing pushes successors
    /// under auto-ripple; shrinking pulls them in when gap closing is on.
    pub fn resize_clip(&mut self, clip_id: ClipId, new_duration: Seconds) -> Result<RippleReport> {
        validate_duration(new_duration)?;
        let index = self.clip_track_index(clip_id)?;
        self.ensure_clip_editable(index, clip_id)?;

        let mut tracks = self.timeline.tracks.clone();
        let mut clip = tracks[index]
            .take_clip(clip_id)
            .ok_or(TimelineError::ClipNotFound(clip_id))?;
        let old_duration = clip.duration;
        let old_end = clip.end_time();
        clip.duration = new_duration;

        let mut shifts = self.make_room(&tracks[index], clip.start_time, clip.end_time())?;
        ripple::apply_shifts(&mut tracks[index], &shifts);
        tracks[index].insert_clip(clip);

        if self.config.gap_closing && new_duration < old_duration {
            let compaction = ripple::plan_compaction(
                &tracks[index],
                old_end,
                old_duration - new_duration,
                Some(clip_id),
            );
            ripple::apply_shifts(&mut tracks[index], &compaction);
            shifts.extend(compaction);
        }

        let report = self.report(shifts);
        self.commit(tracks);
        debug!(clip = %clip_id, duration = new_duration, shifted = report.shifts.len(), "clip resized");
        Ok(report)
    }

    /// Remove a clip. With gap closing on, later clips slide left by its
    /// duration.
    pub fn delete_clip(&mut self, clip_id: ClipId) -> Result<RippleReport> {
        let index = self.clip_track_index(clip_id)?;
        self.ensure_clip_editable(index, clip_id)?;

        let mut tracks = self.timeline.tracks.clone();
        let removed = tracks[index]
            .take_clip(clip_id)
            .ok_or(TimelineError::ClipNotFound(clip_id))?;

        let shifts = if self.config.gap_closing {
            ripple::plan_compaction(&tracks[index], removed.end_time(), removed.duration, None)
        } else {
            Vec::new()
        };
        ripple::apply_shifts(&mut tracks[index], &shifts);

        let report = self.report(shifts);
        self.commit(tracks);
        debug!(clip = %clip_id, shifted = report.shifts.len(), "clip deleted");
        Ok(report)
    }

    /// Close the gap on `track_id` that contains `time`.
    pub fn close_gap(&mut self, track_id: TrackId, time: Seconds) -> Result<RippleReport> {
        let index = self.track_index(track_id)?;
        self.ensure_track_unlocked(index)?;

        let mut tracks = self.timeline.tracks.clone();
        let shifts = ripple::plan_close_gap(&tracks[index], time)?;
        if shifts.is_empty() {
            return Ok(self.report(shifts));
        }
        ripple::apply_shifts(&mut tracks[index], &shifts);

        let report = self.report(shifts);
        self.commit(tracks);
        debug!(track = %track_id, time, shifted = report.shifts.len(), "gap closed");
        Ok(report)
    }

    /// Pack every unlocked track against zero. Locked clips stay in place.
    pub fn close_all_gaps(&mut self) -> RippleReport {
        let mut tracks = self.timeline.tracks.clone();
        let mut shifts = Vec::new();
        for track in tracks.iter_mut().filter(|track| !track.locked) {
            let planned = ripple::plan_compaction(track, 0.0, Seconds::INFINITY, None);
            ripple::apply_shifts(track, &planned);
            shifts.extend(planned);
        }

        let report = self.report(shifts);
        if !report.is_empty() {
            self.commit(tracks);
        }
        debug!(shifted = report.shifts.len(), "all gaps closed");
        report
    }

    pub fn add_magnetic_zone(
        &mut self,
        start: Seconds,
        end: Seconds,
        label: Option<&str>,
    ) -> Result<ZoneId> {
        let mut zone = MagneticZone::new(start, end)?;
        if let Some(label) = label {
            zone = zone.with_label(label);
        }
        let before = self.snapshot();
        self.history.record(before);
        let id = self.zones.add(zone);
        debug!(zone = %id, start, end, "magnetic zone added");
        Ok(id)
    }

    pub fn remove_magnetic_zone(&mut self, id: ZoneId) -> Result<MagneticZone> {
        if self.zones.get(id).is_none() {
            return Err(TimelineError::ZoneNotFound(id));
        }
        let before = self.snapshot();
        self.history.record(before);
        self.zones.remove(id).ok_or(TimelineError::ZoneNotFound(id))
    }

    pub fn undo(&mut self) -> Result<()> {
        let current = self.snapshot();
        let previous = self.history.undo(current)?;
        self.restore(previous);
        debug!("undo");
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let current = self.snapshot();
        let next = self.history.redo(current)?;
        self.restore(next);
        debug!("redo");
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            duration: self.timeline.duration,
            tracks: self.timeline.tracks.clone(),
            zones: self.zones.to_vec(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.timeline.duration = snapshot.duration;
        self.timeline.tracks = snapshot.tracks;
        self.zones = ZoneCollection::from_zones(snapshot.zones);
        self.timeline.fit_to_content();
    }

    fn commit(&mut self, tracks: Vec<Track>) {
        let before = self.snapshot();
        self.history.record(before);
        self.timeline.tracks = tracks;
        self.timeline.fit_to_content();
    }

    fn report(&self, shifts: Vec<ClipShift>) -> RippleReport {
        RippleReport::new(merge_shifts(shifts), self.config.ripple_delay_duration())
    }

    fn snap_start(&self, time: Seconds, exclude: Option<ClipId>) -> Seconds {
        let time = if time.is_finite() { time } else { 0.0 };
        self.snap_time(time, exclude).max(0.0)
    }

    /// Shifts that free `[start, end)` on `track`, or a conflict when
    /// auto-ripple is off and something is in the way.
    fn make_room(&self, track: &Track, start: Seconds, end: Seconds) -> Result<Vec<ClipShift>> {
        let blocking = track.overlapping(start, end, None).first().map(|clip| clip.id);
        match blocking {
            None => Ok(Vec::new()),
            Some(blocking) if !self.config.auto_ripple => Err(TimelineError::PlacementConflict {
                track_id: track.id,
                blocking,
            }),
            Some(_) => ripple::plan_push(track, start, end, None),
        }
    }

    fn track_index(&self, id: TrackId) -> Result<usize> {
        self.timeline
            .track_index(id)
            .ok_or(TimelineError::TrackNotFound(id))
    }

    fn clip_track_index(&self, id: ClipId) -> Result<usize> {
        self.timeline
            .locate_clip(id)
            .ok_or(TimelineError::ClipNotFound(id))
    }

    fn ensure_track_unlocked(&self, index: usize) -> Result<()> {
        let track = &self.timeline.tracks[index];
        if track.locked {
            return Err(TimelineError::Locked(format!("track {}", track.id)));
        }
        Ok(())
    }

    fn ensure_clip_editable(&self, index: usize, clip_id: ClipId) -> Result<()> {
        self.ensure_track_unlocked(index)?;
        let locked = self.timeline.tracks[index]
            .clip(clip_id)
            .map_or(false, |clip| clip.locked);
        if locked {
            return Err(TimelineError::Locked(format!("clip {clip_id}")));
        }
        Ok(())
    }
}

fn validate_duration(duration: Seconds) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(TimelineError::InvalidOp(format!(
            "clip duration {duration} must be positive"
        )));
    }
    Ok(())
}

/// Fold repeated shifts of one clip into a single from/to pair, dropping
/// clips that end up where they started.
fn merge_shifts(shifts: Vec<ClipShift>) -> Vec<ClipShift> {
    let mut merged: Vec<ClipShift> = Vec::with_capacity(shifts.len());
    for shift in shifts {
        match merged.iter_mut().find(|seen| seen.clip_id == shift.clip_id) {
            Some(seen) => {
                seen.to = shift.to;
                seen.track_id = shift.track_id;
            }
            None => merged.push(shift),
        }
    }
    merged.retain(|shift| shift.delta() != 0.0);
    merged
}
