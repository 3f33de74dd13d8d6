//! End-to-end editing sessions: beat snapping fed by the analyzer, document
//! persistence and long edit/undo sequences.
use std::f32::consts::PI;

use beats::{AudioBuffer, BeatAnalyzer, BeatAnalyzerConfig};
use timeline::*;

const RATE: u32 = 44_100;

fn clicks(seconds: f64, times: &[f64]) -> AudioBuffer {
    let mut samples = vec![0.0_f32; (seconds * RATE as f64) as usize];
    let burst = (0.02 * RATE as f64) as usize;
    for &time in times {
        let start = (time * RATE as f64) as usize;
        for offset in 0..burst {
            if let Some(sample) = samples.get_mut(start + offset) {
                let phase = 2.0 * PI * 880.0 * offset as f32 / RATE as f32;
                *sample = (1.0 - offset as f32 / burst as f32) * phase.sin();
            }
        }
    }
    AudioBuffer::mono(samples, RATE)
}

#[tokio::test]
async fn test_clip_snaps_to_detected_beat() {
    let analyzer = BeatAnalyzer::new(BeatAnalyzerConfig::default());
    let analysis = analyzer
        .detect_beats(clicks(4.0, &[1.0, 2.0, 3.0]))
        .await
        .unwrap();
    assert!(!analysis.beats.is_empty());

    let mut store = TimelineStore::new(30.0);
    let track = store.add_track(TrackKind::Audio);
    let (clip, _) = store.insert_clip(track, 10.0, 2.0, "vocals.wav").unwrap();

    store.set_beats(analyzer.beats());
    let beat = store.beats()[0].time;

    // Beat snapping is off by default.
    store.move_clip(clip, track, beat + 0.02).unwrap();
    assert!((store.clip(clip).unwrap().start_time - (beat + 0.02)).abs() < 1e-9);

    store.toggle_snap_to_beat();
    store.move_clip(clip, track, beat + 0.02).unwrap();
    assert_eq!(store.clip(clip).unwrap().start_time, beat);
}

#[test]
fn test_document_round_trip_preserves_session() {
    let mut store = TimelineStore::new(20.0);
    let video = store.add_track(TrackKind::Video);
    let text = store.add_track(TrackKind::Text);
    store.insert_clip(video, 0.0, 5.0, "intro.mp4").unwrap();
    store.insert_clip(video, 7.0, 3.0, "scene.mp4").unwrap();
    store.insert_clip(text, 1.0, 2.0, "title").unwrap();
    store.add_magnetic_zone(12.0, 14.0, Some("drop")).unwrap();
    store.toggle_gap_closing();
    store.set_playhead(4.0);

    let json = store.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["config"]["gapClosing"], true);
    assert_eq!(value["magneticZones"][0]["label"], "drop");
    assert_eq!(value["tracks"][0]["clips"][1]["startTime"], 7.0);

    let restored = TimelineStore::from_json(&json).unwrap();
    assert_eq!(restored.tracks(), store.tracks());
    assert_eq!(restored.config(), store.config());
    assert_eq!(restored.playhead(), 4.0);
    assert_eq!(restored.get_gaps(), store.get_gaps());
    assert!(!restored.can_undo());
}

#[test]
fn test_overlapping_document_is_rejected() {
    let track_id = uuid::Uuid::new_v4();
    let json = format!(
        r#"{{
            "duration": 10.0,
            "tracks": [{{
                "id": "{track_id}",
                "kind": "video",
                "height": 80.0,
                "clips": [
                    {{"id": "{a}", "startTime": 0.0, "duration": 5.0, "trackId": "{track_id}", "contentRef": "a"}},
                    {{"id": "{b}", "startTime": 4.0, "duration": 5.0, "trackId": "{track_id}", "contentRef": "b"}}
                ]
            }}]
        }}"#,
        a = uuid::Uuid::new_v4(),
        b = uuid::Uuid::new_v4(),
    );

    assert!(matches!(
        TimelineStore::from_json(&json),
        Err(TimelineError::InvalidDocument(_))
    ));
    assert!(matches!(
        TimelineStore::from_json("{ not json"),
        Err(TimelineError::Serialization(_))
    ));
}

#[test]
fn test_edit_sequence_keeps_tracks_valid_and_undoes_fully() {
    let mut store = TimelineStore::new(60.0);
    let track = store.add_track(TrackKind::Video);
    let other = store.add_track(TrackKind::Video);
    let mut clips = Vec::new();
    for index in 0..6 {
        let (id, _) = store
            .insert_clip(track, index as f64 * 4.0, 3.0, format!("shot-{index}"))
            .unwrap();
        clips.push(id);
    }
    let baseline = store.tracks().to_vec();

    store.toggle_gap_closing();
    let mut edits = 0;
    store.move_clip(clips[0], track, 9.5).unwrap();
    edits += 1;
    store.move_clip(clips[3], other, 2.0).unwrap();
    edits += 1;
    store.resize_clip(clips[1], 6.0).unwrap();
    edits += 1;
    store.delete_clip(clips[5]).unwrap();
    edits += 1;
    store.close_all_gaps();
    edits += 1;

    for track in store.tracks() {
        assert!(track.is_non_overlapping(), "overlap on {}", track.id);
        assert!(track.clips.iter().all(|clip| clip.track_id == track.id));
    }
    let remaining: usize = store.tracks().iter().map(|track| track.clips.len()).sum();
    assert_eq!(remaining, 5);

    for _ in 0..edits {
        store.undo().unwrap();
    }
    assert_eq!(store.tracks(), baseline.as_slice());
}

#[test]
fn test_ripple_report_stagger_follows_config() {
    let mut store = TimelineStore::new(30.0);
    let track = store.add_track(TrackKind::Video);
    let (first, _) = store.insert_clip(track, 0.0, 5.0, "a").unwrap();
    store.insert_clip(track, 5.0, 5.0, "b").unwrap();
    store.insert_clip(track, 10.0, 5.0, "c").unwrap();

    store.update_config(&ConfigUpdate {
        ripple_delay: Some(250),
        ..ConfigUpdate::default()
    });
    let report = store.move_clip(first, track, 2.0).unwrap();

    assert_eq!(report.shifts.len(), 2);
    assert_eq!(report.delay_of(1).as_millis(), 250);
    assert_eq!(report.settle_time().as_millis(), 500);
}

fn arrangement_after_session(ripple_delay: u32) -> Vec<Vec<(Seconds, Seconds, String)>> {
    let mut store = TimelineStore::new(30.0);
    store.update_config(&ConfigUpdate {
        ripple_delay: Some(ripple_delay),
        gap_closing: Some(true),
        ..ConfigUpdate::default()
    });
    let video = store.add_track(TrackKind::Video);
    let audio = store.add_track(TrackKind::Audio);

    let (a, _) = store.insert_clip(video, 0.0, 5.0, "a").unwrap();
    let (b, _) = store.insert_clip(video, 5.0, 5.0, "b").unwrap();
    store.insert_clip(video, 10.0, 5.0, "c").unwrap();
    let (d, _) = store.insert_clip(audio, 2.0, 4.0, "d").unwrap();

    store.move_clip(a, video, 3.0).unwrap();
    store.resize_clip(b, 7.0).unwrap();
    store.move_clip(d, video, 1.0).unwrap();
    store.delete_clip(a).unwrap();
    store.close_all_gaps();

    store
        .tracks()
        .iter()
        .map(|track| {
            track
                .clips
                .iter()
                .map(|clip| (clip.start_time, clip.duration, clip.content_ref.clone()))
                .collect()
        })
        .collect()
}

#[test]
fn test_ripple_delay_never_changes_final_positions() {
    let immediate = arrangement_after_session(0);
    assert_eq!(immediate, arrangement_after_session(100));
    assert_eq!(immediate, arrangement_after_session(2_000));
    assert_eq!(immediate.iter().flatten().count(), 3);
}
