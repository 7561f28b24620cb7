/// Simplified ByteTrack multi-object tracker with per-class association.
///
/// Two-stage association strategy: high-confidence detections are matched
/// first, then low-confidence detections fill remaining unmatched tracks.
/// A detection only ever matches a track of the same class, so a cup
/// passing in front of a phone does not steal the phone's id.
use std::collections::HashSet;

use super::math::bbox_iou;

#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: [f64; 4],
    pub score: f64,
    pub class_id: u32,
}

#[derive(Clone, Debug)]
pub struct Track {
    pub id: u32,
    pub bbox: [f64; 4],
    pub class_id: u32,
    pub det_index: Option<usize>,
}

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: [f64; 4],
    class_id: u32,
    frames_lost: usize,
    matched: bool,
    det_index: Option<usize>,
}

pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: u32,
    max_lost: usize,
}

impl ByteTracker {
    pub fn new(max_lost: usize) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_lost,
        }
    }

    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        let (high, low) = split_by_confidence(detections);

        for track in &mut self.tracks {
            track.matched = false;
            track.det_index = None;
        }
        let num_existing = self.tracks.len();

        let matched_high = self.associate(&high, detections, false);
        self.associate(&low, detections, true);
        self.create_new_tracks(&high, &matched_high, detections);
        self.age_unmatched_tracks(num_existing);

        self.active_tracks()
    }

    /// Greedy IoU association of `candidates` against tracks. When
    /// `unmatched_only` is set, tracks claimed by an earlier stage are
    /// skipped. Returns the detection indices that found a track.
    fn associate(
        &mut self,
        candidates: &[(usize, &Detection)],
        detections: &[Detection],
        unmatched_only: bool,
    ) -> HashSet<usize> {
        let track_refs: Vec<(usize, [f64; 4], u32)> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !(unmatched_only && t.matched))
            .map(|(i, t)| (i, t.bbox, t.class_id))
            .collect();

        let mut matched = HashSet::new();
        for (ti, di) in greedy_match(&track_refs, candidates, MATCH_THRESH) {
            let track = &mut self.tracks[ti];
            track.bbox = detections[di].bbox;
            track.frames_lost = 0;
            track.matched = true;
            track.det_index = Some(di);
            matched.insert(di);
        }
        matched
    }

    fn create_new_tracks(
        &mut self,
        high: &[(usize, &Detection)],
        matched: &HashSet<usize>,
        detections: &[Detection],
    ) {
        for (di, _) in high {
            if matched.contains(di) {
                continue;
            }
            self.tracks.push(TrackState {
                id: self.next_id,
                bbox: detections[*di].bbox,
                class_id: detections[*di].class_id,
                frames_lost: 0,
                matched: true,
                det_index: Some(*di),
            });
            self.next_id += 1;
        }
    }

    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_lost = self.max_lost;
        self.tracks.retain(|t| t.frames_lost <= max_lost);
    }

    /// Only matched tracks produce output; lost tracks are kept internally
    /// for re-identification but are not drawn.
    fn active_tracks(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|t| t.matched)
            .map(|t| Track {
                id: t.id,
                bbox: t.bbox,
                class_id: t.class_id,
                det_index: t.det_index,
            })
            .collect()
    }
}

type IndexedDets<'a> = Vec<(usize, &'a Detection)>;

fn split_by_confidence(detections: &[Detection]) -> (IndexedDets<'_>, IndexedDets<'_>) {
    detections
        .iter()
        .enumerate()
        .partition(|(_, det)| det.score >= HIGH_THRESH)
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track/detection
/// used at most once, classes never mixed.
fn greedy_match(
    tracks: &[(usize, [f64; 4], u32)],
    dets: &[(usize, &Detection)],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, bbox, class_id) in tracks {
        for (di, det) in dets {
            if det.class_id != *class_id {
                continue;
            }
            let score = bbox_iou(bbox, &det.bbox);
            if score >= thresh {
                pairs.push((*ti, *di, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _) in &pairs {
        if !used_tracks.contains(ti) && !used_dets.contains(di) {
            used_tracks.insert(*ti);
            used_dets.insert(*di);
            matches.push((*ti, *di));
        }
    }
    matches
}
