//! # Skip Segments
//!
//! Detects when playback enters a sponsor/intro/outro segment and decides
//! whether to jump over it or prompt the user.
//!
//! ## Lifecycle
//!
//! Segments are fetched once per video. The fetch is split into
//! [`SegmentSkipController::request_segments`] (synchronous, on the driving
//! loop), [`SegmentRequest::fetch`] (async, anywhere) and
//! [`SegmentSkipController::apply_segments`] (back on the driving loop), so the
//! network never blocks a poll. A failed fetch simply leaves the list empty.
//!
//! ## Handled segments
//!
//! A segment fires at most once per forward pass. It becomes eligible again
//! only after playback moves strictly before its start.

use bridge_traits::{SegmentRecord, SharedSegmentSource};
use core_runtime::events::{CoreEvent, EventBus, SegmentEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument, warn};

use crate::error::{ControlError, Result};

/// Kind of skippable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentCategory {
    Sponsor,
    Intro,
    Outro,
    Interaction,
    SelfPromo,
    Preview,
    Filler,
    Other,
}

impl SegmentCategory {
    /// Maps the segment service's wire name. Unknown names become [`Other`](Self::Other).
    pub fn from_wire(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sponsor" => Self::Sponsor,
            "intro" => Self::Intro,
            "outro" => Self::Outro,
            "interaction" => Self::Interaction,
            "selfpromo" => Self::SelfPromo,
            "preview" => Self::Preview,
            "filler" => Self::Filler,
            _ => Self::Other,
        }
    }

    /// Skip button text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sponsor => "Skip sponsor",
            Self::Intro => "Skip intro",
            Self::Outro => "Skip outro",
            Self::Interaction => "Skip interaction reminder",
            Self::SelfPromo => "Skip self-promotion",
            Self::Preview => "Skip preview",
            Self::Filler => "Skip filler",
            Self::Other => "Skip segment",
        }
    }

    /// Categories acted on when the user has not chosen.
    pub fn default_enabled() -> BTreeSet<SegmentCategory> {
        [Self::Sponsor, Self::Intro, Self::Outro, Self::Interaction]
            .into_iter()
            .collect()
    }
}

/// A validated skippable range, `[start_ms, end_ms)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub category: SegmentCategory,
    pub segment_id: String,
}

impl SponsorSegment {
    /// Converts a wire record, dropping empty or inverted ranges.
    pub fn from_record(record: SegmentRecord) -> Option<Self> {
        if record.end_ms <= record.start_ms {
            return None;
        }
        Some(Self {
            start_ms: record.start_ms,
            end_ms: record.end_ms,
            category: SegmentCategory::from_wire(&record.category),
            segment_id: record.segment_id,
        })
    }

    pub fn contains(&self, position_ms: u64) -> bool {
        (self.start_ms..self.end_ms).contains(&position_ms)
    }
}

/// What the host should do about the segment playback just entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    /// Auto-skip: seek to `position_ms` with no visible prompt.
    SkipTo {
        position_ms: u64,
        segment_id: String,
    },
    /// Show a skip button that jumps to `skip_to_ms` when tapped.
    ShowButton {
        skip_to_ms: u64,
        segment_id: String,
        label: String,
    },
}

impl SkipDecision {
    pub fn segment_id(&self) -> &str {
        match self {
            SkipDecision::SkipTo { segment_id, .. } | SkipDecision::ShowButton { segment_id, .. } => {
                segment_id
            }
        }
    }
}

/// Segments that already fired in the current forward pass.
#[derive(Debug, Clone, Default)]
pub struct SkipPromptState {
    handled: HashSet<String>,
}

impl SkipPromptState {
    pub fn is_handled(&self, segment_id: &str) -> bool {
        self.handled.contains(segment_id)
    }

    /// Returns `false` when the id was already handled.
    pub fn mark(&mut self, segment_id: &str) -> bool {
        self.handled.insert(segment_id.to_string())
    }

    pub fn clear(&mut self) {
        self.handled.clear();
    }

    pub fn len(&self) -> usize {
        self.handled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handled.is_empty()
    }

    /// Re-arms every handled segment that starts strictly after `position_ms`.
    fn rearm_before(&mut self, segments: &[SponsorSegment], position_ms: u64) {
        if self.handled.is_empty() {
            return;
        }
        for segment in segments.iter().filter(|s| position_ms < s.start_ms) {
            if self.handled.remove(&segment.segment_id) {
                debug!(segment_id = %segment.segment_id, position_ms, "Segment re-armed");
            }
        }
    }
}

/// Pending segment fetch, detached from the controller so it can run anywhere.
pub struct SegmentRequest {
    source: SharedSegmentSource,
    video_id: String,
    track_id: String,
    generation: u64,
}

impl SegmentRequest {
    #[instrument(skip(self), fields(video_id = %self.video_id))]
    pub async fn fetch(self) -> SegmentFetch {
        let result = self
            .source
            .load_segments(&self.video_id, &self.track_id)
            .await
            .map_err(|e| ControlError::SegmentsUnavailable(e.to_string()));
        SegmentFetch {
            video_id: self.video_id,
            generation: self.generation,
            result,
        }
    }
}

/// Completed segment fetch, ready for [`SegmentSkipController::apply_segments`].
pub struct SegmentFetch {
    pub video_id: String,
    generation: u64,
    pub result: Result<Vec<SegmentRecord>>,
}

/// Polls playback position against the loaded segment list.
pub struct SegmentSkipController {
    source: Option<SharedSegmentSource>,
    events: EventBus,
    segments: Vec<SponsorSegment>,
    prompts: SkipPromptState,
    auto_skip: bool,
    categories: BTreeSet<SegmentCategory>,
    video_id: Option<String>,
    generation: u64,
}

impl SegmentSkipController {
    pub fn new(source: Option<SharedSegmentSource>, events: EventBus) -> Self {
        Self {
            source,
            events,
            segments: Vec::new(),
            prompts: SkipPromptState::default(),
            auto_skip: true,
            categories: SegmentCategory::default_enabled(),
            video_id: None,
            generation: 0,
        }
    }

    pub fn auto_skip(&self) -> bool {
        self.auto_skip
    }

    pub fn set_auto_skip(&mut self, auto_skip: bool) {
        if self.auto_skip != auto_skip {
            debug!(auto_skip, "Segment auto-skip changed");
            self.auto_skip = auto_skip;
        }
    }

    pub fn set_categories(&mut self, categories: BTreeSet<SegmentCategory>) {
        self.categories = categories;
    }

    pub fn segments(&self) -> &[SponsorSegment] {
        &self.segments
    }

    pub fn prompt_state(&self) -> &SkipPromptState {
        &self.prompts
    }

    /// Forgets every segment and handled id. Used on video change and end.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.prompts.clear();
        self.video_id = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Resets state for a new video and returns the fetch to run, if a
    /// segment source is configured.
    pub fn request_segments(&mut self, video_id: &str, track_id: &str) -> Option<SegmentRequest> {
        self.clear();
        self.video_id = Some(video_id.to_string());
        let source = self.source.clone()?;
        Some(SegmentRequest {
            source,
            video_id: video_id.to_string(),
            track_id: track_id.to_string(),
            generation: self.generation,
        })
    }

    /// Installs a completed fetch. Returns the number of usable segments.
    ///
    /// Fetches for a video that is no longer current are ignored.
    pub fn apply_segments(&mut self, fetch: SegmentFetch) -> usize {
        if fetch.generation != self.generation
            || self.video_id.as_deref() != Some(fetch.video_id.as_str())
        {
            debug!(video_id = %fetch.video_id, "Discarding segments for a previous video");
            return 0;
        }

        match fetch.result {
            Ok(records) => {
                let mut segments: Vec<SponsorSegment> = records
                    .into_iter()
                    .filter_map(SponsorSegment::from_record)
                    .collect();
                segments.sort_by_key(|s| (s.start_ms, s.end_ms));

                let count = segments.len();
                self.segments = segments;
                if count > 0 {
                    info!(video_id = %fetch.video_id, count, "Skip segments loaded");
                }
                self.events
                    .publish(CoreEvent::Segment(SegmentEvent::SegmentsLoaded {
                        video_id: fetch.video_id,
                        count,
                    }));
                count
            }
            Err(e) => {
                warn!(video_id = %fetch.video_id, error = %e, "Skip segments unavailable");
                self.segments.clear();
                self.events
                    .publish(CoreEvent::Segment(SegmentEvent::Unavailable {
                        video_id: fetch.video_id,
                        reason: e.to_string(),
                    }));
                0
            }
        }
    }

    /// Fetches and installs segments in one step.
    pub async fn load_segments(&mut self, video_id: &str, track_id: &str) -> usize {
        match self.request_segments(video_id, track_id) {
            Some(request) => {
                let fetch = request.fetch().await;
                self.apply_segments(fetch)
            }
            None => 0,
        }
    }

    /// One poll at `position_ms`.
    ///
    /// Returns at most one decision: the first enabled segment containing the
    /// position that has not fired in this forward pass.
    pub fn poll(&mut self, position_ms: u64) -> Option<SkipDecision> {
        if self.segments.is_empty() {
            return None;
        }
        self.prompts.rearm_before(&self.segments, position_ms);

        let segment = self.segments.iter().find(|s| {
            s.contains(position_ms)
                && self.categories.contains(&s.category)
                && !self.prompts.is_handled(&s.segment_id)
        })?;
        self.prompts.mark(&segment.segment_id);

        let decision = if self.auto_skip {
            debug!(segment_id = %segment.segment_id, to = segment.end_ms, "Auto-skipping segment");
            self.events
                .publish(CoreEvent::Segment(SegmentEvent::SkippedTo {
                    segment_id: segment.segment_id.clone(),
                    position_ms: segment.end_ms,
                }));
            SkipDecision::SkipTo {
                position_ms: segment.end_ms,
                segment_id: segment.segment_id.clone(),
            }
        } else {
            debug!(segment_id = %segment.segment_id, "Prompting skip button");
            let label = segment.category.label().to_string();
            self.events
                .publish(CoreEvent::Segment(SegmentEvent::ShowSkipButton {
                    segment_id: segment.segment_id.clone(),
                    skip_to_ms: segment.end_ms,
                    label: label.clone(),
                }));
            SkipDecision::ShowButton {
                skip_to_ms: segment.end_ms,
                segment_id: segment.segment_id.clone(),
                label,
            }
        };
        Some(decision)
    }

    /// Marks a segment handled after a tap on its skip button and returns
    /// the position to seek to.
    pub fn mark_skipped(&mut self, segment_id: &str) -> Option<u64> {
        let end_ms = self
            .segments
            .iter()
            .find(|s| s.segment_id == segment_id)?
            .end_ms;
        self.prompts.mark(segment_id);
        self.events
            .publish(CoreEvent::Segment(SegmentEvent::SkippedTo {
                segment_id: segment_id.to_string(),
                position_ms: end_ms,
            }));
        Some(end_ms)
    }
}
