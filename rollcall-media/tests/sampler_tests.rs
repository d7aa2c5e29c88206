//! Integration tests for evenly spaced frame sampling
//!
//! A scripted [`SeekableMedia`] stands in for the ffmpeg decoder so that seek
//! positions, failures and padding can be checked without a real recording.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rollcall_media::*;
use std::collections::HashSet;
use std::time::Duration;

const WIDTH: u32 = 4;
const HEIGHT: u32 = 2;

/// Media whose every seek draws a frame keyed on the slot index
struct ScriptedMedia {
    failing: HashSet<Duration>,
    metadata_error: bool,
    seeks: Vec<Duration>,
}

impl ScriptedMedia {
    fn new() -> Self {
        Self {
            failing: HashSet::new(),
            metadata_error: false,
            seeks: Vec::new(),
        }
    }

    fn failing_at(offsets: &[Duration]) -> Self {
        Self {
            failing: offsets.iter().copied().collect(),
            ..Self::new()
        }
    }
}

#[async_trait]
impl SeekableMedia for ScriptedMedia {
    async fn load_metadata(&mut self) -> MediaResult<MediaMetadata> {
        if self.metadata_error {
            return Err(MediaError::DecodingFailed {
                codec: "scripted".to_string(),
                reason: "corrupt container".to_string(),
            });
        }
        Ok(MediaMetadata {
            width: WIDTH,
            height: HEIGHT,
            duration: None,
        })
    }

    async fn seek_and_capture(
        &mut self,
        offset: Duration,
        surface: &mut CaptureSurface,
    ) -> MediaResult<()> {
        self.seeks.push(offset);
        if self.failing.contains(&offset) {
            return Err(MediaError::SeekFailed {
                offset,
                reason: "past end of stream".to_string(),
            });
        }
        let shade = (offset.as_millis() / 100) as u8;
        surface.draw(&vec![shade; CaptureSurface::frame_len(WIDTH, HEIGHT)])
    }
}

fn start() -> DateTime<Utc> {
    // 24/11/2024 01:07:16 IST
    Utc.with_ymd_and_hms(2024, 11, 23, 19, 37, 16).unwrap()
}

fn session(length: chrono::Duration) -> RecordingSession {
    RecordingSession::new(
        Recording::from_bytes(vec![0u8; 16], "webm"),
        start(),
        start() + length,
    )
    .unwrap()
}

fn sampler(frame_count: usize) -> FrameSampler {
    FrameSampler::new(SamplerConfig {
        frame_count,
        ..Default::default()
    })
    .unwrap()
}

// ============================================================================
// EVEN SPACING
// ============================================================================

#[tokio::test]
async fn test_twenty_frames_over_ten_seconds() {
    let mut media = ScriptedMedia::new();
    let set = sampler(20)
        .sample(session(chrono::Duration::seconds(10)), &mut media)
        .await
        .unwrap();

    assert_eq!(set.len(), 20);
    assert!(!set.is_partial());
    assert_eq!(set.interval(), Duration::from_millis(500));
    assert_eq!(media.seeks.len(), 20);
    assert_eq!(media.seeks[0], Duration::ZERO);
    assert_eq!(media.seeks[19], Duration::from_millis(9500));

    let samples = set.samples();
    assert_eq!(samples[0].label, "24/11/2024, 01:07:16 AM");
    assert_eq!(samples[2].label, "24/11/2024, 01:07:17 AM");
    assert_eq!(samples[19].offset, Duration::from_millis(9500));
    assert_eq!(samples[19].label, "24/11/2024, 01:07:25 AM");
    assert!(samples.iter().all(|s| !s.padded));
    assert!(samples
        .iter()
        .enumerate()
        .all(|(i, s)| s.index == i && s.source_index == i));
}

#[tokio::test]
async fn test_single_frame_at_start() {
    let mut media = ScriptedMedia::new();
    let set = sampler(1)
        .sample(session(chrono::Duration::seconds(7)), &mut media)
        .await
        .unwrap();

    assert_eq!(set.len(), 1);
    assert_eq!(media.seeks, vec![Duration::ZERO]);
    assert_eq!(set.samples()[0].label, "24/11/2024, 01:07:16 AM");
}

#[tokio::test]
async fn test_length_matches_request_for_uneven_windows() {
    for (count, millis) in [(3usize, 1000i64), (7, 2500), (20, 333), (64, 90_000)] {
        let mut media = ScriptedMedia::new();
        let set = sampler(count)
            .sample(session(chrono::Duration::milliseconds(millis)), &mut media)
            .await
            .unwrap();
        assert_eq!(set.len(), count);
        assert!(media
            .seeks
            .iter()
            .all(|o| *o < Duration::from_millis(millis as u64)));
        assert!(media.seeks.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn test_sampling_is_deterministic() {
    let run = || async {
        let mut media = ScriptedMedia::failing_at(&[Duration::from_secs(3)]);
        let set = sampler(8)
            .sample(session(chrono::Duration::seconds(4)), &mut media)
            .await
            .unwrap();
        (media.seeks, set.into_parallel())
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(first, second);
}

// ============================================================================
// PADDING
// ============================================================================

#[tokio::test]
async fn test_trailing_failures_repeat_last_capture() {
    // Slots land at 0, 1, 2, 3, 4 seconds; the last two fail
    let mut media =
        ScriptedMedia::failing_at(&[Duration::from_secs(3), Duration::from_secs(4)]);
    let set = sampler(5)
        .sample(session(chrono::Duration::seconds(5)), &mut media)
        .await
        .unwrap();

    assert_eq!(set.len(), 5);
    assert_eq!(set.captured(), 3);
    let partial = set.partial().unwrap();
    assert_eq!(partial.requested, 5);
    assert_eq!(
        partial.failed_offsets,
        vec![Duration::from_secs(3), Duration::from_secs(4)]
    );

    let samples = set.samples();
    for padded in &samples[3..] {
        assert!(padded.padded);
        assert_eq!(padded.image, samples[2].image);
        assert_eq!(padded.label, samples[2].label);
        assert_eq!(padded.source_index, 2);
    }
    assert_eq!(samples[4].index, 4);
}

#[tokio::test]
async fn test_middle_failure_keeps_order() {
    let mut media = ScriptedMedia::failing_at(&[Duration::from_secs(1)]);
    let set = sampler(4)
        .sample(session(chrono::Duration::seconds(4)), &mut media)
        .await
        .unwrap();

    let sources: Vec<usize> = set.samples().iter().map(|s| s.source_index).collect();
    assert_eq!(sources, vec![0, 2, 3, 3]);
    assert!(set.samples()[3].padded);
    assert_eq!(set.labels()[1], "24/11/2024, 01:07:18 AM");
}

#[tokio::test]
async fn test_image_urls_are_jpeg_data_urls() {
    let mut media = ScriptedMedia::new();
    let set = sampler(2)
        .sample(session(chrono::Duration::seconds(2)), &mut media)
        .await
        .unwrap();

    let (images, labels) = set.into_parallel();
    assert_eq!(images.len(), labels.len());
    assert!(images
        .iter()
        .all(|url| url.starts_with("data:image/jpeg;base64,")));
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_every_seek_failing_is_an_error() {
    let offsets: Vec<Duration> = (0..3).map(Duration::from_secs).collect();
    let mut media = ScriptedMedia::failing_at(&offsets);
    let sampler = sampler(3);

    let err = sampler
        .sample(session(chrono::Duration::seconds(3)), &mut media)
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::NoFramesCaptured { requested: 3 }));
    assert_eq!(sampler.state(), SamplerState::Failed);
}

#[tokio::test]
async fn test_undecodable_recording() {
    let mut media = ScriptedMedia {
        metadata_error: true,
        ..ScriptedMedia::new()
    };
    let err = sampler(5)
        .sample(session(chrono::Duration::seconds(3)), &mut media)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::DecodingFailed { .. }));
    assert!(media.seeks.is_empty());
}

#[test]
fn test_zero_frame_count_rejected() {
    let err = tokio_test::assert_err!(FrameSampler::new(SamplerConfig {
        frame_count: 0,
        ..Default::default()
    }));
    assert!(matches!(err, MediaError::InvalidConfiguration { .. }));
}

#[test]
fn test_sampler_reports_done_state() {
    let sampler = sampler(3);
    assert_eq!(sampler.state(), SamplerState::Idle);

    let mut media = ScriptedMedia::new();
    let set = tokio_test::block_on(
        sampler.sample(session(chrono::Duration::seconds(3)), &mut media),
    )
    .unwrap();

    assert_eq!(set.captured(), 3);
    assert_eq!(sampler.state(), SamplerState::Done);
}

#[test]
fn test_empty_window_rejected() {
    let err = RecordingSession::new(Recording::from_bytes(vec![1u8], "webm"), start(), start())
        .unwrap_err();
    assert!(matches!(err, MediaError::InvalidSessionWindow { .. }));
    assert_eq!(err.category(), ErrorCategory::Validation);
}

// ============================================================================
// EXPORT
// ============================================================================

#[tokio::test]
async fn test_padded_set_survives_export() {
    // Slots land at 0, 0.5, 1 and 1.5 seconds; the last two fail
    let mut media = ScriptedMedia::failing_at(&[
        Duration::from_millis(1000),
        Duration::from_millis(1500),
    ]);
    let set = sampler(4)
        .sample(session(chrono::Duration::seconds(2)), &mut media)
        .await
        .unwrap();
    assert!(set.is_partial());

    let dir = std::env::temp_dir().join(format!("rollcall-roundtrip-{}", uuid::Uuid::new_v4()));
    let manifest = export_samples(&set, &dir, Some("dynamic")).await.unwrap();

    assert_eq!(manifest.frame_count, 4);
    assert_eq!(manifest.captured, 2);
    assert_eq!(manifest.processing_mode.as_deref(), Some("dynamic"));
    assert_eq!(
        manifest.files,
        (0..4)
            .map(|i| format!("2024-11-24_01h07m16s_{:02}.jpeg", i))
            .collect::<Vec<_>>()
    );
    for (i, modified) in manifest.modified_labels.iter().enumerate() {
        assert_eq!(modified, &format!("24/11/2024, 01:07:16 AM, {}", i));
    }

    let loaded = load_exported(&dir).await.unwrap();
    assert_eq!(loaded.manifest, manifest);
    assert_eq!(loaded.image_urls, set.image_urls());
    assert_eq!(loaded.manifest.labels, set.labels());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
