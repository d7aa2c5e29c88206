//! Evenly spaced frame sampling with wall-clock labels
//!
//! Given a recording session and a frame count `n`, the sampler seeks the
//! decoded media to `i * (end - start) / n` for `i in 0..n`, captures each
//! position into a single reused [`CaptureSurface`], encodes it as a still and
//! labels it with `start + offset` in IST.
//!
//! Seeks can fail on short or damaged recordings. Successful captures are kept
//! in order; if fewer than `n` succeed the result is padded by repeating the
//! last successful sample, and the set is marked with a [`PartialCapture`].
//! If nothing could be captured the run fails.

use chrono::{DateTime, FixedOffset};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decoder::{FfmpegDecoder, FfmpegTools, SeekableMedia};
use crate::encoder::{EncodedStill, JpegEncoder, StillEncoder};
use crate::error::{MediaError, MediaResult};
use crate::recording::{MediaMetadata, RecordingSession};
use crate::surface::CaptureSurface;
use crate::timestamp::{format_label, frame_instant, offset_for};

/// Sampler configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Number of evenly spaced samples to produce
    pub frame_count: usize,
    /// Upper bound for a single seek-and-capture
    pub seek_timeout: Duration,
    /// JPEG quality for encoded stills
    pub still_quality: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            frame_count: 20,
            seek_timeout: Duration::from_secs(5),
            still_quality: JpegEncoder::DEFAULT_QUALITY,
        }
    }
}

impl SamplerConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.frame_count == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Frame count must be > 0".to_string(),
            });
        }

        if self.seek_timeout.is_zero() {
            return Err(MediaError::InvalidConfiguration {
                message: "Seek timeout must be > 0".to_string(),
            });
        }

        if self.still_quality == 0 || self.still_quality > 100 {
            return Err(MediaError::InvalidConfiguration {
                message: "Still quality must be within 1..=100".to_string(),
            });
        }

        Ok(())
    }
}

/// Where a sampling run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Nothing started
    Idle,
    /// Reading natural dimensions and duration
    LoadingMetadata,
    /// Seeking and capturing sample `index` of `of`
    Sampling {
        /// Sample being captured
        index: usize,
        /// Requested sample count
        of: usize,
    },
    /// Repeating the last capture to reach the requested count
    Padding,
    /// Finished with a full set
    Done,
    /// Aborted
    Failed,
}

/// One sampled frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    /// Position in the output sequence
    pub index: usize,
    /// Seek slot the image was captured at
    pub source_index: usize,
    /// Media offset of the capture
    pub offset: Duration,
    /// Wall-clock instant in IST
    pub wall_clock: DateTime<FixedOffset>,
    /// Wall-clock label sent to the service
    pub label: String,
    /// Encoded still
    pub image: EncodedStill,
    /// Whether this sample is a padding copy
    pub padded: bool,
}

/// Marker for a set that had to be padded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCapture {
    /// Genuine captures
    pub captured: usize,
    /// Requested samples
    pub requested: usize,
    /// Offsets whose seek failed or timed out
    pub failed_offsets: Vec<Duration>,
}

/// Result of one sampling run: always exactly `frame_count` samples
#[derive(Debug, Clone)]
pub struct SampleSet {
    session_id: Uuid,
    metadata: MediaMetadata,
    interval: Duration,
    samples: Vec<FrameSample>,
    partial: Option<PartialCapture>,
}

impl SampleSet {
    /// Session the samples came from
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Metadata of the sampled media
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Gap between seek points
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ordered samples
    pub fn samples(&self) -> &[FrameSample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Never true for a set returned by the sampler
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Genuine captures (excludes padding)
    pub fn captured(&self) -> usize {
        self.partial
            .as_ref()
            .map(|p| p.captured)
            .unwrap_or(self.samples.len())
    }

    /// Padding marker, if any
    pub fn partial(&self) -> Option<&PartialCapture> {
        self.partial.as_ref()
    }

    /// Whether padding was applied
    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// Images as data URLs
    pub fn image_urls(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.image.to_data_url()).collect()
    }

    /// Wall-clock labels
    pub fn labels(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.label.clone()).collect()
    }

    /// The two parallel sequences the service expects
    pub fn into_parallel(self) -> (Vec<String>, Vec<String>) {
        self.samples
            .into_iter()
            .map(|s| (s.image.to_data_url(), s.label))
            .unzip()
    }
}

/// Evenly spaced frame sampler
#[derive(Debug)]
pub struct FrameSampler {
    config: SamplerConfig,
    encoder: Arc<dyn StillEncoder>,
    state: RwLock<SamplerState>,
}

impl FrameSampler {
    /// Sampler with a JPEG encoder at the configured quality
    pub fn new(config: SamplerConfig) -> MediaResult<Self> {
        config.validate()?;
        let encoder = JpegEncoder::new(config.still_quality)?;
        Ok(Self::with_encoder(config, Arc::new(encoder)))
    }

    /// Sampler with a custom still encoder
    pub fn with_encoder(config: SamplerConfig, encoder: Arc<dyn StillEncoder>) -> Self {
        Self {
            config,
            encoder,
            state: RwLock::new(SamplerState::Idle),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// State of the current or last run
    pub fn state(&self) -> SamplerState {
        *self.state.read()
    }

    fn set_state(&self, state: SamplerState) {
        *self.state.write() = state;
    }

    /// Sample `session` through `media`
    pub async fn sample(
        &self,
        session: RecordingSession,
        media: &mut dyn SeekableMedia,
    ) -> MediaResult<SampleSet> {
        let result = self.run(session, media).await;
        if result.is_err() {
            self.set_state(SamplerState::Failed);
        }
        result
    }

    async fn run(
        &self,
        session: RecordingSession,
        media: &mut dyn SeekableMedia,
    ) -> MediaResult<SampleSet> {
        self.config.validate()?;
        let requested = self.config.frame_count;
        let session_id = session.id();
        let total = session.duration();
        let start = session.start();

        self.set_state(SamplerState::LoadingMetadata);
        let metadata = media.load_metadata().await?;
        let mut surface = CaptureSurface::for_metadata(&metadata)?;

        if let Some(media_duration) = metadata.duration {
            debug!(
                "Session {}: wall-clock {:?}, media {:?}",
                session_id, total, media_duration
            );
        }

        let interval = offset_for(1, requested, total);
        info!(
            "Sampling {} frames from session {} ({}x{}), interval {:?}",
            requested, session_id, metadata.width, metadata.height, interval
        );

        let mut samples: Vec<FrameSample> = Vec::with_capacity(requested);
        let mut failed_offsets = Vec::new();

        for i in 0..requested {
            self.set_state(SamplerState::Sampling {
                index: i,
                of: requested,
            });
            let offset = offset_for(i, requested, total);

            match tokio::time::timeout(
                self.config.seek_timeout,
                media.seek_and_capture(offset, &mut surface),
            )
            .await
            {
                Ok(Ok(())) => {
                    let image = self.encoder.encode(&surface.snapshot()?)?;
                    let wall_clock = frame_instant(start, offset);
                    debug!("Frame {} captured at {:?}", i + 1, offset);
                    samples.push(FrameSample {
                        index: samples.len(),
                        source_index: i,
                        offset,
                        label: format_label(&wall_clock),
                        wall_clock,
                        image,
                        padded: false,
                    });
                }
                Ok(Err(e)) => {
                    warn!("Frame {} at {:?} not captured: {}", i + 1, offset, e);
                    failed_offsets.push(offset);
                }
                Err(_) => {
                    let e = MediaError::Timeout {
                        duration: self.config.seek_timeout,
                    };
                    warn!("Frame {} at {:?} not captured: {}", i + 1, offset, e);
                    failed_offsets.push(offset);
                }
            }
        }

        let captured = samples.len();
        let partial = match samples.last().cloned() {
            None => return Err(MediaError::NoFramesCaptured { requested }),
            Some(_) if captured == requested => None,
            Some(last) => {
                self.set_state(SamplerState::Padding);
                warn!(
                    "Only {} of {} frames captured, repeating the last capture to fill the set",
                    captured, requested
                );
                pad_with_last(&mut samples, last, requested);
                Some(PartialCapture {
                    captured,
                    requested,
                    failed_offsets,
                })
            }
        };

        self.set_state(SamplerState::Done);
        info!(
            "Sampling finished: {} frames, {} captured",
            samples.len(),
            captured
        );

        Ok(SampleSet {
            session_id,
            metadata,
            interval,
            samples,
            partial,
        })
    }
}

fn pad_with_last(samples: &mut Vec<FrameSample>, last: FrameSample, requested: usize) {
    while samples.len() < requested {
        samples.push(FrameSample {
            index: samples.len(),
            padded: true,
            ..last.clone()
        });
    }
}

/// Sample a session with the ffmpeg decoder
pub async fn sample_recording(
    session: RecordingSession,
    config: SamplerConfig,
    tools: FfmpegTools,
) -> MediaResult<SampleSet> {
    let sampler = FrameSampler::new(config)?;
    let mut decoder = FfmpegDecoder::open(session.recording(), tools).await?;
    sampler.sample(session, &mut decoder).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Recording;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    /// Media that stalls forever from a given slot on
    struct StallingMedia {
        stall_from: Duration,
    }

    #[async_trait]
    impl SeekableMedia for StallingMedia {
        async fn load_metadata(&mut self) -> MediaResult<MediaMetadata> {
            Ok(MediaMetadata {
                width: 4,
                height: 4,
                duration: None,
            })
        }

        async fn seek_and_capture(
            &mut self,
            offset: Duration,
            surface: &mut CaptureSurface,
        ) -> MediaResult<()> {
            if offset >= self.stall_from {
                std::future::pending::<()>().await;
            }
            surface.draw(&vec![offset.as_millis() as u8; 48])
        }
    }

    fn session(seconds: i64) -> RecordingSession {
        let start = Utc.with_ymd_and_hms(2024, 11, 23, 19, 37, 16).unwrap();
        RecordingSession::new(
            Recording::from_bytes(vec![0u8; 8], "webm"),
            start,
            start + chrono::Duration::seconds(seconds),
        )
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(SamplerConfig::default().validate().is_ok());

        let zero = SamplerConfig {
            frame_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(MediaError::InvalidConfiguration { .. })
        ));
        assert!(FrameSampler::new(zero).is_err());
    }

    #[tokio::test]
    async fn test_stalled_seek_times_out_and_pads() {
        let config = SamplerConfig {
            frame_count: 4,
            seek_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let sampler = FrameSampler::new(config).unwrap();
        let mut media = StallingMedia {
            stall_from: Duration::from_secs(2),
        };

        let set = sampler.sample(session(4), &mut media).await.unwrap();

        assert_eq!(set.len(), 4);
        let partial = set.partial().unwrap();
        assert_eq!(partial.captured, 2);
        assert_eq!(
            partial.failed_offsets,
            vec![Duration::from_secs(2), Duration::from_secs(3)]
        );
        assert_eq!(sampler.state(), SamplerState::Done);
    }

    #[tokio::test]
    async fn test_all_seeks_stalled_fails() {
        let config = SamplerConfig {
            frame_count: 2,
            seek_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let sampler = FrameSampler::new(config).unwrap();
        let mut media = StallingMedia {
            stall_from: Duration::ZERO,
        };

        let err = sampler.sample(session(2), &mut media).await.unwrap_err();
        assert!(matches!(err, MediaError::NoFramesCaptured { requested: 2 }));
        assert_eq!(sampler.state(), SamplerState::Failed);
    }
}
