//! The media generation stage.
//!
//! Real generation is an external concern; [`SimulatedGenerator`] stands in
//! for it with a random delay and a random outcome, both drawn from an
//! injected [`RandomSource`] so tests stay deterministic.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::config::GenerationSettings;
use crate::error::GenerationError;
use crate::state_machine::MediaRequest;

pub trait MediaGenerator: Send + Sync {
    /// Produces the media for `request` and returns a reference to it.
    fn generate(
        &self,
        request: &MediaRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

pub trait RandomSource: Send + Sync {
    /// A value in `min..=max`. Returns `min` when the range is empty.
    fn delay_ms(&self, min: u64, max: u64) -> u64;

    /// `true` with the given probability.
    fn chance(&self, probability: f64) -> bool;
}

/// [`RandomSource`] backed by the thread-local generator of `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn delay_ms(&self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        rand::rng().random_range(min..=max)
    }

    fn chance(&self, probability: f64) -> bool {
        rand::rng().random_bool(probability.clamp(0.0, 1.0))
    }
}

pub struct SimulatedGenerator<R> {
    random: R,
    min_delay_ms: u64,
    max_delay_ms: u64,
    success_rate: f64,
    output_dir: String,
}

impl<R: RandomSource> SimulatedGenerator<R> {
    pub fn new(random: R, settings: &GenerationSettings) -> Self {
        Self {
            random,
            min_delay_ms: settings.min_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            success_rate: settings.success_rate,
            output_dir: settings.output_dir.trim_end_matches('/').to_string(),
        }
    }

    fn output_path(&self, request: &MediaRequest) -> String {
        format!(
            "{}/media_{}.{}",
            self.output_dir,
            request.id,
            request.media_type.extension()
        )
    }
}

impl<R: RandomSource> MediaGenerator for SimulatedGenerator<R> {
    async fn generate(&self, request: &MediaRequest) -> Result<String, GenerationError> {
        let delay = self.random.delay_ms(self.min_delay_ms, self.max_delay_ms);
        tracing::debug!(request_id = %request.id, delay_ms = delay, "simulating media generation");
        sleep(Duration::from_millis(delay)).await;

        if self.random.chance(self.success_rate) {
            Ok(self.output_path(request))
        } else {
            Err(GenerationError::Failed("Simulated generation error.".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::Utc;

    use crate::state_machine::{MediaType, NewMediaRequest, RequestId, TargetPlatform};

    /// Returns the minimum delay and replays a fixed list of outcomes.
    struct ScriptedRandom {
        outcomes: Mutex<Vec<bool>>,
        delays: Mutex<Vec<(u64, u64)>>,
    }

    impl ScriptedRandom {
        fn new(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().rev().copied().collect()),
                delays: Mutex::new(Vec::new()),
            }
        }
    }

    impl RandomSource for ScriptedRandom {
        fn delay_ms(&self, min: u64, max: u64) -> u64 {
            self.delays.lock().unwrap().push((min, max));
            0
        }

        fn chance(&self, _probability: f64) -> bool {
            self.outcomes.lock().unwrap().pop().unwrap_or(false)
        }
    }

    fn request(media_type: MediaType) -> MediaRequest {
        NewMediaRequest::new("scenario", ["Gemini"], media_type, TargetPlatform::Tiktok)
            .unwrap()
            .into_record(RequestId(12), Utc::now())
    }

    #[tokio::test]
    async fn success_produces_typed_output_path() {
        let settings = GenerationSettings {
            output_dir: "/out/".into(),
            ..GenerationSettings::default()
        };
        let generator = SimulatedGenerator::new(ScriptedRandom::new(&[true]), &settings);
        let path = generator.generate(&request(MediaType::Video)).await.unwrap();
        assert_eq!(path, "/out/media_12.mp4");
        assert_eq!(*generator.random.delays.lock().unwrap(), vec![(5000, 15_000)]);
    }

    #[tokio::test]
    async fn failure_is_reported() {
        let generator =
            SimulatedGenerator::new(ScriptedRandom::new(&[false]), &GenerationSettings::default());
        let err = generator.generate(&request(MediaType::Images)).await.unwrap_err();
        assert_eq!(err, GenerationError::Failed("Simulated generation error.".into()));
    }

    #[test]
    fn thread_random_respects_bounds() {
        let random = ThreadRandom;
        for _ in 0..100 {
            let d = random.delay_ms(10, 20);
            assert!((10..=20).contains(&d));
        }
        assert_eq!(random.delay_ms(30, 5), 30);
        assert!(random.chance(1.0));
        assert!(!random.chance(0.0));
        // Out-of-range probabilities are clamped instead of panicking.
        assert!(random.chance(7.5));
    }
}
