use std::time::Instant;

/// One spoken question: interleaved PCM samples normalized to [-1.0, 1.0],
/// stamped with the moment recording finished.
///
/// A transcript is carried when the capture side already has one (typed
/// questions, or a recogniser upstream); collaborators that work on raw
/// audio ignore it.
#[derive(Clone, Debug)]
pub struct Utterance {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    transcript: Option<String>,
    recorded_at: Instant,
}

impl Utterance {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16, recorded_at: Instant) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            transcript: None,
            recorded_at,
        }
    }

    /// A text-only question with no audio payload.
    pub fn from_text(text: &str, recorded_at: Instant) -> Self {
        Self::new(Vec::new(), 16_000, 1, recorded_at).with_transcript(text)
    }

    pub fn with_transcript(mut self, text: &str) -> Self {
        self.transcript = Some(text.to_string());
        self
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn recorded_at(&self) -> Instant {
        self.recorded_at
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}
