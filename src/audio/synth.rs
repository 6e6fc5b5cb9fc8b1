//! Offline PCM synthesizer
//!
//! A small mono renderer that implements [`SynthesisGraph`], so the audio
//! layer's commands can be turned into samples for a WAV file or a live
//! device. Signal flow:
//!
//! ```text
//! pad + lead -> gain 0.15 -> low-pass (24 dB) -> feedback delay -> reverb -+
//!                                                                          +-> master
//! kick + tom -> gain 0.75 ------------------------------------------------+
//! ```

use std::f32::consts::PI;

use tracing::trace;

use super::graph::{AudioCommand, Drum, DrumHit, SynthesisGraph};
use super::styles::{Envelope, NoteValue, Voicing, Waveform};
use crate::core::error::{AudioOperation, EngineError, Result};

const TWO_PI: f32 = 2.0 * PI;

const VOICE_GAIN: f32 = 0.15;
const DRUM_GAIN: f32 = 0.75;
const INITIAL_CUTOFF: f32 = 2000.0;

const DELAY_FEEDBACK: f32 = 0.2;
const DELAY_WET: f32 = 0.15;
const REVERB_DECAY: f32 = 3.5;
const REVERB_WET: f32 = 0.3;

/// Recompute filter coefficients every this many samples while ramping
const FILTER_UPDATE_INTERVAL: u64 = 32;

/// Linear parameter ramp
#[derive(Debug, Clone, Copy)]
struct Ramp {
    value: f32,
    step: f32,
    remaining: u32,
}

impl Ramp {
    fn new(value: f32) -> Self {
        Self {
            value,
            step: 0.0,
            remaining: 0,
        }
    }

    fn to(&mut self, target: f32, seconds: f32, sample_rate: f32) {
        let n = (seconds.max(0.0) * sample_rate) as u32;
        if n == 0 {
            self.value = target;
            self.remaining = 0;
        } else {
            self.step = (target - self.value) / n as f32;
            self.remaining = n;
        }
    }

    fn is_moving(&self) -> bool {
        self.remaining > 0
    }

    fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.value += self.step;
            self.remaining -= 1;
        }
        self.value
    }
}

/// Biquad low-pass section
#[derive(Debug, Clone, Copy)]
struct BiquadLP {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadLP {
    fn new() -> Self {
        Self {
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn set_params(&mut self, freq: f32, q: f32, sample_rate: f32) {
        let w0 = TWO_PI * (freq / sample_rate).clamp(1e-4, 0.49);
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let a0 = 1.0 + alpha;
        self.b0 = ((1.0 - cos_w0) / 2.0) / a0;
        self.b1 = (1.0 - cos_w0) / a0;
        self.b2 = self.b0;
        self.a1 = (-2.0 * cos_w0) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Fourth-order Butterworth low-pass from two biquads
#[derive(Debug, Clone, Copy)]
struct LowPass24 {
    stages: [BiquadLP; 2],
}

impl LowPass24 {
    const Q: [f32; 2] = [0.541_196_1, 1.306_563];

    fn new(cutoff: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            stages: [BiquadLP::new(); 2],
        };
        filter.set_cutoff(cutoff, sample_rate);
        filter
    }

    fn set_cutoff(&mut self, cutoff: f32, sample_rate: f32) {
        for (stage, q) in self.stages.iter_mut().zip(Self::Q) {
            stage.set_params(cutoff, q, sample_rate);
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let mid = self.stages[0].process(input);
        self.stages[1].process(mid)
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

/// Single-tap feedback delay
#[derive(Debug, Clone)]
struct FeedbackDelay {
    buffer: Vec<f32>,
    pos: usize,
}

impl FeedbackDelay {
    fn new(samples: usize) -> Self {
        Self {
            buffer: vec![0.0; samples.max(1)],
            pos: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = input + delayed * DELAY_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        input * (1.0 - DELAY_WET) + delayed * DELAY_WET
    }

    fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
    }
}

/// Parallel comb reverb with a decay time
#[derive(Debug, Clone)]
struct CombReverb {
    combs: Vec<(Vec<f32>, usize, f32)>,
}

impl CombReverb {
    const LENGTHS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];

    fn new(decay: f32, sample_rate: f32) -> Self {
        let combs = Self::LENGTHS_MS
            .iter()
            .map(|&ms| {
                let len = ((ms / 1000.0) * sample_rate).max(1.0) as usize;
                // -60 dB after `decay` seconds
                let gain = 10f32.powf(-3.0 * (ms / 1000.0) / decay);
                (vec![0.0; len], 0usize, gain)
            })
            .collect();
        Self { combs }
    }

    fn process(&mut self, input: f32) -> f32 {
        let mut wet = 0.0;
        for (buffer, pos, gain) in &mut self.combs {
            let out = buffer[*pos];
            buffer[*pos] = input + out * *gain;
            *pos = (*pos + 1) % buffer.len();
            wet += out;
        }
        wet /= self.combs.len() as f32;
        input * (1.0 - REVERB_WET) + wet * REVERB_WET
    }

    fn clear(&mut self) {
        for (buffer, pos, _) in &mut self.combs {
            buffer.iter_mut().for_each(|s| *s = 0.0);
            *pos = 0;
        }
    }
}

fn oscillator(waveform: Waveform, phase: f32, lfo: f32) -> f32 {
    match waveform {
        Waveform::Sine => (phase * TWO_PI).sin(),
        Waveform::Sine2 => 0.7 * (phase * TWO_PI).sin() + 0.3 * (phase * 2.0 * TWO_PI).sin(),
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Pwm => {
            let width = 0.5 + 0.4 * (lfo * TWO_PI).sin();
            if phase < width {
                1.0
            } else {
                -1.0
            }
        }
    }
}

/// Envelope position of a voice
#[derive(Debug, Clone, Copy)]
struct EnvelopeState {
    envelope: Envelope,
    age: f32,
    released: Option<(f32, f32)>,
}

impl EnvelopeState {
    fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            age: 0.0,
            released: None,
        }
    }

    fn level(&self) -> f32 {
        match self.released {
            Some((level, since)) => self.envelope.released_level(level, since),
            None => self.envelope.held_level(self.age),
        }
    }

    fn release(&mut self) {
        if self.released.is_none() {
            self.released = Some((self.envelope.held_level(self.age), 0.0));
        }
    }

    fn advance(&mut self, dt: f32) {
        self.age += dt;
        if let Some((_, since)) = self.released.as_mut() {
            *since += dt;
        }
    }

    fn finished(&self) -> bool {
        matches!(self.released, Some((_, since)) if since >= self.envelope.release)
    }
}

#[derive(Debug, Clone)]
struct LeadVoice {
    waveform: Waveform,
    voicing: Voicing,
    frequency: f32,
    target: f32,
    glide: f32,
    phases: Vec<f32>,
    env: EnvelopeState,
    hold: f32,
}

impl LeadVoice {
    fn detune_ratios(voicing: Voicing) -> Vec<f32> {
        match voicing {
            Voicing::Partials(_) => vec![1.0],
            Voicing::Unison {
                count,
                spread_cents,
            } => {
                let count = count.max(1);
                if count == 1 {
                    return vec![1.0];
                }
                (0..count)
                    .map(|i| {
                        let cents = -spread_cents / 2.0 + spread_cents * i as f32 / (count - 1) as f32;
                        2f32.powf(cents / 1200.0)
                    })
                    .collect()
            }
        }
    }

    fn sample(&mut self, dt: f32, lfo: f32) -> f32 {
        if self.env.released.is_none() && self.env.age >= self.hold {
            self.env.release();
        }

        if self.glide > 0.0 && (self.frequency - self.target).abs() > 1e-3 {
            // within ~1% of the target after `glide` seconds
            let k = (dt * 5.0 / self.glide).min(1.0);
            self.frequency += (self.target - self.frequency) * k;
        } else {
            self.frequency = self.target;
        }

        let ratios = Self::detune_ratios(self.voicing);
        let mut out = 0.0;
        for (phase, ratio) in self.phases.iter_mut().zip(&ratios) {
            out += match self.voicing {
                Voicing::Partials(n) => {
                    let mut sum = 0.0;
                    let mut norm = 0.0;
                    for k in 1..=n.max(1) {
                        let p = (*phase * k as f32).fract();
                        sum += oscillator(self.waveform, p, lfo) / k as f32;
                        norm += 1.0 / k as f32;
                    }
                    sum / norm
                }
                Voicing::Unison { .. } => oscillator(self.waveform, *phase, lfo),
            };
            *phase = (*phase + self.frequency * ratio * dt).fract();
        }
        out /= self.phases.len().max(1) as f32;

        let level = self.env.level();
        self.env.advance(dt);
        out * level
    }
}

#[derive(Debug, Clone)]
struct PadVoice {
    frequency: f32,
    phase: f32,
    env: EnvelopeState,
}

#[derive(Debug, Clone)]
struct DrumVoice {
    base: f32,
    octaves: f32,
    pitch_decay: f32,
    velocity: f32,
    phase: f32,
    env: EnvelopeState,
    hold: f32,
}

impl DrumVoice {
    fn new(hit: &DrumHit, bpm: f32) -> Self {
        let (octaves, pitch_decay, envelope, hold) = match hit.drum {
            Drum::Kick => (4.0, 0.05, Envelope::new(0.001, 0.5, 0.01, 0.5), NoteValue::Eighth),
            Drum::Tom => (2.0, 0.08, Envelope::new(0.005, 0.3, 0.05, 0.4), NoteValue::Eighth),
        };
        Self {
            base: hit.frequency,
            octaves,
            pitch_decay,
            velocity: hit.velocity,
            phase: 0.0,
            env: EnvelopeState::new(envelope),
            hold: hold.seconds(bpm) / 4.0,
        }
    }

    fn sample(&mut self, dt: f32) -> f32 {
        if self.env.released.is_none() && self.env.age >= self.hold {
            self.env.release();
        }
        let sweep = (self.env.age / self.pitch_decay).min(1.0);
        let freq = self.base * 2f32.powf(self.octaves * (1.0 - sweep));
        let out = (self.phase * TWO_PI).sin() * self.env.level() * self.velocity;
        self.phase = (self.phase + freq * dt).fract();
        self.env.advance(dt);
        out
    }
}

/// Mono PCM renderer driven by [`AudioCommand`]s
#[derive(Debug, Clone)]
pub struct Synthesizer {
    sample_rate: u32,
    bpm: f32,
    clock: u64,
    master: Ramp,
    cutoff: Ramp,
    filter: LowPass24,
    delay: FeedbackDelay,
    reverb: CombReverb,
    pads: Vec<PadVoice>,
    leads: Vec<LeadVoice>,
    last_lead: Option<f32>,
    drums: Vec<DrumVoice>,
    pending: Vec<(u64, DrumHit)>,
    transport: bool,
    started: bool,
}

impl Synthesizer {
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        let bpm = 40.0;
        Self {
            sample_rate,
            bpm,
            clock: 0,
            master: Ramp::new(1.0),
            cutoff: Ramp::new(INITIAL_CUTOFF),
            filter: LowPass24::new(INITIAL_CUTOFF, sr),
            delay: FeedbackDelay::new(Self::delay_samples(bpm, sr)),
            reverb: CombReverb::new(REVERB_DECAY, sr),
            pads: Vec::new(),
            leads: Vec::new(),
            last_lead: None,
            drums: Vec::new(),
            pending: Vec::new(),
            transport: false,
            started: false,
        }
    }

    fn delay_samples(bpm: f32, sample_rate: f32) -> usize {
        (NoteValue::Eighth.seconds(bpm) * sample_rate) as usize
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio rendered so far
    pub fn elapsed(&self) -> f64 {
        self.clock as f64 / self.sample_rate.max(1) as f64
    }

    /// Voices currently producing sound
    pub fn active_voices(&self) -> usize {
        self.pads.len() + self.leads.len() + self.drums.len()
    }

    /// Synth-clock times, in seconds, of percussion hits not yet sounded
    pub fn scheduled_hits(&self) -> Vec<f64> {
        let sr = self.sample_rate.max(1) as f64;
        let mut times: Vec<f64> = self.pending.iter().map(|(at, _)| *at as f64 / sr).collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times
    }

    /// Render enough samples to reach `seconds` on the synth clock
    pub fn render_until(&mut self, seconds: f64) -> Vec<f32> {
        let target = (seconds.max(0.0) * self.sample_rate as f64) as u64;
        let frames = target.saturating_sub(self.clock) as usize;
        self.render(frames)
    }

    /// Render `frames` samples
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.render_into(&mut out);
        out
    }

    pub fn render_into(&mut self, out: &mut [f32]) {
        let sr = self.sample_rate.max(1) as f32;
        let dt = 1.0 / sr;

        for sample in out.iter_mut() {
            self.trigger_pending();

            if self.cutoff.is_moving() && self.clock % FILTER_UPDATE_INTERVAL == 0 {
                self.filter.set_cutoff(self.cutoff.value, sr);
            }
            let was_moving = self.cutoff.is_moving();
            self.cutoff.next();
            if was_moving && !self.cutoff.is_moving() {
                self.filter.set_cutoff(self.cutoff.value, sr);
            }

            let lfo = (self.clock as f32 * dt * 0.5).fract();
            let mut voices = 0.0;
            for pad in &mut self.pads {
                voices += (pad.phase * TWO_PI).sin() * pad.env.level() * 0.5;
                pad.phase = (pad.phase + pad.frequency * dt).fract();
                pad.env.advance(dt);
            }
            for lead in &mut self.leads {
                voices += lead.sample(dt, lfo);
            }

            let mut drums = 0.0;
            for drum in &mut self.drums {
                drums += drum.sample(dt);
            }

            let filtered = self.filter.process(voices * VOICE_GAIN);
            let wet = self.reverb.process(self.delay.process(filtered));
            let mixed = (wet + drums * DRUM_GAIN) * self.master.next();
            *sample = mixed.clamp(-1.0, 1.0);

            self.clock += 1;
        }

        self.pads.retain(|p| !p.env.finished());
        self.leads.retain(|l| !l.env.finished());
        self.drums.retain(|d| !d.env.finished());
    }

    fn trigger_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let now = self.clock;
        let bpm = self.bpm;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].0 <= now {
                let (_, hit) = self.pending.swap_remove(i);
                self.drums.push(DrumVoice::new(&hit, bpm));
            } else {
                i += 1;
            }
        }
    }

    fn apply(&mut self, command: AudioCommand) {
        let sr = self.sample_rate.max(1) as f32;
        trace!(command = command.kind(), clock = self.clock, "synth command");
        match command {
            AudioCommand::SetMasterGain { gain, ramp } => self.master.to(gain, ramp, sr),
            AudioCommand::PadAttack {
                frequencies,
                attack,
                release,
            } => {
                let envelope = Envelope::new(attack, 0.0, 1.0, release);
                self.pads.extend(frequencies.into_iter().map(|frequency| PadVoice {
                    frequency,
                    phase: 0.0,
                    env: EnvelopeState::new(envelope),
                }));
            }
            AudioCommand::PadReleaseAll => self.pads.iter_mut().for_each(|p| p.env.release()),
            AudioCommand::LeadRelease => self.leads.iter_mut().for_each(|l| l.env.release()),
            AudioCommand::LeadNote {
                frequency,
                waveform,
                voicing,
                envelope,
                portamento,
                duration,
            } => {
                let start = match self.last_lead {
                    Some(prev) if portamento > 0.0 => prev,
                    _ => frequency,
                };
                self.leads.push(LeadVoice {
                    waveform,
                    voicing,
                    frequency: start,
                    target: frequency,
                    glide: portamento,
                    phases: vec![0.0; voicing.voices() as usize],
                    env: EnvelopeState::new(envelope),
                    hold: duration,
                });
                self.last_lead = Some(frequency);
            }
            AudioCommand::FilterCutoff { hz, ramp } => self.cutoff.to(hz.max(20.0), ramp, sr),
            AudioCommand::Drum(hit) => {
                if self.transport {
                    let at = self.clock + (hit.delay.max(0.0) * sr) as u64;
                    self.pending.push((at, hit));
                }
            }
            AudioCommand::TransportStart { bpm } => {
                if bpm > 0.0 && (bpm - self.bpm).abs() > f32::EPSILON {
                    self.bpm = bpm;
                    self.delay = FeedbackDelay::new(Self::delay_samples(bpm, sr));
                }
                self.transport = true;
            }
            AudioCommand::TransportStop => {
                self.transport = false;
                self.pending.clear();
            }
        }
    }
}

impl SynthesisGraph for Synthesizer {
    /// Comes up silent: voices, pending hits and effect tails from an
    /// earlier session are dropped.
    fn start(&mut self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::audio(
                AudioOperation::Initialization,
                "sample rate must be positive",
            ));
        }
        self.pads.clear();
        self.leads.clear();
        self.drums.clear();
        self.pending.clear();
        self.last_lead = None;
        self.filter.reset();
        self.delay.clear();
        self.reverb.clear();
        self.started = true;
        Ok(())
    }

    fn send(&mut self, command: AudioCommand) {
        if self.started {
            self.apply(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 8000;

    fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    fn started() -> Synthesizer {
        let mut synth = Synthesizer::new(SR);
        synth.start().unwrap();
        synth
    }

    fn lead(frequency: f32) -> AudioCommand {
        AudioCommand::LeadNote {
            frequency,
            waveform: Waveform::Triangle,
            voicing: Voicing::Unison {
                count: 2,
                spread_cents: 15.0,
            },
            envelope: Envelope::new(0.01, 0.1, 0.5, 0.2),
            portamento: 0.0,
            duration: 0.5,
        }
    }

    #[test]
    fn test_silent_without_commands() {
        let mut synth = started();
        assert!(synth.render(800).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_sample_rate_refuses_start() {
        let mut synth = Synthesizer::new(0);
        assert!(synth.start().unwrap_err().is_audio());
    }

    #[test]
    fn test_commands_ignored_before_start() {
        let mut synth = Synthesizer::new(SR);
        synth.send(lead(220.0));
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_lead_note_sounds_then_releases() {
        let mut synth = started();
        synth.send(lead(220.0));
        let body = synth.render(SR as usize / 4);
        assert!(rms(&body) > 1e-4);

        // held 0.5 s, released over 0.2 s
        synth.render(SR as usize);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_drum_waits_for_delay() {
        let mut synth = started();
        synth.send(AudioCommand::TransportStart { bpm: 40.0 });
        synth.send(AudioCommand::Drum(DrumHit {
            drum: Drum::Kick,
            frequency: 32.7,
            velocity: 0.9,
            delay: 0.5,
        }));
        let before = synth.render(SR as usize * 2 / 5);
        assert!(before.iter().all(|&s| s == 0.0));
        let after = synth.render(SR as usize / 5);
        assert!(rms(&after) > 1e-3);
    }

    #[test]
    fn test_drums_dropped_when_transport_stopped() {
        let mut synth = started();
        synth.send(AudioCommand::TransportStart { bpm: 40.0 });
        synth.send(AudioCommand::Drum(DrumHit {
            drum: Drum::Tom,
            frequency: 98.0,
            velocity: 0.5,
            delay: 0.2,
        }));
        synth.send(AudioCommand::TransportStop);
        assert!(synth.render(SR as usize).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_restart_comes_up_silent() {
        let mut synth = started();
        synth.send(lead(220.0));
        synth.send(AudioCommand::PadAttack {
            frequencies: vec![65.4, 82.4],
            attack: 0.1,
            release: 10.0,
        });
        synth.render(SR as usize / 2);
        assert!(synth.active_voices() > 0);

        synth.start().unwrap();
        assert_eq!(synth.active_voices(), 0);
        assert!(synth.render(400).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_lowpass_attenuates_highs() {
        let sr = 44_100.0;
        let mut lp = LowPass24::new(500.0, sr);
        let tone = |f: f32, lp: &mut LowPass24| {
            let out: Vec<f32> = (0..4410)
                .map(|i| lp.process((TWO_PI * f * i as f32 / sr).sin()))
                .collect();
            rms(&out[2000..])
        };
        let low = tone(100.0, &mut lp);
        lp.reset();
        let high = tone(8000.0, &mut lp);
        assert!(low > 0.6);
        assert!(high < 0.01);
    }

    #[test]
    fn test_render_until_tracks_clock() {
        let mut synth = started();
        let a = synth.render_until(0.5);
        assert_eq!(a.len(), SR as usize / 2);
        assert!(synth.render_until(0.25).is_empty());
        assert!((synth.elapsed() - 0.5).abs() < 1e-9);
    }
}
