//! Synthesis graph boundary
//!
//! The audio layer never touches oscillators directly. It sends
//! imperative [`AudioCommand`]s into a [`SynthesisGraph`] and never reads
//! anything back, so the graph can be a PCM renderer, a live device or a
//! recorder in tests.

use serde::Serialize;

use super::styles::{Envelope, Voicing, Waveform};
use crate::core::error::{AudioOperation, EngineError, Result};

/// Percussion instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Drum {
    Kick,
    Tom,
}

/// One percussion trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrumHit {
    pub drum: Drum,
    /// Pitch the membrane settles at
    pub frequency: f32,
    pub velocity: f32,
    /// Seconds after the command is received
    pub delay: f32,
}

/// Write-only command accepted by a synthesis graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AudioCommand {
    /// Ramp the master gain to `gain` over `ramp` seconds
    SetMasterGain { gain: f32, ramp: f32 },
    /// Attack and hold the background chord
    PadAttack {
        frequencies: Vec<f32>,
        attack: f32,
        release: f32,
    },
    /// Release every sustained pad note
    PadReleaseAll,
    /// Release the sounding foreground note, if any
    LeadRelease,
    /// Trigger a foreground note that releases itself after `duration`
    LeadNote {
        frequency: f32,
        waveform: Waveform,
        voicing: Voicing,
        envelope: Envelope,
        portamento: f32,
        duration: f32,
    },
    /// Ramp the low-pass cutoff to `hz` over `ramp` seconds
    FilterCutoff { hz: f32, ramp: f32 },
    /// Schedule a percussion hit
    Drum(DrumHit),
    /// Start the transport clock
    TransportStart { bpm: f32 },
    /// Stop the transport and drop pending percussion
    TransportStop,
}

impl AudioCommand {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AudioCommand::SetMasterGain { .. } => "set_master_gain",
            AudioCommand::PadAttack { .. } => "pad_attack",
            AudioCommand::PadReleaseAll => "pad_release_all",
            AudioCommand::LeadRelease => "lead_release",
            AudioCommand::LeadNote { .. } => "lead_note",
            AudioCommand::FilterCutoff { .. } => "filter_cutoff",
            AudioCommand::Drum(_) => "drum",
            AudioCommand::TransportStart { .. } => "transport_start",
            AudioCommand::TransportStop => "transport_stop",
        }
    }
}

/// An external synthesis graph
pub trait SynthesisGraph {
    /// Bring the graph up. Called once per engine start.
    fn start(&mut self) -> Result<()>;

    /// Deliver a command
    fn send(&mut self, command: AudioCommand);
}

impl<G: SynthesisGraph + ?Sized> SynthesisGraph for Box<G> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn send(&mut self, command: AudioCommand) {
        (**self).send(command)
    }
}

/// Graph that accepts everything and produces nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGraph;

impl SynthesisGraph for NullGraph {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn send(&mut self, _command: AudioCommand) {}
}

/// Graph that records every command, optionally refusing to start
#[derive(Debug, Default, Clone)]
pub struct RecordingGraph {
    commands: Vec<AudioCommand>,
    starts: usize,
    refuse_start: bool,
}

impl RecordingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph whose `start` always fails
    pub fn refusing() -> Self {
        Self {
            refuse_start: true,
            ..Self::default()
        }
    }

    /// Commands received so far
    pub fn commands(&self) -> &[AudioCommand] {
        &self.commands
    }

    /// Number of `start` calls
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Drop recorded commands
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Count of commands with the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.commands.iter().filter(|c| c.kind() == kind).count()
    }

    /// Replay the command log and report which voices would still sound
    pub fn sounding(&self) -> SoundingVoices {
        let mut state = SoundingVoices::default();
        for command in &self.commands {
            match command {
                AudioCommand::PadAttack { .. } => state.pad = true,
                AudioCommand::PadReleaseAll => state.pad = false,
                AudioCommand::LeadNote { .. } => state.lead = true,
                AudioCommand::LeadRelease => state.lead = false,
                AudioCommand::TransportStart { .. } => state.transport = true,
                AudioCommand::TransportStop => state.transport = false,
                _ => {}
            }
        }
        state
    }
}

impl SynthesisGraph for RecordingGraph {
    fn start(&mut self) -> Result<()> {
        self.starts += 1;
        if self.refuse_start {
            return Err(EngineError::audio(
                AudioOperation::Initialization,
                "graph refused to start",
            ));
        }
        Ok(())
    }

    fn send(&mut self, command: AudioCommand) {
        self.commands.push(command);
    }
}

/// Voices left sounding after a command sequence
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SoundingVoices {
    pub pad: bool,
    pub lead: bool,
    pub transport: bool,
}

impl SoundingVoices {
    /// Nothing is left sounding
    pub fn is_silent(&self) -> bool {
        !self.pad && !self.lead && !self.transport
    }
}
