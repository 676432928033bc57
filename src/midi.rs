//! MIDI export functionality

use crate::analysis::{Clef, ResolvedNote};
use crate::config::Config;
use crate::error::ScoreError;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Track, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::Write;

/// Channel a clef's track plays on
fn clef_channel(clef: Clef) -> u8 {
    match clef {
        Clef::Treble => 0,
        Clef::Bass => 1,
    }
}

/// Export the resolved notes as a two-track MIDI file
pub fn export_midi(
    notes: &[ResolvedNote],
    output_dir: &std::path::Path,
    config: &Config,
) -> crate::ScoreErrorResult<()> {
    if notes.is_empty() {
        log::warn!("No resolved notes to export");
    }

    std::fs::create_dir_all(output_dir)?;
    let midi_path = output_dir.join(&config.export.midi_filename);

    let midi_data = build_midi_bytes(notes, config)?;

    let mut file = File::create(&midi_path)?;
    file.write_all(&midi_data)?;

    log::info!(
        "Exported {} notes to {}",
        notes.len(),
        midi_path.display()
    );
    Ok(())
}

/// Microseconds per quarter note, if the tempo fits the 24-bit meta field
pub fn tempo_micros(tempo_bpm: f64) -> Option<u24> {
    if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
        return None;
    }
    let micros = (60_000_000.0 / tempo_bpm).round();
    if micros > u32::MAX as f64 {
        return None;
    }
    u24::try_from(micros as u32)
}

/// Note length in ticks, if it fits a 28-bit delta time
pub fn note_ticks(beats: f32, ticks_per_beat: u16) -> Option<u28> {
    if !beats.is_finite() || beats < 0.0 {
        return None;
    }
    let ticks = (beats as f64 * ticks_per_beat as f64).round();
    if ticks > u32::MAX as f64 {
        return None;
    }
    u28::try_from(ticks as u32)
}

/// Build one clef's track: notes play back to back in the given order
fn clef_track(
    notes: &[ResolvedNote],
    clef: Clef,
    config: &Config,
) -> crate::ScoreErrorResult<Track<'static>> {
    let export = &config.export;
    let channel = u4::from(clef_channel(clef));
    let tempo = tempo_micros(export.tempo_bpm).ok_or_else(|| {
        ScoreError::MidiExportError(format!(
            "tempo {} BPM does not fit a MIDI tempo event",
            export.tempo_bpm
        ))
    })?;

    let mut track = vec![
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo)),
        },
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(clef.name().as_bytes())),
        },
    ];

    for note in notes.iter().filter(|n| n.clef == clef) {
        let key = u7::from(note.midi.min(127));
        let length = note_ticks(note.beats, export.ticks_per_beat).ok_or_else(|| {
            ScoreError::MidiExportError(format!(
                "bar {}: duration of {} beats does not fit a MIDI delta time",
                note.bar, note.beats
            ))
        })?;

        track.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::from(export.velocity.min(127)),
                },
            },
        });
        track.push(TrackEvent {
            delta: length,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::from(0),
                },
            },
        });
    }

    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(track)
}

/// Serialize resolved notes to SMF bytes: treble track first, then bass
pub fn build_midi_bytes(notes: &[ResolvedNote], config: &Config) -> crate::ScoreErrorResult<Vec<u8>> {
    let header = Header {
        format: Format::Parallel,
        timing: midly::Timing::Metrical(u15::from(config.export.ticks_per_beat)),
    };

    let smf = Smf {
        header,
        tracks: vec![
            clef_track(notes, Clef::Treble, config)?,
            clef_track(notes, Clef::Bass, config)?,
        ],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| ScoreError::MidiExportError(format!("Failed to write MIDI data: {:?}", e)))?;
    Ok(bytes)
}
