//! End-to-end validation of the full recognition pipeline

use ndarray::Array2;
use score2midi::analysis::{DiagnosticKind, NoteType};
use score2midi::raster::{save_raster, Raster, BACKGROUND, INK};
use score2midi::{Clef, Config, PageInputs, ScoreToMidi, StaffPosition};
use std::path::PathBuf;

fn paint_disc(raster: &mut Raster, cx: i32, cy: i32, radius: i32) {
    for y in cy - radius..=cy + radius {
        for x in cx - radius..=cx + radius {
            if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                raster[[y as usize, x as usize]] = INK;
            }
        }
    }
}

/// Page with a clef-like blob at the left margin and filled noteheads
fn synthetic_page(noteheads: &[(i32, i32)]) -> Raster {
    let mut raster = Array2::from_elem((120, 300), BACKGROUND);
    paint_disc(&mut raster, 10, 50, 3);
    for &(cx, cy) in noteheads {
        paint_disc(&mut raster, cx, cy, 5);
    }
    raster
}

/// Same page with five full-width staff lines drawn underneath
fn page_with_staff(noteheads: &[(i32, i32)], rows: &[usize]) -> Raster {
    let mut raster = synthetic_page(noteheads);
    for &y in rows {
        for x in 0..raster.ncols() {
            raster[[y, x]] = INK;
        }
    }
    raster
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("score2midi_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crotchet_page() {
        let dir = scratch_dir("pipeline_single");
        let input = dir.join("noteheads.png");
        save_raster(&synthetic_page(&[(105, 50)]), &input).unwrap();

        let inputs = PageInputs {
            staff_rows: Some(vec![40, 45, 50, 55, 60]),
            ..PageInputs::new(&input)
        };
        let processor = ScoreToMidi::new(Config::default());
        let output = dir.join("out");
        let state = processor.process(&inputs, &output).unwrap();

        assert_eq!(state.candidates.len(), 1);
        assert_eq!((state.candidates[0].cx, state.candidates[0].cy), (105, 50));
        assert_eq!(state.bars.len(), 1);
        assert_eq!(state.bars[0].events[0].note_type, NoteType::Crotchet);

        assert_eq!(state.resolved_notes.len(), 1);
        let note = &state.resolved_notes[0];
        assert_eq!(note.position, StaffPosition::OnLine(3));
        assert_eq!(note.clef, Clef::Treble);
        assert_eq!(note.midi, 71);
        assert_eq!(note.beats, 1.0);

        for file in [
            "results.txt",
            "processed_notes.txt",
            "clef_classification.txt",
            "transcription.mid",
            "analysis.json",
            "qa/statistics.json",
            "qa/qa_overlay.png",
        ] {
            assert!(output.join(file).exists(), "missing {}", file);
        }

        let results = std::fs::read_to_string(output.join("results.txt")).unwrap();
        assert_eq!(results, "Bar, Note Type, CX, CY\n1, Crotchet, 105, 50\n");
    }

    #[test]
    fn test_notes_are_ordered_within_bars() {
        let dir = scratch_dir("pipeline_order");
        let input = dir.join("noteheads.png");
        // bar 1 around y 50, bar 2 around y 100, written out of order
        save_raster(
            &synthetic_page(&[(200, 50), (100, 100), (120, 45), (240, 100)]),
            &input,
        )
        .unwrap();

        let inputs = PageInputs {
            staff_rows: Some(vec![40, 45, 50, 55, 60, 90, 95, 100, 105, 110]),
            ..PageInputs::new(&input)
        };
        let mut config = Config::default();
        config.qa.generate_images = false;
        let state = ScoreToMidi::new(config)
            .process(&inputs, dir.join("out"))
            .unwrap();

        assert_eq!(state.bars.len(), 2);
        let xs: Vec<Vec<i32>> = state
            .bars
            .iter()
            .map(|b| b.events.iter().map(|e| e.cx).collect())
            .collect();
        assert_eq!(xs, vec![vec![120, 200], vec![100, 240]]);

        let positions: Vec<StaffPosition> =
            state.resolved_notes.iter().map(|n| n.position).collect();
        assert_eq!(
            positions,
            vec![
                StaffPosition::OnLine(2),
                StaffPosition::OnLine(3),
                StaffPosition::OnLine(3),
                StaffPosition::OnLine(3),
            ]
        );
    }

    #[test]
    fn test_missing_staff_rows_skip_pitch_mapping() {
        let dir = scratch_dir("pipeline_no_staff");
        let input = dir.join("noteheads.png");
        save_raster(&synthetic_page(&[(105, 50)]), &input).unwrap();

        let state = ScoreToMidi::new(Config::default())
            .process(&PageInputs::new(&input), dir.join("out"))
            .unwrap();

        assert_eq!(state.bars.len(), 1);
        assert!(state.resolved_notes.is_empty());
        assert!(state
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::StructuralMismatch));
    }

    #[test]
    fn test_unreadable_raster_is_fatal() {
        let dir = scratch_dir("pipeline_missing");
        let result = ScoreToMidi::new(Config::default())
            .process(&PageInputs::new(dir.join("nope.png")), dir.join("out"));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_from_artifacts() {
        let dir = scratch_dir("pipeline_resolve");
        let processed = dir.join("processed_notes.txt");
        let clefs = dir.join("clef_classification.txt");
        std::fs::write(
            &processed,
            " 1, Crotchet, CX 100, CY 50, Differences: [10, 5, 0, -5, -10], Position: On Line 3, Duration: 1 beats\n\
             2, Minim, CX 100, CY 150, Differences: [10, 5, 0, -5, -10], Position: On Line 3, Duration: 2 beats\n",
        )
        .unwrap();
        std::fs::write(&clefs, "1,T,20,50\n2,B,20,150\n").unwrap();

        let processor = ScoreToMidi::new(Config::default());
        let (notes, diagnostics) = processor
            .resolve_artifacts(&processed, Some(clefs.as_path()), &dir)
            .unwrap();

        assert!(diagnostics.is_empty());
        let midi: Vec<(Clef, u8)> = notes.iter().map(|n| (n.clef, n.midi)).collect();
        assert_eq!(midi, vec![(Clef::Treble, 71), (Clef::Bass, 50)]);
        assert!(dir.join("transcription.mid").exists());
    }

    #[test]
    fn test_full_page_with_staff_lines() {
        let dir = scratch_dir("pipeline_strip_staff");
        let input = dir.join("page.png");
        save_raster(&page_with_staff(&[(105, 50)], &[40, 45, 50, 55, 60]), &input).unwrap();

        let inputs = PageInputs {
            strip_staff: true,
            ..PageInputs::new(&input)
        };
        let mut config = Config::default();
        config.qa.generate_images = false;
        let state = ScoreToMidi::new(config)
            .process(&inputs, dir.join("out"))
            .unwrap();

        assert_eq!(state.staff_rows, vec![40, 45, 50, 55, 60]);
        assert_eq!(state.candidates.len(), 1);
        assert_eq!((state.candidates[0].cx, state.candidates[0].cy), (105, 50));
        assert_eq!(state.resolved_notes.len(), 1);
        assert_eq!(state.resolved_notes[0].position, StaffPosition::OnLine(3));
        assert_eq!(state.resolved_notes[0].midi, 71);
    }
}
