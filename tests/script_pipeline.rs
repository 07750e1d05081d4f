//! Script pipeline integration tests — source text → parse → interpreter → audio backend.
//!
//! A recording backend stands in for the audio device; samples are real WAV
//! files written into a temporary vendor directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use wavescript::audio::{AudioBackend, AudioError, PlayRequest, SampleData};
use wavescript::config::Config;
use wavescript::dsl::DiagnosticKind;
use wavescript::runtime::{CancellationToken, Interpreter, Outcome};

const SAMPLE_RATE: u32 = 44100;

/// Records every play request and decodes the file it points at.
#[derive(Default)]
struct RecordingBackend {
    plays: Mutex<Vec<(PlayRequest, usize)>>,
}

impl RecordingBackend {
    fn plays(&self) -> Vec<(PlayRequest, usize)> {
        self.plays.lock().unwrap().clone()
    }
}

impl AudioBackend for RecordingBackend {
    fn initialize(&self) -> Result<(), AudioError> {
        Ok(())
    }

    fn play(&self, request: &PlayRequest) {
        let frames = SampleData::load(&request.path, SAMPLE_RATE)
            .map(|s| s.len())
            .unwrap_or(0);
        self.plays.lock().unwrap().push((request.clone(), frames));
    }

    fn shutdown(&self) {}
}

/// Helper: write a short mono WAV named `<name>.wav` into `dir`.
fn write_sample(dir: &Path, name: &str, frames: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(dir.join(format!("{name}.wav")), spec).unwrap();
    for i in 0..frames {
        writer.write_sample((i % 100) as i16 * 100).unwrap();
    }
    writer.finalize().unwrap();
}

/// Helper: vendor dir with kick, snare and hat samples.
fn vendor() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_sample(dir.path(), "kick", 400);
    write_sample(dir.path(), "snare", 300);
    write_sample(dir.path(), "hat", 200);
    dir
}

fn build(vendor: &Path, cancel: CancellationToken) -> (Interpreter, Arc<RecordingBackend>) {
    let config = Config {
        vendor_dir: vendor.to_path_buf(),
        ..Config::default()
    };
    let audio = Arc::new(RecordingBackend::default());
    (Interpreter::new(&config, audio.clone(), cancel), audio)
}

#[test]
fn play_statement_decodes_the_imported_sample() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    let outcome = interp.run_script("imp { kick as k }\nplay k;");

    assert_eq!(outcome, Outcome::Completed);
    assert!(interp.diagnostics().is_empty());
    let plays = audio.plays();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].0.path, dir.path().join("kick.wav"));
    assert_eq!(plays[0].1, 400);
}

#[test]
fn reimporting_an_alias_keeps_the_last_one() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    interp.run_script("imp { kick as k, snare as k }\nplay k;");

    assert_eq!(interp.aliases().len(), 1);
    assert_eq!(interp.aliases().get("k").unwrap().module, "snare");
    assert_eq!(audio.plays()[0].0.path, dir.path().join("snare.wav"));
}

#[test]
fn play_before_import_is_a_runtime_error() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    interp.run_script("play k;\nimp { kick as k }");

    assert!(audio.plays().is_empty());
    let diagnostics = interp.diagnostics().snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Runtime);
    assert_eq!(diagnostics[0].to_string(), "[line 1] Runtime: Unknown alias 'k'");
}

#[test]
fn missing_sample_file_drops_only_that_entry() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    interp.run_script("imp { clap as c, hat as h }\nplay c;\nplay h;");

    assert_eq!(interp.diagnostics().count(DiagnosticKind::Resolution), 1);
    assert_eq!(interp.diagnostics().count(DiagnosticKind::Runtime), 1);
    assert_eq!(audio.plays().len(), 1);
}

#[test]
fn unknown_keyword_does_not_stop_the_next_play() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    interp.run_script("imp { kick as k }\nstrum play k;");

    assert_eq!(interp.diagnostics().count(DiagnosticKind::Syntax), 1);
    assert_eq!(audio.plays().len(), 1);
}

#[test]
fn zero_tempo_loop_is_rejected_without_playing() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    let outcome = interp.run_script("imp { kick as k }\ncpm 0;\nloop { play k; }");

    assert_eq!(outcome, Outcome::Completed);
    assert!(audio.plays().is_empty());
    assert_eq!(interp.diagnostics().count(DiagnosticKind::Config), 1);
}

#[test]
fn set_values_reach_the_backend() {
    let dir = vendor();
    let (mut interp, audio) = build(dir.path(), CancellationToken::new());

    interp.run_script("imp { hat as h }\nset h { volume 0.3; pitch 2; }\nplay h;");

    let (request, _) = &audio.plays()[0];
    assert_eq!(request.volume, 0.3);
    assert_eq!(request.pitch, 2.0);
}

#[test]
fn loop_runs_until_cancelled_and_skips_later_statements() {
    let dir = vendor();
    let cancel = CancellationToken::new();
    let (mut interp, audio) = build(dir.path(), cancel.clone());
    cancel.cancel_after(Duration::from_millis(250));

    let outcome = interp.run_script("imp { kick as k }\ncpm 600;\nloop { play k; }\ncpm 60;");

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(audio.plays().len() >= 2);
    assert_eq!(interp.session().tempo(), 600);
}

#[test]
fn loop_with_unknown_alias_reports_it_once() {
    let dir = vendor();
    let cancel = CancellationToken::new();
    let (mut interp, audio) = build(dir.path(), cancel.clone());
    cancel.cancel_after(Duration::from_millis(350));

    interp.run_script("imp { kick as k }\ncpm 600;\nloop { play nope; play k; }");

    assert!(audio.plays().len() >= 3);
    let diagnostics = interp.diagnostics().snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].to_string(), "[line 3] Runtime: Unknown alias 'nope'");
}

#[test]
fn huge_wait_is_reported_and_the_loop_keeps_time() {
    let dir = vendor();
    let cancel = CancellationToken::new();
    let (mut interp, audio) = build(dir.path(), cancel.clone());
    cancel.cancel_after(Duration::from_millis(250));

    let outcome = interp.run_script(
        "imp { kick as k }\ncpm 600;\nloop { play k; wait \"40000000000000000000\"; }",
    );

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(audio.plays().len() >= 2);
    assert_eq!(interp.diagnostics().count(DiagnosticKind::Config), 1);
}

#[test]
fn empty_play_action_uses_current_sample() {
    let dir = vendor();
    let cancel = CancellationToken::new();
    let (mut interp, audio) = build(dir.path(), cancel.clone());
    cancel.cancel_after(Duration::from_millis(50));

    interp.run_script("imp { snare as s }\nset s { sample s; }\ncpm 600;\nloop { play \"\"; }");

    let plays = audio.plays();
    assert!(!plays.is_empty());
    assert_eq!(plays[0].0.path, dir.path().join("snare.wav"));
}

#[test]
fn in_flight_action_keeps_volume_from_schedule_time() {
    let dir = vendor();
    let cancel = CancellationToken::new();
    let (mut interp, audio) = build(dir.path(), cancel.clone());
    let session = interp.session().clone();

    // 120 bpm: the play is due 250 ms in, the second iteration starts at 750 ms.
    let runner = thread::spawn(move || {
        let outcome = interp.run_script(
            "imp { kick as k }\nset k { volume 0.5; }\ncpm 120;\nloop { wait \"1/2\"; play k; }",
        );
        (outcome, interp)
    });

    thread::sleep(Duration::from_millis(80));
    session.update(|s| s.volume = 0.1);
    thread::sleep(Duration::from_millis(320));
    cancel.cancel();

    let (outcome, interp) = runner.join().unwrap();
    assert_eq!(outcome, Outcome::Cancelled);
    assert!(interp.diagnostics().is_empty());

    let plays = audio.plays();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].0.volume, 0.5);
    assert_eq!(session.get().volume, 0.1);
}

#[test]
fn demo_script_parses_cleanly() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/example.wv");
    let source = std::fs::read_to_string(path).unwrap();
    let parsed = wavescript::dsl::Script::parse(&source);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
}
