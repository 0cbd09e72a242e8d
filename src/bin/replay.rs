use anyhow::Result;
use std::time::Instant;

use vitals_tracker::backend::ApiClient;
use vitals_tracker::config::Config;
use vitals_tracker::engine::{Engine, Event};
use vitals_tracker::exercise::ExerciseKind;
use vitals_tracker::pose::{LandmarkSource, TraceSource};

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_TRACE: &str = "trace.jsonl";

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::load_or_default(CONFIG_PATH);

    let args: Vec<String> = std::env::args().collect();
    let trace_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_TRACE);
    let exercise = args
        .get(2)
        .and_then(|id| ExerciseKind::from_id(id))
        .unwrap_or(ExerciseKind::ShoulderPress);

    println!("Vitals Tracker Replay ({})", env!("GIT_VERSION"));
    println!("トレース: {trace_path}");
    println!("種目: {}", exercise.label());
    println!();

    let mut source = TraceSource::open(trace_path)?;
    let backend = config.backend.clone();
    let mut engine = Engine::new(config);

    let base = Instant::now();
    engine.start_session(exercise, base);

    let mut frames = 0u64;
    while let Some((at, frame)) = source.next_frame()? {
        let now = base + at;
        frames += 1;
        for event in engine.tick(now) {
            print_event(at.as_millis(), &event);
        }
        for event in engine.process_frame(&frame, now) {
            print_event(at.as_millis(), &event);
        }
    }

    let Some(summary) = engine.stop_session() else {
        return Ok(());
    };
    println!();
    println!(
        "{}フレーム処理: {} {}回 (速すぎ {}回, 緊急: {})",
        frames,
        summary.exercise.label(),
        summary.reps,
        summary.too_fast,
        summary.emergency
    );

    // 設定があれば要約をセッションAPIへ記録する
    if backend.enabled && !backend.user_id.is_empty() {
        let client = ApiClient::from_config(&backend)?;
        let session_id = client.create_session(&backend.user_id, &summary)?;
        println!("セッションを記録しました: {session_id}");
        if summary.emergency {
            client.mark_emergency(&backend.user_id, &session_id)?;
            println!("緊急フラグを送信しました");
        }
    }

    Ok(())
}

fn print_event(t_ms: u128, event: &Event) {
    match event {
        Event::Notification(n) => {
            let mark = if n.persistent { "!!" } else { "--" };
            println!("[{t_ms:>7}ms] {mark} {:?}: {}", n.category, n.message);
        }
        Event::PhaseChanged(phase) => {
            println!("[{t_ms:>7}ms]    フェーズ: {phase:?}");
        }
        Event::RepCounted(n) => {
            println!("[{t_ms:>7}ms] ** レップ {n}");
        }
        Event::SafetyWarning { kind, remaining } => {
            println!(
                "[{t_ms:>7}ms] !  警告 {kind:?} (残り{}秒)",
                remaining.as_secs()
            );
        }
        Event::SafetyWarningCleared(kind) => {
            println!("[{t_ms:>7}ms]    警告解除 {kind:?}");
        }
        Event::Emergency(kind) => {
            println!("[{t_ms:>7}ms] !! 緊急: {}", kind.message());
        }
    }
}
