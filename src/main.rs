use anyhow::Result;
use chrono::Utc;
use std::io::{self, Write};
use vitals_tracker::backend::ApiClient;
use vitals_tracker::config::Config;
use vitals_tracker::engine::SessionSummary;
use vitals_tracker::exercise::ExerciseKind;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Vitals Tracker - API Test ===");
    println!("接続先: {}", config.backend.base_url);
    println!();
    println!("コマンド:");
    println!("  u 名前 メール パスワード 保護者メール  - アカウント登録");
    println!("  l メール パスワード                     - ログイン");
    println!("  c 種目ID 回数                           - セッション作成 (例: c squat 10)");
    println!("  g                                       - セッション一覧");
    println!("  e セッションID                          - 緊急フラグ送信");
    println!("  q                                       - 終了");
    println!();

    let client = ApiClient::from_config(&config.backend)?;
    let mut user_id: Option<String> = if config.backend.user_id.is_empty() {
        None
    } else {
        Some(config.backend.user_id.clone())
    };

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        let result = match parts[0] {
            "u" if parts.len() == 5 => {
                match client.signup(parts[1], parts[2], parts[3], parts[4]) {
                    Ok(id) => {
                        println!("登録しました: {id}");
                        user_id = Some(id);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            "l" if parts.len() == 3 => match client.login(parts[1], parts[2]) {
                Ok(id) => {
                    println!("ログインしました: {id}");
                    user_id = Some(id);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            "c" if parts.len() >= 2 => match (&user_id, ExerciseKind::from_id(parts[1])) {
                (None, _) => {
                    println!("先にログインしてください");
                    Ok(())
                }
                (_, None) => {
                    println!("不明な種目ID: {}", parts[1]);
                    Ok(())
                }
                (Some(uid), Some(exercise)) => {
                    let reps = parts.get(2).and_then(|v| v.parse().ok()).unwrap_or(0);
                    let summary = SessionSummary {
                        exercise,
                        started_at: Utc::now(),
                        ended_at: Utc::now(),
                        reps,
                        too_fast: 0,
                        emergency: false,
                    };
                    match client.create_session(uid, &summary) {
                        Ok(id) => {
                            println!("セッションを作成しました: {id}");
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
            },
            "g" => match &user_id {
                None => {
                    println!("先にログインしてください");
                    Ok(())
                }
                Some(uid) => match client.sessions(uid) {
                    Ok(sessions) => {
                        println!("{}件:", sessions.len());
                        for session in sessions {
                            println!("  {session}");
                        }
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            },
            "e" if parts.len() == 2 => match &user_id {
                None => {
                    println!("先にログインしてください");
                    Ok(())
                }
                Some(uid) => match client.mark_emergency(uid, parts[1]) {
                    Ok(()) => {
                        println!("緊急フラグを送信しました");
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            },
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("エラー: {e:#}");
        }
    }

    Ok(())
}
