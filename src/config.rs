use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub rep: RepConfig,
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub fall: FallConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothConfig {
    /// 移動平均ウィンドウ長（フレーム数）
    #[serde(default = "default_smooth_window")]
    pub window: usize,
    /// 表示角度を更新する最小変化量（度）
    #[serde(default = "default_hysteresis_deg")]
    pub hysteresis_deg: f32,
}

fn default_smooth_window() -> usize { 5 }
fn default_hysteresis_deg() -> f32 { 3.0 }

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            window: default_smooth_window(),
            hysteresis_deg: default_hysteresis_deg(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepConfig {
    /// セッション開始からカウントを始めるまでの猶予（ミリ秒）
    #[serde(default = "default_rep_warmup_ms")]
    pub warmup_ms: u64,
    /// フェーズ遷移を受理するための最小保持時間（ミリ秒）
    #[serde(default = "default_min_hold_ms")]
    pub min_hold_ms: u64,
    /// カウント後に次の遷移を受理するまでのクールダウン（ミリ秒）
    #[serde(default = "default_rep_cooldown_ms")]
    pub cooldown_ms: u64,
    /// 1レップと認める最小サイクル時間（ミリ秒）
    #[serde(default = "default_min_rep_ms")]
    pub min_rep_ms: u64,
}

fn default_rep_warmup_ms() -> u64 { 3000 }
fn default_min_hold_ms() -> u64 { 500 }
fn default_rep_cooldown_ms() -> u64 { 800 }
fn default_min_rep_ms() -> u64 { 2000 }

impl Default for RepConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_rep_warmup_ms(),
            min_hold_ms: default_min_hold_ms(),
            cooldown_ms: default_rep_cooldown_ms(),
            min_rep_ms: default_min_rep_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormConfig {
    /// 警告を出すまでの連続不良フレーム数
    #[serde(default = "default_form_frames")]
    pub frame_threshold: u32,
    /// 同一警告の再表示クールダウン（ミリ秒）
    #[serde(default = "default_form_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_form_frames() -> u32 { 10 }
fn default_form_cooldown_ms() -> u64 { 3000 }

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            frame_threshold: default_form_frames(),
            cooldown_ms: default_form_cooldown_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresenceConfig {
    /// セッション開始直後に不在判定を抑制する猶予（ミリ秒）
    #[serde(default = "default_presence_warmup_ms")]
    pub warmup_ms: u64,
    /// 不在警告を出すまでの時間（ミリ秒）
    #[serde(default = "default_presence_warn_ms")]
    pub warn_ms: u64,
    /// 消失緊急通報までの時間（ミリ秒）
    #[serde(default = "default_vanish_ms")]
    pub vanish_ms: u64,
}

fn default_presence_warmup_ms() -> u64 { 5000 }
fn default_presence_warn_ms() -> u64 { 10_000 }
fn default_vanish_ms() -> u64 { 20_000 }

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_presence_warmup_ms(),
            warn_ms: default_presence_warn_ms(),
            vanish_ms: default_vanish_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MovementConfig {
    /// 重心履歴リングバッファ長（サンプル数）
    #[serde(default = "default_movement_buffer")]
    pub buffer: usize,
    /// 動きとみなす正規化変位の下限（体スケール比）
    #[serde(default = "default_min_displacement")]
    pub min_displacement: f32,
    /// 静止警告を出すまでの時間（ミリ秒）
    #[serde(default = "default_movement_warn_ms")]
    pub warn_ms: u64,
    /// 静止緊急通報までの時間（ミリ秒）
    #[serde(default = "default_movement_emergency_ms")]
    pub emergency_ms: u64,
}

fn default_movement_buffer() -> usize { 30 }
fn default_min_displacement() -> f32 { 0.012 }
fn default_movement_warn_ms() -> u64 { 10_000 }
fn default_movement_emergency_ms() -> u64 { 20_000 }

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            buffer: default_movement_buffer(),
            min_displacement: default_min_displacement(),
            warn_ms: default_movement_warn_ms(),
            emergency_ms: default_movement_emergency_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FallConfig {
    /// 体幹傾きを評価する周期（ミリ秒）。フレームレートとは独立
    #[serde(default = "default_fall_poll_ms")]
    pub poll_ms: u64,
    /// 転倒とみなす体幹傾き（鉛直からの度数）
    #[serde(default = "default_tilt_deg")]
    pub tilt_deg: f32,
    /// 転倒確定までの連続超過回数
    #[serde(default = "default_fall_consecutive")]
    pub consecutive: u32,
}

fn default_fall_poll_ms() -> u64 { 100 }
fn default_tilt_deg() -> f32 { 45.0 }
fn default_fall_consecutive() -> u32 { 8 }

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            poll_ms: default_fall_poll_ms(),
            tilt_deg: default_tilt_deg(),
            consecutive: default_fall_consecutive(),
        }
    }
}

/// 通知カテゴリ別クールダウン（ミリ秒）
#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_form_error_cooldown_ms")]
    pub form_error_ms: u64,
    #[serde(default = "default_emotion_cooldown_ms")]
    pub emotion_ms: u64,
    #[serde(default = "default_rep_success_cooldown_ms")]
    pub rep_success_ms: u64,
    #[serde(default = "default_speed_warning_cooldown_ms")]
    pub speed_warning_ms: u64,
    #[serde(default = "default_accident_cooldown_ms")]
    pub accident_ms: u64,
    #[serde(default = "default_fall_cooldown_ms")]
    pub fall_ms: u64,
}

fn default_form_error_cooldown_ms() -> u64 { 3000 }
fn default_emotion_cooldown_ms() -> u64 { 8000 }
fn default_rep_success_cooldown_ms() -> u64 { 1000 }
fn default_speed_warning_cooldown_ms() -> u64 { 4000 }
fn default_accident_cooldown_ms() -> u64 { 10_000 }
fn default_fall_cooldown_ms() -> u64 { 10_000 }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            form_error_ms: default_form_error_cooldown_ms(),
            emotion_ms: default_emotion_cooldown_ms(),
            rep_success_ms: default_rep_success_cooldown_ms(),
            speed_warning_ms: default_speed_warning_cooldown_ms(),
            accident_ms: default_accident_cooldown_ms(),
            fall_ms: default_fall_cooldown_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// セッションAPIへの送信を有効にするか
    #[serde(default)]
    pub enabled: bool,
    /// セッションAPIのベースURL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTPタイムアウト（秒）
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
    /// セッション送信に使うユーザーID
    #[serde(default)]
    pub user_id: String,
}

fn default_base_url() -> String { "http://127.0.0.1:3001".to_string() }
fn default_backend_timeout_secs() -> u64 { 10 }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            timeout_secs: default_backend_timeout_secs(),
            user_id: String::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルが無ければデフォルト値で起動する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "設定ファイル {} を読めません ({e})。デフォルト値を使用します",
                    path.as_ref().display()
                );
                Config::default()
            }
        }
    }
}
