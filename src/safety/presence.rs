use std::time::{Duration, Instant};

use crate::config::PresenceConfig;

/// 在・不在の観測結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    /// 不在継続中。remaining は緊急までの残り時間
    Warning { remaining: Duration },
    /// 再検出により警告解除
    WarningCleared,
    /// 消失ウィンドウ超過
    Vanished,
}

/// 人物の連続的な在・不在を追う
///
/// セッション開始直後の warmup 中（利用者がまだ位置についていない間）は
/// 不在を数えない。再検出はいつでも不在タイマーを破棄する
pub struct PresenceWatcher {
    config: PresenceConfig,
    started_at: Instant,
    absence_since: Option<Instant>,
    warned: bool,
    last_seen: Option<Instant>,
}

impl PresenceWatcher {
    pub fn new(config: PresenceConfig, now: Instant) -> Self {
        Self {
            config,
            started_at: now,
            absence_since: None,
            warned: false,
            last_seen: None,
        }
    }

    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    pub fn reset(&mut self, now: Instant) {
        self.started_at = now;
        self.absence_since = None;
        self.warned = false;
        self.last_seen = None;
    }

    pub fn observe(&mut self, visible: bool, now: Instant) -> Option<PresenceEvent> {
        if visible {
            self.last_seen = Some(now);
            self.absence_since = None;
            if self.warned {
                self.warned = false;
                return Some(PresenceEvent::WarningCleared);
            }
            return None;
        }

        // ウォームアップ中の不在はノーカウント
        if now.duration_since(self.started_at) < Duration::from_millis(self.config.warmup_ms) {
            return None;
        }

        let since = *self.absence_since.get_or_insert(now);
        let absent = now.duration_since(since);
        let vanish = Duration::from_millis(self.config.vanish_ms);

        if absent >= vanish {
            return Some(PresenceEvent::Vanished);
        }
        if absent >= Duration::from_millis(self.config.warn_ms) {
            self.warned = true;
            return Some(PresenceEvent::Warning {
                remaining: vanish - absent,
            });
        }
        None
    }
}
