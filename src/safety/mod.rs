pub mod fall;
pub mod movement;
pub mod presence;

pub use fall::{trunk_tilt_deg, FallPoll, FallWatcher};
pub use movement::{MovementEvent, MovementWatcher};
pub use presence::{PresenceEvent, PresenceWatcher};

use std::time::{Duration, Instant};

use crate::config::{FallConfig, MovementConfig, PresenceConfig};
use crate::pose::PoseFrame;

/// 緊急通報の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyKind {
    /// 利用者がカメラから消えた
    Disappeared,
    /// 一定時間動きがない
    NotMoving,
    /// 転倒
    Fall,
}

impl EmergencyKind {
    /// 緊急バナーに出す文言
    pub fn message(&self) -> &'static str {
        match self {
            Self::Disappeared => "利用者を見失いました。緊急連絡を送信します",
            Self::NotMoving => "動きが確認できません。緊急連絡を送信します",
            Self::Fall => "転倒を検出しました。緊急連絡を送信します",
        }
    }
}

/// 監視イベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyEvent {
    /// 緊急までのカウントダウン付き警告
    Warning {
        kind: EmergencyKind,
        remaining: Duration,
    },
    /// 回復により警告を取り下げた
    WarningCleared(EmergencyKind),
    /// 緊急通報（セッションにつき最大1回）
    Emergency(EmergencyKind),
}

/// 3つのウォッチャを束ね、1セッション1回きりの緊急ラッチを共有する
///
/// どれか1つが発報したらラッチが立ち、以降の緊急はセッションを
/// リセットするまで全て抑制される
pub struct SafetyMonitor {
    presence: PresenceWatcher,
    movement: MovementWatcher,
    fall: FallWatcher,
    fired: bool,
}

impl SafetyMonitor {
    pub fn new(
        presence: PresenceConfig,
        movement: MovementConfig,
        fall: FallConfig,
        now: Instant,
    ) -> Self {
        Self {
            presence: PresenceWatcher::new(presence, now),
            movement: MovementWatcher::new(movement, now),
            fall: FallWatcher::new(fall),
            fired: false,
        }
    }

    /// 緊急ラッチが立っているか
    pub fn emergency_fired(&self) -> bool {
        self.fired
    }

    /// ラッチを通す。立っていれば None（抑制）
    fn latch(&mut self, kind: EmergencyKind) -> Option<SafetyEvent> {
        if self.fired {
            log::debug!("緊急ラッチ作動中のため {kind:?} を抑制");
            return None;
        }
        self.fired = true;
        log::warn!("緊急通報: {kind:?}");
        Some(SafetyEvent::Emergency(kind))
    }

    /// フレームごとの観測（在・不在と重心移動）
    pub fn observe_frame(&mut self, pose: Option<&PoseFrame>, now: Instant) -> Vec<SafetyEvent> {
        let mut events = Vec::new();

        match self.presence.observe(pose.is_some(), now) {
            Some(PresenceEvent::Warning { remaining }) => events.push(SafetyEvent::Warning {
                kind: EmergencyKind::Disappeared,
                remaining,
            }),
            Some(PresenceEvent::WarningCleared) => {
                events.push(SafetyEvent::WarningCleared(EmergencyKind::Disappeared))
            }
            Some(PresenceEvent::Vanished) => {
                if let Some(e) = self.latch(EmergencyKind::Disappeared) {
                    events.push(e);
                }
            }
            None => {}
        }

        let movement_event = match pose {
            Some(pose) => self.movement.observe(pose, now),
            None => self.movement.interrupt(now),
        };
        match movement_event {
            Some(MovementEvent::Warning { remaining }) => events.push(SafetyEvent::Warning {
                kind: EmergencyKind::NotMoving,
                remaining,
            }),
            Some(MovementEvent::WarningCleared) => {
                events.push(SafetyEvent::WarningCleared(EmergencyKind::NotMoving))
            }
            Some(MovementEvent::Still) => {
                if let Some(e) = self.latch(EmergencyKind::NotMoving) {
                    events.push(e);
                }
            }
            None => {}
        }

        events
    }

    /// 転倒ウォッチャの定期評価（フレームレートと独立の周期で呼ぶ）
    pub fn poll_fall(&mut self, pose: Option<&PoseFrame>, now: Instant) -> Option<SafetyEvent> {
        match self.fall.poll(pose, now) {
            FallPoll::Confirmed => self.latch(EmergencyKind::Fall),
            _ => None,
        }
    }

    /// 全ウォッチャとラッチを初期化する（セッション再開時）
    pub fn reset(&mut self, now: Instant) {
        self.presence.reset(now);
        self.movement.reset(now);
        self.fall.reset();
        self.fired = false;
    }
}
