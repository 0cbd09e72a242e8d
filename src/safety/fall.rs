use std::time::{Duration, Instant};

use crate::config::FallConfig;
use crate::pose::PoseFrame;

/// 1回の定期評価の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallPoll {
    /// 周期未到達・体幹不可視などで評価せず
    Skipped,
    /// 傾き正常（連続カウンタをゼロに戻した）
    Upright,
    /// 傾き超過継続中。値は連続回数
    Tilted(u32),
    /// 転倒確定
    Confirmed,
}

/// 体幹の鉛直からの傾き（度）
///
/// 肩中点と腰中点を結ぶベクトルが画像の上方向からどれだけ傾いているか。
/// 直立で 0°、横倒れで 90° 前後
pub fn trunk_tilt_deg(pose: &PoseFrame) -> Option<f32> {
    let (sx, sy) = pose.shoulder_center()?;
    let (hx, hy) = pose.hip_center()?;
    let dx = sx - hx;
    // 画像座標は下が正。直立なら肩は腰より上 = dy < 0
    let dy = sy - hy;
    if dx.abs() <= f32::EPSILON && dy.abs() <= f32::EPSILON {
        return None;
    }
    Some(f32::atan2(dx.abs(), -dy).to_degrees())
}

/// 体幹傾きの定期監視
///
/// フレームレートとは独立した周期で評価し、閾値超過が規定回数
/// 連続したときだけ転倒と確定する。1回でも閾値を下回れば
/// カウンタはゼロに戻る。体幹が見えない評価はカウンタを据え置く
pub struct FallWatcher {
    config: FallConfig,
    last_poll: Option<Instant>,
    consecutive: u32,
}

impl FallWatcher {
    pub fn new(config: FallConfig) -> Self {
        Self {
            config,
            last_poll: None,
            consecutive: 0,
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.last_poll = None;
        self.consecutive = 0;
    }

    pub fn poll(&mut self, pose: Option<&PoseFrame>, now: Instant) -> FallPoll {
        if let Some(last) = self.last_poll {
            if now.duration_since(last) < Duration::from_millis(self.config.poll_ms) {
                return FallPoll::Skipped;
            }
        }
        self.last_poll = Some(now);

        let tilt = match pose.and_then(trunk_tilt_deg) {
            Some(tilt) => tilt,
            None => return FallPoll::Skipped,
        };

        if tilt > self.config.tilt_deg {
            self.consecutive += 1;
            if self.consecutive >= self.config.consecutive {
                log::warn!("転倒確定 (傾き {tilt:.1}°, 連続 {}回)", self.consecutive);
                FallPoll::Confirmed
            } else {
                FallPoll::Tilted(self.consecutive)
            }
        } else {
            self.consecutive = 0;
            FallPoll::Upright
        }
    }
}
