use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::MovementConfig;
use crate::pose::PoseFrame;

/// 重心移動の観測結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementEvent {
    /// 静止継続中。remaining は緊急までの残り時間
    Warning { remaining: Duration },
    /// 動きを検出して警告解除
    WarningCleared,
    /// 静止が緊急ウィンドウを超過
    Still,
}

struct Sample {
    x: f32,
    y: f32,
    scale: f32,
}

/// 体重心の移動量から「固まっている」状態を検出する
///
/// 重心は体スケール（肩中点〜腰中点距離）で正規化するため、
/// カメラからの距離が変わっても同じ動作は同じ変位になる
pub struct MovementWatcher {
    config: MovementConfig,
    samples: VecDeque<Sample>,
    last_movement: Instant,
    warned: bool,
}

impl MovementWatcher {
    pub fn new(config: MovementConfig, now: Instant) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
            last_movement: now,
            warned: false,
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.samples.clear();
        self.last_movement = now;
        self.warned = false;
    }

    /// 人物非検出で観測が途切れたときに呼ぶ
    ///
    /// 静止時間は連続して観測できている間だけ数える。途切れたら
    /// バッファを捨ててタイマーを巻き戻す（不在そのものは在席監視の領分）
    pub fn interrupt(&mut self, now: Instant) -> Option<MovementEvent> {
        self.samples.clear();
        self.last_movement = now;
        if self.warned {
            self.warned = false;
            return Some(MovementEvent::WarningCleared);
        }
        None
    }

    /// バッファ内の隣接サンプル間平均変位（体スケール正規化済み）
    pub fn normalized_displacement(&self) -> Option<f32> {
        if self.samples.len() < 2 {
            return None;
        }
        let mut total = 0.0;
        let mut steps = 0usize;
        let mut prev: Option<&Sample> = None;
        for sample in &self.samples {
            if let Some(p) = prev {
                let step = ((sample.x - p.x).powi(2) + (sample.y - p.y).powi(2)).sqrt();
                let scale = (sample.scale + p.scale) / 2.0;
                if scale > f32::EPSILON {
                    total += step / scale;
                    steps += 1;
                }
            }
            prev = Some(sample);
        }
        if steps == 0 {
            None
        } else {
            Some(total / steps as f32)
        }
    }

    pub fn observe(&mut self, pose: &PoseFrame, now: Instant) -> Option<MovementEvent> {
        // 体幹が見えないフレームはサンプルにしない
        let (x, y) = pose.torso_centroid()?;
        let scale = pose.body_scale()?;

        self.samples.push_back(Sample { x, y, scale });
        if self.samples.len() > self.config.buffer {
            self.samples.pop_front();
        }

        let displacement = self.normalized_displacement();
        if displacement.map_or(true, |d| d >= self.config.min_displacement) {
            // バッファが温まるまでは静止扱いにしない
            self.last_movement = now;
            if self.warned {
                self.warned = false;
                return Some(MovementEvent::WarningCleared);
            }
            return None;
        }

        let still = now.duration_since(self.last_movement);
        let emergency = Duration::from_millis(self.config.emergency_ms);
        if still >= emergency {
            return Some(MovementEvent::Still);
        }
        if still >= Duration::from_millis(self.config.warn_ms) {
            self.warned = true;
            return Some(MovementEvent::Warning {
                remaining: emergency - still,
            });
        }
        None
    }
}
