use std::collections::HashMap;
use std::collections::VecDeque;

use crate::config::SmoothConfig;
use crate::pose::Landmark;

/// 頂点 b における a-b-c の角度（度、0〜180）
///
/// b→a と b→c の内積から計算。浮動小数の丸めで |cos| が 1 を
/// わずかに超えることがあるため clamp してから acos する
pub fn angle_at(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let (v1x, v1y) = (a.x - b.x, a.y - b.y);
    let (v2x, v2y) = (c.x - b.x, c.y - b.y);

    let len1 = (v1x * v1x + v1y * v1y).sqrt();
    let len2 = (v2x * v2x + v2y * v2y).sqrt();
    if len1 <= f32::EPSILON || len2 <= f32::EPSILON {
        return 0.0;
    }

    let cos = ((v1x * v2x + v1y * v2y) / (len1 * len2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// 2ランドマーク間の距離（正規化画像座標）
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// 関節ラベルごとの移動平均 + ヒステリシス付き角度平滑化
///
/// ウィンドウ平均が前回報告値から hysteresis_deg を超えて動いたときだけ
/// 報告値を更新する。閾値内の揺れは前回値を保持し、下流の状態機械の
/// フリッカを抑える
pub struct AngleSmoother {
    window: usize,
    hysteresis_deg: f32,
    history: HashMap<&'static str, VecDeque<f32>>,
    reported: HashMap<&'static str, f32>,
}

impl AngleSmoother {
    pub fn new(window: usize, hysteresis_deg: f32) -> Self {
        Self {
            window: window.max(1),
            hysteresis_deg,
            history: HashMap::new(),
            reported: HashMap::new(),
        }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.window, config.hysteresis_deg)
    }

    /// 生の角度をウィンドウへ積み、報告値を返す
    pub fn smoothed(&mut self, key: &'static str, raw: f32) -> f32 {
        let history = self.history.entry(key).or_default();
        history.push_back(raw);
        if history.len() > self.window {
            history.pop_front();
        }
        let mean: f32 = history.iter().sum::<f32>() / history.len() as f32;

        match self.reported.get(&key).copied() {
            Some(prev) if (mean - prev).abs() <= self.hysteresis_deg => prev,
            _ => {
                self.reported.insert(key, mean);
                mean
            }
        }
    }

    /// 3ランドマークから角度を計算してから平滑化する
    pub fn smoothed_angle(
        &mut self,
        key: &'static str,
        a: &Landmark,
        b: &Landmark,
        c: &Landmark,
    ) -> f32 {
        self.smoothed(key, angle_at(a, b, c))
    }

    /// 全ウィンドウと報告値を破棄する（セッション切り替え時）
    pub fn reset(&mut self) {
        self.history.clear();
        self.reported.clear();
    }
}
