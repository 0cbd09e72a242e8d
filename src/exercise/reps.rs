use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::RepConfig;

/// レップ判定フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepPhase {
    /// セッション開始直後、まだフェーズが確定していない
    Unknown,
    /// 両閾値の中間。状態更新にもカウントにも使わない
    Transition,
    Contracted,
    Extended,
}

/// 種目ごとの角度閾値とサイクル起点
#[derive(Debug, Clone, Copy)]
pub struct RepProfile {
    /// この角度以下で「曲げ」
    pub contracted_max: f32,
    /// この角度以上で「伸ばし」
    pub extended_min: f32,
    /// サイクルの起点フェーズ。anchor → 逆 → anchor で1回
    pub anchor: RepPhase,
}

impl RepProfile {
    fn classify(&self, angle: f32) -> RepPhase {
        if angle <= self.contracted_max {
            RepPhase::Contracted
        } else if angle >= self.extended_min {
            RepPhase::Extended
        } else {
            RepPhase::Transition
        }
    }

    fn other(&self) -> RepPhase {
        match self.anchor {
            RepPhase::Contracted => RepPhase::Extended,
            _ => RepPhase::Contracted,
        }
    }
}

/// 1フレーム評価の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepUpdate {
    /// 対象関節が見えない（評価スキップ）
    NotVisible,
    /// 状態変化なし
    Idle,
    /// フェーズ遷移を受理した
    PhaseChanged(RepPhase),
    /// レップ成立。値は累計回数
    Counted(u32),
    /// サイクルが速すぎてカウントしなかった
    TooFast,
}

/// フェーズ履歴長（非Transitionのみ記録）
const PHASE_HISTORY: usize = 3;
/// フェーズ遷移の受理に必要な履歴一致数
const PHASE_AGREEMENT: usize = 2;

/// 平滑化角度の時系列を単調増加のレップ数へ変換する状態機械
///
/// ノイズと中途半端な動作に耐えるため、遷移は
/// (1) 履歴 3 件中 2 件の一致、(2) 直前フェーズの最小保持時間、
/// (3) 前回カウントからのクールダウン、の3つの関門を通す。
/// カウントは anchor → 逆フェーズ → anchor の完全サイクルのみ
pub struct RepCounter {
    profile: RepProfile,
    config: RepConfig,
    started_at: Instant,
    phase: RepPhase,
    phase_since: Option<Instant>,
    history: VecDeque<RepPhase>,
    /// サイクルを進める次の要求フェーズ
    expected: RepPhase,
    /// 現サイクルの anchor 通過時刻
    cycle_started_at: Option<Instant>,
    reps: u32,
    too_fast: u32,
    last_counted: Option<Instant>,
}

impl RepCounter {
    pub fn new(profile: RepProfile, config: RepConfig, now: Instant) -> Self {
        Self {
            profile,
            config,
            started_at: now,
            phase: RepPhase::Unknown,
            phase_since: None,
            history: VecDeque::with_capacity(PHASE_HISTORY),
            expected: profile.anchor,
            cycle_started_at: None,
            reps: 0,
            too_fast: 0,
            last_counted: None,
        }
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn too_fast(&self) -> u32 {
        self.too_fast
    }

    pub fn phase(&self) -> RepPhase {
        self.phase
    }

    /// 初期状態に戻す（種目切り替え・セッション再開時）
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(self.profile, self.config.clone(), now);
    }

    /// 平滑化済み角度で1フレーム評価する
    ///
    /// angle=None は関節不可視。状態を一切動かさない
    pub fn update(&mut self, angle: Option<f32>, now: Instant) -> RepUpdate {
        let Some(angle) = angle else {
            return RepUpdate::NotVisible;
        };

        // ウォームアップ中は姿勢を整えている段階なので評価しない
        if now.duration_since(self.started_at) < Duration::from_millis(self.config.warmup_ms) {
            return RepUpdate::Idle;
        }

        let raw = self.profile.classify(angle);
        if raw == RepPhase::Transition {
            return RepUpdate::Idle;
        }

        self.history.push_back(raw);
        if self.history.len() > PHASE_HISTORY {
            self.history.pop_front();
        }

        if raw == self.phase {
            return RepUpdate::Idle;
        }

        // フリッカ除去: 履歴の多数が新フェーズに一致しているか
        let agreement = self.history.iter().filter(|p| **p == raw).count();
        if agreement < PHASE_AGREEMENT {
            return RepUpdate::Idle;
        }

        // 保持時間: 直前フェーズを十分維持してからの遷移だけ受理
        if self.phase != RepPhase::Unknown {
            if let Some(since) = self.phase_since {
                if now.duration_since(since) < Duration::from_millis(self.config.min_hold_ms) {
                    return RepUpdate::Idle;
                }
            }
        }

        // クールダウン: カウント直後の遷移連打を抑止
        if let Some(last) = self.last_counted {
            if now.duration_since(last) < Duration::from_millis(self.config.cooldown_ms) {
                return RepUpdate::Idle;
            }
        }

        self.phase = raw;
        self.phase_since = Some(now);

        if raw != self.expected {
            // 起点前に逆フェーズから始まった場合など。ポインタは動かさない
            return RepUpdate::PhaseChanged(raw);
        }

        if raw == self.profile.anchor {
            match self.cycle_started_at.replace(now) {
                Some(cycle_start) => {
                    // anchor → 逆 → anchor の完全サイクルが閉じた
                    self.expected = self.profile.other();
                    let cycle = now.duration_since(cycle_start);
                    if cycle >= Duration::from_millis(self.config.min_rep_ms) {
                        self.reps += 1;
                        self.last_counted = Some(now);
                        log::debug!("レップ成立 #{} (サイクル {:?})", self.reps, cycle);
                        RepUpdate::Counted(self.reps)
                    } else {
                        self.too_fast += 1;
                        log::debug!("サイクルが速すぎます ({:?})", cycle);
                        RepUpdate::TooFast
                    }
                }
                None => {
                    // 最初の anchor 通過。ここからサイクル計測を始める
                    self.expected = self.profile.other();
                    RepUpdate::PhaseChanged(raw)
                }
            }
        } else {
            self.expected = self.profile.anchor;
            RepUpdate::PhaseChanged(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_profile() -> RepProfile {
        RepProfile {
            contracted_max: 100.0,
            extended_min: 150.0,
            anchor: RepPhase::Extended,
        }
    }

    fn config() -> RepConfig {
        RepConfig {
            warmup_ms: 0,
            min_hold_ms: 500,
            cooldown_ms: 800,
            min_rep_ms: 2000,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// angle を 100ms 間隔で n フレーム流す
    fn feed(counter: &mut RepCounter, angle: f32, n: usize, t: &mut Instant) -> Vec<RepUpdate> {
        let mut updates = Vec::new();
        for _ in 0..n {
            *t += ms(100);
            updates.push(counter.update(Some(angle), *t));
        }
        updates
    }

    #[test]
    fn test_full_cycle_counts_once() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(press_profile(), config(), t0);

        // 伸ばし → 曲げ → 伸ばし。サイクルは anchor 受理 (0.2s) から
        // anchor 再受理 (2.4s) までの 2.2s で最小時間 2s を超える
        feed(&mut c, 160.0, 7, &mut t);
        feed(&mut c, 45.0, 15, &mut t);
        let updates = feed(&mut c, 160.0, 8, &mut t);

        assert_eq!(c.reps(), 1);
        assert!(
            updates.contains(&RepUpdate::Counted(1)),
            "updates={updates:?}"
        );
    }

    #[test]
    fn test_oscillation_around_threshold_never_counts() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(press_profile(), config(), t0);

        // 150° の伸ばし閾値まわりで 145↔155 を往復しても振幅不足でカウントしない
        for _ in 0..30 {
            feed(&mut c, 155.0, 1, &mut t);
            feed(&mut c, 145.0, 1, &mut t);
        }
        assert_eq!(c.reps(), 0);
        assert_eq!(c.too_fast(), 0);
    }

    #[test]
    fn test_too_fast_cycle_warns_instead_of_counting() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(
            press_profile(),
            RepConfig {
                min_hold_ms: 100,
                cooldown_ms: 0,
                ..config()
            },
            t0,
        );

        // 各フェーズ 300ms、サイクル全体 ~1.2s < 2s
        feed(&mut c, 160.0, 3, &mut t);
        feed(&mut c, 45.0, 3, &mut t);
        let updates = feed(&mut c, 160.0, 3, &mut t);

        assert_eq!(c.reps(), 0);
        assert_eq!(c.too_fast(), 1);
        assert!(updates.contains(&RepUpdate::TooFast), "updates={updates:?}");
    }

    #[test]
    fn test_single_flicker_frame_rejected() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(press_profile(), config(), t0);

        feed(&mut c, 160.0, 7, &mut t);
        assert_eq!(c.phase(), RepPhase::Extended);

        // 1フレームだけ曲げ側に振れても履歴 2/3 を満たさず棄却
        let updates = feed(&mut c, 45.0, 1, &mut t);
        assert_eq!(updates, vec![RepUpdate::Idle]);
        assert_eq!(c.phase(), RepPhase::Extended);
    }

    #[test]
    fn test_hold_gate_blocks_quick_transition() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(press_profile(), config(), t0);

        // 伸ばしを 200ms しか維持せずに曲げへ → min_hold 500ms 未満で棄却
        feed(&mut c, 160.0, 2, &mut t);
        assert_eq!(c.phase(), RepPhase::Extended);
        let updates = feed(&mut c, 45.0, 2, &mut t);
        assert!(
            !updates
                .iter()
                .any(|u| matches!(u, RepUpdate::PhaseChanged(_))),
            "updates={updates:?}"
        );
        assert_eq!(c.phase(), RepPhase::Extended);
    }

    #[test]
    fn test_cooldown_after_count() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(
            press_profile(),
            RepConfig {
                min_hold_ms: 100,
                cooldown_ms: 5000,
                ..config()
            },
            t0,
        );

        feed(&mut c, 160.0, 7, &mut t);
        feed(&mut c, 45.0, 15, &mut t);
        feed(&mut c, 160.0, 8, &mut t);
        assert_eq!(c.reps(), 1);

        // カウント直後のクールダウン中はフェーズ遷移を受理しない
        let updates = feed(&mut c, 45.0, 8, &mut t);
        assert!(
            !updates
                .iter()
                .any(|u| matches!(u, RepUpdate::PhaseChanged(_))),
            "updates={updates:?}"
        );
        assert_eq!(c.phase(), RepPhase::Extended);
    }

    #[test]
    fn test_not_visible_freezes_state() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(press_profile(), config(), t0);

        feed(&mut c, 160.0, 7, &mut t);
        let before = c.phase();
        t += ms(100);
        assert_eq!(c.update(None, t), RepUpdate::NotVisible);
        assert_eq!(c.phase(), before);
    }

    #[test]
    fn test_warmup_ignores_frames() {
        let t0 = Instant::now();
        let mut c = RepCounter::new(
            press_profile(),
            RepConfig {
                warmup_ms: 3000,
                ..config()
            },
            t0,
        );

        // ウォームアップ中はフェーズすら確定しない
        for i in 1..=10 {
            assert_eq!(c.update(Some(160.0), t0 + ms(i * 100)), RepUpdate::Idle);
        }
        assert_eq!(c.phase(), RepPhase::Unknown);

        // 経過後は通常どおり
        assert_eq!(c.update(Some(160.0), t0 + ms(3100)), RepUpdate::Idle);
        assert!(matches!(
            c.update(Some(160.0), t0 + ms(3200)),
            RepUpdate::PhaseChanged(RepPhase::Extended)
        ));
    }

    #[test]
    fn test_curl_anchor_contracted() {
        let profile = RepProfile {
            contracted_max: 50.0,
            extended_min: 150.0,
            anchor: RepPhase::Contracted,
        };
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(profile, config(), t0);

        // 曲げ → 伸ばし → 曲げ で1回（カール系）
        feed(&mut c, 40.0, 7, &mut t);
        feed(&mut c, 160.0, 15, &mut t);
        feed(&mut c, 40.0, 8, &mut t);
        assert_eq!(c.reps(), 1);

        // 逆順（伸ばし起点）では途中までしか進まない
        let mut t2 = t0;
        let mut c2 = RepCounter::new(profile, config(), t0);
        feed(&mut c2, 160.0, 7, &mut t2);
        feed(&mut c2, 40.0, 8, &mut t2);
        assert_eq!(c2.reps(), 0);
    }

    #[test]
    fn test_reset_zeroes_counter() {
        let t0 = Instant::now();
        let mut t = t0;
        let mut c = RepCounter::new(press_profile(), config(), t0);
        feed(&mut c, 160.0, 7, &mut t);
        feed(&mut c, 45.0, 15, &mut t);
        feed(&mut c, 160.0, 8, &mut t);
        assert_eq!(c.reps(), 1);

        c.reset(t);
        assert_eq!(c.reps(), 0);
        assert_eq!(c.phase(), RepPhase::Unknown);
    }
}
