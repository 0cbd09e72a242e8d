use std::time::{Duration, Instant};

use crate::config::FormConfig;
use crate::pose::{LandmarkIndex, PoseFrame, MIN_VISIBILITY};

use super::{ExerciseKind, JointAngles};

/// 肘が肩より前（カメラ側）に出たとみなす奥行き差
const CURL_ELBOW_DRIFT_Z: f32 = 0.1;
/// スクワット中の膝/足首間隔比の下限
const SQUAT_KNEE_COLLAPSE_RATIO: f32 = 0.7;
/// プレスで肩関節が開きすぎとみなす角度
const PRESS_SHOULDER_FLARE_DEG: f32 = 130.0;
/// レッグエクステンションの過伸展角度
const LEG_HYPEREXTENSION_DEG: f32 = 175.0;

/// 1フレーム評価の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    /// 必要な関節が見えない（評価スキップ、カウンタ据え置き）
    NotVisible,
    /// 問題なし（連続カウンタはゼロに戻る）
    Ok,
    /// 不良フレーム継続中。値は連続フレーム数
    Accumulating(u32),
    /// 閾値到達。修正メッセージを表示する
    Alert(&'static str),
}

/// 持続的なフォーム不良を検出して修正メッセージを1件出す
///
/// 述語が成立するフレームで連続カウンタを進め、1フレームでも良化したら
/// 即ゼロに戻す（猶予や減衰はなし）。警告はフレーム閾値とクールダウンの
/// 両方を満たしたときだけ出す。カウンタ自体はリセットせず、
/// 再警告の間隔はクールダウンのみで制御する
pub struct FormChecker {
    kind: ExerciseKind,
    config: FormConfig,
    consecutive: u32,
    last_alert: Option<Instant>,
}

impl FormChecker {
    pub fn new(kind: ExerciseKind, config: FormConfig) -> Self {
        Self {
            kind,
            config,
            consecutive: 0,
            last_alert: None,
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
        self.last_alert = None;
    }

    /// 種目の修正メッセージ
    pub fn message(&self) -> &'static str {
        match self.kind {
            ExerciseKind::ShoulderPress => "肘が開きすぎです。肩の真上に押し上げてください",
            ExerciseKind::Squat => "膝が内側に入っています。つま先と同じ向きに開いてください",
            ExerciseKind::BicepCurl => "肘が前に出ています。体側に固定してください",
            ExerciseKind::LegExtension => "膝を伸ばしきりすぎです。少し緩めてください",
        }
    }

    pub fn check(&mut self, pose: &PoseFrame, angles: &JointAngles, now: Instant) -> FormStatus {
        let bad = match self.evaluate(pose, angles) {
            Some(bad) => bad,
            None => return FormStatus::NotVisible,
        };

        if !bad {
            self.consecutive = 0;
            return FormStatus::Ok;
        }

        self.consecutive += 1;
        if self.consecutive < self.config.frame_threshold {
            return FormStatus::Accumulating(self.consecutive);
        }

        let cooled = match self.last_alert {
            Some(last) => {
                now.duration_since(last) >= Duration::from_millis(self.config.cooldown_ms)
            }
            None => true,
        };
        if cooled {
            self.last_alert = Some(now);
            FormStatus::Alert(self.message())
        } else {
            FormStatus::Accumulating(self.consecutive)
        }
    }

    /// フレーム単位の不良述語。None = 必要関節が不可視
    fn evaluate(&self, pose: &PoseFrame, angles: &JointAngles) -> Option<bool> {
        match self.kind {
            ExerciseKind::ShoulderPress => {
                // 両肩関節（腰-肩-肘）が開きすぎていないか
                let left = angles.left_shoulder?;
                let right = angles.right_shoulder?;
                Some(left > PRESS_SHOULDER_FLARE_DEG && right > PRESS_SHOULDER_FLARE_DEG)
            }
            ExerciseKind::Squat => {
                // しゃがんでいる間だけ膝の内入りを見る
                let knee = angles.knee()?;
                if knee > ExerciseKind::Squat.rep_profile().contracted_max {
                    return Some(false);
                }
                let left_knee = pose.get(LandmarkIndex::LeftKnee);
                let right_knee = pose.get(LandmarkIndex::RightKnee);
                let left_ankle = pose.get(LandmarkIndex::LeftAnkle);
                let right_ankle = pose.get(LandmarkIndex::RightAnkle);
                for lm in [left_knee, right_knee, left_ankle, right_ankle] {
                    if !lm.is_visible(MIN_VISIBILITY) {
                        return None;
                    }
                }
                let knee_sep = (left_knee.x - right_knee.x).abs();
                let ankle_sep = (left_ankle.x - right_ankle.x).abs();
                if ankle_sep <= f32::EPSILON {
                    return Some(false);
                }
                Some(knee_sep / ankle_sep < SQUAT_KNEE_COLLAPSE_RATIO)
            }
            ExerciseKind::BicepCurl => {
                // カール中（肘が曲がり始めてから）だけ肘の前方流れを見る
                let elbow = angles.elbow()?;
                if elbow >= ExerciseKind::BicepCurl.rep_profile().extended_min {
                    return Some(false);
                }
                let pairs = [
                    (LandmarkIndex::LeftElbow, LandmarkIndex::LeftShoulder),
                    (LandmarkIndex::RightElbow, LandmarkIndex::RightShoulder),
                ];
                let mut any_visible = false;
                let mut drifted = false;
                for (elbow_idx, shoulder_idx) in pairs {
                    let e = pose.get(elbow_idx);
                    let s = pose.get(shoulder_idx);
                    if e.is_visible(MIN_VISIBILITY) && s.is_visible(MIN_VISIBILITY) {
                        any_visible = true;
                        if e.z < s.z - CURL_ELBOW_DRIFT_Z {
                            drifted = true;
                        }
                    }
                }
                if !any_visible {
                    return None;
                }
                Some(drifted)
            }
            ExerciseKind::LegExtension => {
                let knee = angles.knee()?;
                Some(knee > LEG_HYPEREXTENSION_DEG)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;
    use std::time::Duration;

    fn config() -> FormConfig {
        FormConfig {
            frame_threshold: 10,
            cooldown_ms: 3000,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn press_angles(left: f32, right: f32) -> JointAngles {
        JointAngles {
            left_shoulder: Some(left),
            right_shoulder: Some(right),
            ..Default::default()
        }
    }

    /// 不良フレームを n 回流し、最後の状態を返す
    fn feed_bad(
        checker: &mut FormChecker,
        n: usize,
        t: &mut Instant,
    ) -> Vec<FormStatus> {
        let pose = PoseFrame::default();
        let angles = press_angles(140.0, 145.0);
        let mut statuses = Vec::new();
        for _ in 0..n {
            *t += ms(100);
            statuses.push(checker.check(&pose, &angles, *t));
        }
        statuses
    }

    #[test]
    fn test_nine_bad_frames_no_alert() {
        let mut checker = FormChecker::new(ExerciseKind::ShoulderPress, config());
        let mut t = Instant::now();
        let statuses = feed_bad(&mut checker, 9, &mut t);
        assert!(
            statuses
                .iter()
                .all(|s| matches!(s, FormStatus::Accumulating(_))),
            "statuses={statuses:?}"
        );
    }

    #[test]
    fn test_tenth_bad_frame_alerts() {
        let mut checker = FormChecker::new(ExerciseKind::ShoulderPress, config());
        let mut t = Instant::now();
        let statuses = feed_bad(&mut checker, 10, &mut t);
        assert!(matches!(statuses[9], FormStatus::Alert(_)));
    }

    #[test]
    fn test_realert_only_after_cooldown() {
        let mut checker = FormChecker::new(ExerciseKind::ShoulderPress, config());
        let mut t = Instant::now();
        let statuses = feed_bad(&mut checker, 10, &mut t);
        assert!(matches!(statuses[9], FormStatus::Alert(_)));

        // クールダウン内の追加 10 フレームでは再警告しない
        let statuses = feed_bad(&mut checker, 10, &mut t);
        assert!(
            statuses.iter().all(|s| matches!(s, FormStatus::Accumulating(_))),
            "statuses={statuses:?}"
        );

        // クールダウン経過後の不良フレームで再警告（カウンタは積み上がったまま）
        t += ms(3000);
        let pose = PoseFrame::default();
        let angles = press_angles(140.0, 145.0);
        assert!(matches!(
            checker.check(&pose, &angles, t),
            FormStatus::Alert(_)
        ));
    }

    #[test]
    fn test_good_frame_resets_counter() {
        let mut checker = FormChecker::new(ExerciseKind::ShoulderPress, config());
        let mut t = Instant::now();
        feed_bad(&mut checker, 9, &mut t);
        assert_eq!(checker.consecutive(), 9);

        // 1フレームの良化で即ゼロ
        let pose = PoseFrame::default();
        t += ms(100);
        assert_eq!(
            checker.check(&pose, &press_angles(90.0, 95.0), t),
            FormStatus::Ok
        );
        assert_eq!(checker.consecutive(), 0);
    }

    #[test]
    fn test_press_requires_both_shoulders() {
        let mut checker = FormChecker::new(ExerciseKind::ShoulderPress, config());
        let pose = PoseFrame::default();
        let angles = JointAngles {
            left_shoulder: Some(140.0),
            right_shoulder: None,
            ..Default::default()
        };
        assert_eq!(
            checker.check(&pose, &angles, Instant::now()),
            FormStatus::NotVisible
        );
        // 不可視フレームはカウンタを動かさない
        assert_eq!(checker.consecutive(), 0);
    }

    fn squat_pose(knee_sep: f32, ankle_sep: f32) -> PoseFrame {
        let mut pose = PoseFrame::default();
        let set = |pose: &mut PoseFrame, idx: LandmarkIndex, x: f32, y: f32| {
            pose.landmarks[idx as usize] = Landmark::new(x, y, 0.0, 0.9);
        };
        set(&mut pose, LandmarkIndex::LeftKnee, 0.5 - knee_sep / 2.0, 0.6);
        set(&mut pose, LandmarkIndex::RightKnee, 0.5 + knee_sep / 2.0, 0.6);
        set(&mut pose, LandmarkIndex::LeftAnkle, 0.5 - ankle_sep / 2.0, 0.8);
        set(&mut pose, LandmarkIndex::RightAnkle, 0.5 + ankle_sep / 2.0, 0.8);
        pose
    }

    #[test]
    fn test_squat_knee_collapse_only_while_squatting() {
        let mut checker = FormChecker::new(ExerciseKind::Squat, config());
        let t = Instant::now();
        let collapsed = squat_pose(0.1, 0.2); // 比 0.5 < 0.7

        // 立っている間（膝角度が大きい間）は不良にしない
        let standing = JointAngles {
            left_knee: Some(170.0),
            right_knee: Some(170.0),
            ..Default::default()
        };
        assert_eq!(checker.check(&collapsed, &standing, t), FormStatus::Ok);

        // しゃがみ中は比率で判定
        let squatting = JointAngles {
            left_knee: Some(90.0),
            right_knee: Some(90.0),
            ..Default::default()
        };
        assert_eq!(
            checker.check(&collapsed, &squatting, t),
            FormStatus::Accumulating(1)
        );

        let open = squat_pose(0.2, 0.2); // 比 1.0
        assert_eq!(checker.check(&open, &squatting, t), FormStatus::Ok);
    }

    fn curl_pose(elbow_z: f32, shoulder_z: f32) -> PoseFrame {
        let mut pose = PoseFrame::default();
        pose.landmarks[LandmarkIndex::LeftElbow as usize] =
            Landmark::new(0.4, 0.5, elbow_z, 0.9);
        pose.landmarks[LandmarkIndex::LeftShoulder as usize] =
            Landmark::new(0.4, 0.3, shoulder_z, 0.9);
        pose
    }

    #[test]
    fn test_curl_elbow_drift() {
        let mut checker = FormChecker::new(ExerciseKind::BicepCurl, config());
        let t = Instant::now();
        let curling = JointAngles {
            left_elbow: Some(80.0),
            ..Default::default()
        };

        // 肘が肩よりカメラ側に大きく出ている → 不良
        let drifted = curl_pose(-0.3, -0.1);
        assert_eq!(
            checker.check(&drifted, &curling, t),
            FormStatus::Accumulating(1)
        );

        // 体側に収まっていれば良
        let aligned = curl_pose(-0.12, -0.1);
        assert_eq!(checker.check(&aligned, &curling, t), FormStatus::Ok);

        // 伸ばしきっている間は判定しない
        let extended = JointAngles {
            left_elbow: Some(170.0),
            ..Default::default()
        };
        assert_eq!(checker.check(&drifted, &extended, t), FormStatus::Ok);
    }

    #[test]
    fn test_leg_hyperextension() {
        let mut checker = FormChecker::new(ExerciseKind::LegExtension, config());
        let t = Instant::now();
        let pose = PoseFrame::default();
        let locked = JointAngles {
            left_knee: Some(178.0),
            right_knee: Some(178.0),
            ..Default::default()
        };
        assert_eq!(checker.check(&pose, &locked, t), FormStatus::Accumulating(1));

        let fine = JointAngles {
            left_knee: Some(160.0),
            right_knee: Some(160.0),
            ..Default::default()
        };
        assert_eq!(checker.check(&pose, &fine, t), FormStatus::Ok);
    }
}
