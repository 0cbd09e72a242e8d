pub mod form;
pub mod reps;

pub use form::{FormChecker, FormStatus};
pub use reps::{RepCounter, RepPhase, RepProfile, RepUpdate};

/// 対応種目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    ShoulderPress,
    Squat,
    BicepCurl,
    LegExtension,
}

/// レップ判定に使う関節
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedJoint {
    Elbow,
    Knee,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::ShoulderPress,
        ExerciseKind::Squat,
        ExerciseKind::BicepCurl,
        ExerciseKind::LegExtension,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "shoulder_press" => Some(Self::ShoulderPress),
            "squat" => Some(Self::Squat),
            "bicep_curl" => Some(Self::BicepCurl),
            "leg_extension" => Some(Self::LegExtension),
            _ => None,
        }
    }

    /// セッションAPIに送る種目ID
    pub fn as_id(&self) -> &'static str {
        match self {
            Self::ShoulderPress => "shoulder_press",
            Self::Squat => "squat",
            Self::BicepCurl => "bicep_curl",
            Self::LegExtension => "leg_extension",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ShoulderPress => "ショルダープレス",
            Self::Squat => "スクワット",
            Self::BicepCurl => "アームカール",
            Self::LegExtension => "レッグエクステンション",
        }
    }

    pub fn tracked_joint(&self) -> TrackedJoint {
        match self {
            Self::ShoulderPress | Self::BicepCurl => TrackedJoint::Elbow,
            Self::Squat | Self::LegExtension => TrackedJoint::Knee,
        }
    }

    /// 種目ごとの角度閾値とサイクル起点
    ///
    /// プレス・スクワットは伸ばし→曲げ→伸ばしで1回、
    /// カール・レッグエクステンションは曲げ→伸ばし→曲げで1回
    pub fn rep_profile(&self) -> RepProfile {
        match self {
            Self::ShoulderPress => RepProfile {
                contracted_max: 100.0,
                extended_min: 150.0,
                anchor: RepPhase::Extended,
            },
            Self::Squat => RepProfile {
                contracted_max: 100.0,
                extended_min: 160.0,
                anchor: RepPhase::Extended,
            },
            Self::BicepCurl => RepProfile {
                contracted_max: 50.0,
                extended_min: 150.0,
                anchor: RepPhase::Contracted,
            },
            Self::LegExtension => RepProfile {
                contracted_max: 110.0,
                extended_min: 160.0,
                anchor: RepPhase::Contracted,
            },
        }
    }

    /// フェーズのUI表示名（種目に合わせた言い回し）
    pub fn phase_label(&self, phase: RepPhase) -> &'static str {
        match (self, phase) {
            (_, RepPhase::Unknown) => "判定中",
            (_, RepPhase::Transition) => "動作中",
            (Self::Squat, RepPhase::Extended) => "立ち",
            (Self::Squat, RepPhase::Contracted) => "しゃがみ",
            (_, RepPhase::Extended) => "伸ばし",
            (_, RepPhase::Contracted) => "曲げ",
        }
    }
}

/// 1フレーム分の平滑化済み関節角度（不可視の側は None）
#[derive(Debug, Clone, Copy, Default)]
pub struct JointAngles {
    pub left_elbow: Option<f32>,
    pub right_elbow: Option<f32>,
    pub left_knee: Option<f32>,
    pub right_knee: Option<f32>,
    pub left_shoulder: Option<f32>,
    pub right_shoulder: Option<f32>,
}

impl JointAngles {
    fn mean(a: Option<f32>, b: Option<f32>) -> Option<f32> {
        match (a, b) {
            (Some(a), Some(b)) => Some((a + b) / 2.0),
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        }
    }

    /// 可視な側の肘角度の平均
    pub fn elbow(&self) -> Option<f32> {
        Self::mean(self.left_elbow, self.right_elbow)
    }

    /// 可視な側の膝角度の平均
    pub fn knee(&self) -> Option<f32> {
        Self::mean(self.left_knee, self.right_knee)
    }

    /// 種目の判定対象関節の角度
    pub fn for_joint(&self, joint: TrackedJoint) -> Option<f32> {
        match joint {
            TrackedJoint::Elbow => self.elbow(),
            TrackedJoint::Knee => self.knee(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_id_roundtrip() {
        for kind in ExerciseKind::ALL {
            assert_eq!(ExerciseKind::from_id(kind.as_id()), Some(kind));
        }
        assert_eq!(ExerciseKind::from_id("yoga"), None);
    }

    #[test]
    fn test_cycle_anchor_per_kind() {
        assert_eq!(
            ExerciseKind::ShoulderPress.rep_profile().anchor,
            RepPhase::Extended
        );
        assert_eq!(ExerciseKind::Squat.rep_profile().anchor, RepPhase::Extended);
        assert_eq!(
            ExerciseKind::BicepCurl.rep_profile().anchor,
            RepPhase::Contracted
        );
        assert_eq!(
            ExerciseKind::LegExtension.rep_profile().anchor,
            RepPhase::Contracted
        );
    }

    #[test]
    fn test_joint_angle_mean_uses_visible_side() {
        let angles = JointAngles {
            left_elbow: Some(100.0),
            right_elbow: None,
            ..Default::default()
        };
        assert_eq!(angles.elbow(), Some(100.0));

        let both = JointAngles {
            left_elbow: Some(100.0),
            right_elbow: Some(120.0),
            ..Default::default()
        };
        assert_eq!(both.elbow(), Some(110.0));

        assert_eq!(JointAngles::default().knee(), None);
    }
}
