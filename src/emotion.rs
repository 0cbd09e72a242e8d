use crate::pose::FaceBlend;

/// 笑顔とみなす mouthSmile 係数
const SMILE_THRESHOLD: f32 = 0.6;
/// 力み・苦悶とみなす browDown 係数
const STRAIN_BROW_THRESHOLD: f32 = 0.5;
/// 力み判定の補助係数（目の細まり / 口の引き結び）
const STRAIN_AUX_THRESHOLD: f32 = 0.4;
/// 疲労（長い閉眼）とみなす eyeBlink 係数
const FATIGUE_EYE_THRESHOLD: f32 = 0.7;
/// 通知までの連続フレーム数
const SUSTAIN_FRAMES: u32 = 15;

/// 検出対象の表情
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Smile,
    Strain,
    Fatigue,
}

impl Emotion {
    /// 表情に応じた声かけメッセージ
    pub fn message(&self) -> &'static str {
        match self {
            Self::Smile => "いい笑顔です！その調子",
            Self::Strain => "無理は禁物です。重量を見直しましょう",
            Self::Fatigue => "疲れが見えます。少し休憩を入れましょう",
        }
    }
}

/// 表情係数の持続からひとつの表情イベントを立てる
///
/// 各シグナルは顔が写っているフレームで連続カウントし、規定回数
/// 続いたら1回だけ通知する。シグナルが途切れるまで再通知しない。
/// 顔なしフレームは全カウンタをリセットする
pub struct EmotionWatcher {
    smile_frames: u32,
    strain_frames: u32,
    fatigue_frames: u32,
    /// 発火済みで、シグナルが落ちるのを待っている表情
    latched: Option<Emotion>,
}

impl EmotionWatcher {
    pub fn new() -> Self {
        Self {
            smile_frames: 0,
            strain_frames: 0,
            fatigue_frames: 0,
            latched: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn observe(&mut self, face: Option<&FaceBlend>) -> Option<Emotion> {
        let Some(face) = face else {
            self.smile_frames = 0;
            self.strain_frames = 0;
            self.fatigue_frames = 0;
            return None;
        };

        let smile = face.pair("mouthSmile") > SMILE_THRESHOLD;
        let strain = face.pair("browDown") > STRAIN_BROW_THRESHOLD
            && (face.pair("eyeSquint") > STRAIN_AUX_THRESHOLD
                || face.pair("mouthPress") > STRAIN_AUX_THRESHOLD);
        let fatigue = face.coeff("eyeBlinkLeft") > FATIGUE_EYE_THRESHOLD
            && face.coeff("eyeBlinkRight") > FATIGUE_EYE_THRESHOLD;

        self.smile_frames = if smile { self.smile_frames + 1 } else { 0 };
        self.strain_frames = if strain { self.strain_frames + 1 } else { 0 };
        self.fatigue_frames = if fatigue { self.fatigue_frames + 1 } else { 0 };

        // 発火済み表情はシグナルが落ちたら再武装する
        if let Some(latched) = self.latched {
            let active = match latched {
                Emotion::Smile => smile,
                Emotion::Strain => strain,
                Emotion::Fatigue => fatigue,
            };
            if active {
                return None;
            }
            self.latched = None;
        }

        // 苦悶 > 疲労 > 笑顔 の優先順
        let candidates = [
            (Emotion::Strain, self.strain_frames),
            (Emotion::Fatigue, self.fatigue_frames),
            (Emotion::Smile, self.smile_frames),
        ];
        for (emotion, frames) in candidates {
            if frames >= SUSTAIN_FRAMES {
                self.latched = Some(emotion);
                return Some(emotion);
            }
        }
        None
    }
}

impl Default for EmotionWatcher {
    fn default() -> Self {
        Self::new()
    }
}
