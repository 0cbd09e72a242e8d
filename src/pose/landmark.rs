use std::collections::HashMap;

/// 評価に使うランドマーク可視度の下限
pub const MIN_VISIBILITY: f32 = 0.5;

/// BlazePose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;
}

/// 単一ランドマーク
///
/// x, y は正規化画像座標 (0.0〜1.0)、z は腰中点を基準とした相対奥行き
/// （カメラに近いほど小さい）。visibility は検出信頼度 (0.0〜1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視度が閾値以上か
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 33ランドマークからなる1フレーム分の姿勢
#[derive(Debug, Clone)]
pub struct PoseFrame {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl PoseFrame {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// 2点の中点（両方可視のときだけ）
    fn midpoint(&self, a: LandmarkIndex, b: LandmarkIndex) -> Option<(f32, f32)> {
        let la = self.get(a);
        let lb = self.get(b);
        if !la.is_visible(MIN_VISIBILITY) || !lb.is_visible(MIN_VISIBILITY) {
            return None;
        }
        Some(((la.x + lb.x) / 2.0, (la.y + lb.y) / 2.0))
    }

    /// 肩中点
    pub fn shoulder_center(&self) -> Option<(f32, f32)> {
        self.midpoint(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder)
    }

    /// 腰中点
    pub fn hip_center(&self) -> Option<(f32, f32)> {
        self.midpoint(LandmarkIndex::LeftHip, LandmarkIndex::RightHip)
    }

    /// 体幹の重心（肩・腰の4点平均）
    pub fn torso_centroid(&self) -> Option<(f32, f32)> {
        let (sx, sy) = self.shoulder_center()?;
        let (hx, hy) = self.hip_center()?;
        Some(((sx + hx) / 2.0, (sy + hy) / 2.0))
    }

    /// 体スケール = 肩中点〜腰中点の距離
    ///
    /// カメラからの距離に比例して縮むため、変位の正規化基準に使う
    pub fn body_scale(&self) -> Option<f32> {
        let (sx, sy) = self.shoulder_center()?;
        let (hx, hy) = self.hip_center()?;
        let scale = ((sx - hx).powi(2) + (sy - hy).powi(2)).sqrt();
        if scale > f32::EPSILON {
            Some(scale)
        } else {
            None
        }
    }
}

impl Default for PoseFrame {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}

/// 表情ブレンドシェイプ係数（名前 → 0.0〜1.0）
#[derive(Debug, Clone, Default)]
pub struct FaceBlend {
    pub coefficients: HashMap<String, f32>,
}

impl FaceBlend {
    pub fn new(coefficients: HashMap<String, f32>) -> Self {
        Self { coefficients }
    }

    pub fn coeff(&self, name: &str) -> f32 {
        self.coefficients.get(name).copied().unwrap_or(0.0)
    }

    /// Left/Right ペア係数の平均（例: "mouthSmile" → mouthSmileLeft/Right）
    pub fn pair(&self, base: &str) -> f32 {
        let left = self.coeff(&format!("{base}Left"));
        let right = self.coeff(&format!("{base}Right"));
        (left + right) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torso_pose() -> PoseFrame {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.4, 0.3, 0.0, 0.9);
        landmarks[LandmarkIndex::RightShoulder as usize] = Landmark::new(0.6, 0.3, 0.0, 0.9);
        landmarks[LandmarkIndex::LeftHip as usize] = Landmark::new(0.4, 0.6, 0.0, 0.9);
        landmarks[LandmarkIndex::RightHip as usize] = Landmark::new(0.6, 0.6, 0.0, 0.9);
        PoseFrame::new(landmarks)
    }

    #[test]
    fn test_landmark_visibility() {
        let lm = Landmark::new(0.5, 0.5, 0.0, 0.7);
        assert!(lm.is_visible(0.5));
        assert!(!lm.is_visible(0.8));
    }

    #[test]
    fn test_centers() {
        let pose = torso_pose();
        let (sx, sy) = pose.shoulder_center().unwrap();
        assert!((sx - 0.5).abs() < 1e-6);
        assert!((sy - 0.3).abs() < 1e-6);
        let (hx, hy) = pose.hip_center().unwrap();
        assert!((hx - 0.5).abs() < 1e-6);
        assert!((hy - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_body_scale() {
        let pose = torso_pose();
        let scale = pose.body_scale().unwrap();
        assert!((scale - 0.3).abs() < 1e-6, "scale={scale}");
    }

    #[test]
    fn test_centers_require_visibility() {
        let mut pose = torso_pose();
        pose.landmarks[LandmarkIndex::LeftHip as usize].visibility = 0.1;
        assert!(pose.shoulder_center().is_some());
        assert!(pose.hip_center().is_none());
        assert!(pose.body_scale().is_none());
    }

    #[test]
    fn test_face_blend_pair() {
        let mut map = HashMap::new();
        map.insert("mouthSmileLeft".to_string(), 0.8);
        map.insert("mouthSmileRight".to_string(), 0.6);
        let face = FaceBlend::new(map);
        assert!((face.pair("mouthSmile") - 0.7).abs() < 1e-6);
        assert_eq!(face.coeff("jawOpen"), 0.0);
    }
}
