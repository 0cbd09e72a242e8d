use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use super::landmark::{FaceBlend, Landmark, LandmarkIndex, PoseFrame};

/// 推論エンジンが1フレームに対して返す結果
///
/// pose が None のフレームは「人物が写っていない」として扱う
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    pub pose: Option<PoseFrame>,
    pub face: Option<FaceBlend>,
}

/// ランドマーク供給源の境界
///
/// 推論本体は外部実装（ブラウザ/ネイティブの推論ランタイム）。
/// このクレートからは「フレーム → 結果」の列としてだけ見える
pub trait LandmarkSource {
    /// 次フレームの結果。Ok(None) でストリーム終了
    ///
    /// Duration はセッション開始からの経過時間
    fn next_frame(&mut self) -> Result<Option<(Duration, FrameResult)>>;
}

/// トレースファイルの1行
#[derive(Debug, Deserialize)]
struct TraceRecord {
    /// セッション開始からの経過（ミリ秒）
    t_ms: u64,
    /// 33要素の [x, y, z, visibility]。無ければ人物非検出フレーム
    #[serde(default)]
    pose: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    face: Option<HashMap<String, f32>>,
}

/// 記録済みランドマークトレース（JSON Lines）を再生する供給源
///
/// 実カメラ・実推論なしでエンジンを駆動するための唯一の同梱実装
pub struct TraceSource<R: BufRead> {
    reader: R,
    line_no: usize,
}

impl TraceSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }

    fn parse(record: TraceRecord) -> FrameResult {
        let pose = record.pose.and_then(|points| {
            if points.len() != LandmarkIndex::COUNT {
                log::warn!(
                    "ランドマーク数が不正です ({} != {})。人物非検出として扱います",
                    points.len(),
                    LandmarkIndex::COUNT
                );
                return None;
            }
            let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
            for (i, [x, y, z, visibility]) in points.into_iter().enumerate() {
                landmarks[i] = Landmark::new(x, y, z, visibility);
            }
            Some(PoseFrame::new(landmarks))
        });
        let face = record.face.map(FaceBlend::new);
        FrameResult { pose, face }
    }
}

impl<R: BufRead> LandmarkSource for TraceSource<R> {
    fn next_frame(&mut self) -> Result<Option<(Duration, FrameResult)>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TraceRecord>(trimmed) {
                Ok(record) => {
                    let at = Duration::from_millis(record.t_ms);
                    return Ok(Some((at, Self::parse(record))));
                }
                Err(e) => {
                    // 壊れた行はスキップして続行
                    log::warn!("トレース {}行目を読めません ({e})", self.line_no);
                }
            }
        }
    }
}
