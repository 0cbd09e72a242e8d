use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::emotion::EmotionWatcher;
use crate::exercise::{
    ExerciseKind, FormChecker, FormStatus, JointAngles, RepCounter, RepPhase, RepUpdate,
};
use crate::geom::AngleSmoother;
use crate::notify::{Category, Notification, NotificationThrottle};
use crate::pose::{FrameResult, LandmarkIndex, PoseFrame, MIN_VISIBILITY};
use crate::safety::{EmergencyKind, SafetyEvent, SafetyMonitor};

/// 1フレーム処理で発生したイベント
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// スロットルを通過した通知
    Notification(Notification),
    PhaseChanged(RepPhase),
    /// レップ成立。値は累計回数
    RepCounted(u32),
    /// 緊急までのカウントダウン付き警告
    SafetyWarning {
        kind: EmergencyKind,
        remaining: Duration,
    },
    SafetyWarningCleared(EmergencyKind),
    /// 緊急通報。呼び出し側はここでセッションAPIの emergency を叩く
    Emergency(EmergencyKind),
}

/// セッション終了時にAPIへ送る要約
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub exercise: ExerciseKind,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub reps: u32,
    pub too_fast: u32,
    pub emergency: bool,
}

/// 進行中セッションの全トラッカー
///
/// セッション停止で丸ごと破棄する（再開は常にクリーンな状態から）
struct ActiveSession {
    exercise: ExerciseKind,
    started_wall: DateTime<Utc>,
    smoother: AngleSmoother,
    throttle: NotificationThrottle,
    emotion: EmotionWatcher,
    safety: SafetyMonitor,
    reps: RepCounter,
    form: FormChecker,
    last_pose: Option<PoseFrame>,
    person_visible: bool,
}

/// フレーム駆動のトラッキングエンジン
///
/// 単一スレッド前提。毎フレーム process_frame を、それとは独立の
/// 周期で tick を呼ぶ。どちらも内部状態だけを更新し、UIや通信への
/// 副作用は返したイベントに委ねる
pub struct Engine {
    config: Config,
    session: Option<ActiveSession>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn session_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn exercise(&self) -> Option<ExerciseKind> {
        self.session.as_ref().map(|s| s.exercise)
    }

    pub fn reps(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.reps.reps())
    }

    pub fn phase(&self) -> RepPhase {
        self.session
            .as_ref()
            .map_or(RepPhase::Unknown, |s| s.reps.phase())
    }

    pub fn emergency_fired(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.safety.emergency_fired())
    }

    /// 種目を選んでトラッキングを開始する
    ///
    /// 進行中のセッションがあれば破棄してクリーンに始める
    pub fn start_session(&mut self, exercise: ExerciseKind, now: Instant) {
        log::info!("セッション開始: {}", exercise.label());
        self.session = Some(ActiveSession {
            exercise,
            started_wall: Utc::now(),
            smoother: AngleSmoother::from_config(&self.config.smooth),
            throttle: NotificationThrottle::new(self.config.notify.clone()),
            emotion: EmotionWatcher::new(),
            safety: SafetyMonitor::new(
                self.config.presence.clone(),
                self.config.movement.clone(),
                self.config.fall.clone(),
                now,
            ),
            reps: RepCounter::new(exercise.rep_profile(), self.config.rep.clone(), now),
            form: FormChecker::new(exercise, self.config.form.clone()),
            last_pose: None,
            person_visible: false,
        });
    }

    /// トラッキングを終了し、API送信用の要約を返す
    pub fn stop_session(&mut self) -> Option<SessionSummary> {
        let session = self.session.take()?;
        let summary = SessionSummary {
            exercise: session.exercise,
            started_at: session.started_wall,
            ended_at: Utc::now(),
            reps: session.reps.reps(),
            too_fast: session.reps.too_fast(),
            emergency: session.safety.emergency_fired(),
        };
        log::info!(
            "セッション終了: {} {}回 (緊急: {})",
            summary.exercise.label(),
            summary.reps,
            summary.emergency
        );
        Some(summary)
    }

    /// 推論1フレーム分を処理する
    ///
    /// pose なしのフレームは「人物非検出」として在席監視にだけ流す
    pub fn process_frame(&mut self, frame: &FrameResult, now: Instant) -> Vec<Event> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let mut events = Vec::new();

        // 安全監視（在席・重心移動）
        for event in session.safety.observe_frame(frame.pose.as_ref(), now) {
            push_safety_event(&mut events, event);
        }

        match frame.pose.as_ref() {
            None => {
                session.person_visible = false;
            }
            Some(pose) => {
                session.person_visible = true;
                session.last_pose = Some(pose.clone());

                let angles = compute_angles(&mut session.smoother, pose);

                // レップ判定
                let angle = angles.for_joint(session.exercise.tracked_joint());
                match session.reps.update(angle, now) {
                    RepUpdate::Counted(n) => {
                        events.push(Event::RepCounted(n));
                        if let Some(notification) = session.throttle.request(
                            Category::RepSuccess,
                            format!("{n}回目！いいフォームです"),
                            now,
                        ) {
                            events.push(Event::Notification(notification));
                        }
                    }
                    RepUpdate::TooFast => {
                        if let Some(notification) = session.throttle.request(
                            Category::SpeedWarning,
                            "ペースが速すぎます。ゆっくり効かせましょう",
                            now,
                        ) {
                            events.push(Event::Notification(notification));
                        }
                    }
                    RepUpdate::PhaseChanged(phase) => {
                        events.push(Event::PhaseChanged(phase));
                    }
                    RepUpdate::NotVisible | RepUpdate::Idle => {}
                }

                // フォーム判定
                if let FormStatus::Alert(message) = session.form.check(pose, &angles, now) {
                    if let Some(notification) =
                        session.throttle.request(Category::FormError, message, now)
                    {
                        events.push(Event::Notification(notification));
                    }
                }
            }
        }

        // 表情
        if let Some(emotion) = session.emotion.observe(frame.face.as_ref()) {
            if let Some(notification) =
                session
                    .throttle
                    .request(Category::Emotion, emotion.message(), now)
            {
                events.push(Event::Notification(notification));
            }
        }

        events
    }

    /// フレームレートから独立した定期処理（転倒監視）
    pub fn tick(&mut self, now: Instant) -> Vec<Event> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        let pose = if session.person_visible {
            session.last_pose.as_ref()
        } else {
            None
        };
        if let Some(event) = session.safety.poll_fall(pose, now) {
            push_safety_event(&mut events, event);
        }
        events
    }
}

/// 安全監視イベントをエンジンイベントへ写す
///
/// 緊急は持続バナー用の通知も添える（スロットル対象外）
fn push_safety_event(events: &mut Vec<Event>, event: SafetyEvent) {
    match event {
        SafetyEvent::Warning { kind, remaining } => {
            events.push(Event::SafetyWarning { kind, remaining })
        }
        SafetyEvent::WarningCleared(kind) => events.push(Event::SafetyWarningCleared(kind)),
        SafetyEvent::Emergency(kind) => {
            events.push(Event::Emergency(kind));
            let category = match kind {
                EmergencyKind::Fall => Category::Fall,
                _ => Category::Accident,
            };
            events.push(Event::Notification(Notification::new(
                category,
                kind.message(),
            )));
        }
    }
}

/// 可視な関節の平滑化角度をまとめて計算する
///
/// 3点のうちどれかの可視度が閾値未満なら、その関節は None
/// （信頼できない座標で角度を出さない）
fn compute_angles(smoother: &mut AngleSmoother, pose: &PoseFrame) -> JointAngles {
    use LandmarkIndex::*;

    let mut angle = |key: &'static str, a: LandmarkIndex, b: LandmarkIndex, c: LandmarkIndex| {
        let (a, b, c) = (pose.get(a), pose.get(b), pose.get(c));
        if a.is_visible(MIN_VISIBILITY) && b.is_visible(MIN_VISIBILITY) && c.is_visible(MIN_VISIBILITY)
        {
            Some(smoother.smoothed_angle(key, a, b, c))
        } else {
            None
        }
    };

    JointAngles {
        left_elbow: angle("left_elbow", LeftShoulder, LeftElbow, LeftWrist),
        right_elbow: angle("right_elbow", RightShoulder, RightElbow, RightWrist),
        left_knee: angle("left_knee", LeftHip, LeftKnee, LeftAnkle),
        right_knee: angle("right_knee", RightHip, RightKnee, RightAnkle),
        left_shoulder: angle("left_shoulder", LeftHip, LeftShoulder, LeftElbow),
        right_shoulder: angle("right_shoulder", RightHip, RightShoulder, RightElbow),
    }
}
