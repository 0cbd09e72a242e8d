use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::NotifyConfig;

/// 通知カテゴリ
///
/// カテゴリごとに独立したクールダウンを持つ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    FormError,
    Emotion,
    RepSuccess,
    SpeedWarning,
    Accident,
    Fall,
}

/// 画面に出す1件の通知
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub category: Category,
    pub message: String,
    /// 緊急バナー（自動で消えない）
    pub persistent: bool,
}

impl Notification {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            persistent: matches!(category, Category::Accident | Category::Fall),
        }
    }
}

/// カテゴリ別レート制限
///
/// フレーム単位の検出が同じ通知を連打してもUIに流さないための関門。
/// クールダウン中の要求は破棄し、通過した要求だけタイムスタンプを更新する
pub struct NotificationThrottle {
    config: NotifyConfig,
    last_shown: HashMap<Category, Instant>,
}

impl NotificationThrottle {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            last_shown: HashMap::new(),
        }
    }

    fn cooldown(&self, category: Category) -> Duration {
        let ms = match category {
            Category::FormError => self.config.form_error_ms,
            Category::Emotion => self.config.emotion_ms,
            Category::RepSuccess => self.config.rep_success_ms,
            Category::SpeedWarning => self.config.speed_warning_ms,
            Category::Accident => self.config.accident_ms,
            Category::Fall => self.config.fall_ms,
        };
        Duration::from_millis(ms)
    }

    /// クールダウンを通過すれば Some、抑制されれば None
    pub fn request(
        &mut self,
        category: Category,
        message: impl Into<String>,
        now: Instant,
    ) -> Option<Notification> {
        if let Some(&last) = self.last_shown.get(&category) {
            if now.duration_since(last) < self.cooldown(category) {
                return None;
            }
        }
        self.last_shown.insert(category, now);
        Some(Notification::new(category, message))
    }

    /// 全カテゴリのクールダウンを解除する（セッション再開時）
    pub fn reset(&mut self) {
        self.last_shown.clear();
    }
}
