use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::BackendConfig;
use crate::engine::SessionSummary;

/// セッションAPIのデフォルトアドレス
pub const API_DEFAULT_ADDR: &str = "http://127.0.0.1:3001";

/// サインアップのリクエストボディを構築
pub fn build_signup_payload(
    name: &str,
    email: &str,
    password: &str,
    guardian_email: &str,
) -> Value {
    json!({
        "name": name,
        "email": email,
        "password": password,
        "guardianEmail": guardian_email,
    })
}

/// ログインのリクエストボディを構築
pub fn build_login_payload(email: &str, password: &str) -> Value {
    json!({
        "email": email,
        "password": password,
    })
}

/// セッション作成のリクエストボディを構築
/// 時刻はISO-8601、種目はAPI側の種目IDで送る
pub fn build_session_payload(user_id: &str, summary: &SessionSummary) -> Value {
    json!({
        "userId": user_id,
        "exerciseName": summary.exercise.as_id(),
        "startTime": summary.started_at.to_rfc3339(),
        "endTime": summary.ended_at.to_rfc3339(),
        "emergency": summary.emergency,
    })
}

/// 緊急フラグ更新のリクエストボディを構築
pub fn build_emergency_payload(user_id: &str, session_id: &str) -> Value {
    json!({
        "userEmail": user_id,
        "sessionId": session_id,
    })
}

/// アカウント・セッションAPIのクライアント
///
/// アカウント管理・保護者メール送信はサービス側の責務。
/// ここは記録の作成と緊急フラグ付けを依頼するだけ
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// 新しいAPIクライアントを作成
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("HTTPクライアントの構築に失敗")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("POST {url} に失敗"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("POST {url} がエラー応答: {status}");
        }
        response.json().with_context(|| format!("{url} の応答を解析できません"))
    }

    /// アカウント登録。成功時はユーザーIDを返す
    pub fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        guardian_email: &str,
    ) -> Result<String> {
        let body = build_signup_payload(name, email, password, guardian_email);
        let value = self.post("/user/signup", &body)?;
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            bail!(
                "登録に失敗: {}",
                value.get("message").and_then(Value::as_str).unwrap_or("不明")
            );
        }
        extract_id(&value).ok_or_else(|| anyhow!("応答にユーザーIDがありません"))
    }

    /// ログイン。成功時はユーザーIDを返す
    pub fn login(&self, email: &str, password: &str) -> Result<String> {
        let body = build_login_payload(email, password);
        let value = self.post("/user/login", &body)?;
        if value.get("success").and_then(Value::as_bool) != Some(true) {
            bail!("認証に失敗しました");
        }
        value
            .get("user")
            .and_then(extract_id)
            .ok_or_else(|| anyhow!("応答にユーザーIDがありません"))
    }

    /// セッション記録を作成。成功時はセッションIDを返す
    pub fn create_session(&self, user_id: &str, summary: &SessionSummary) -> Result<String> {
        let body = build_session_payload(user_id, summary);
        let value = self.post("/session", &body)?;
        extract_id(&value).ok_or_else(|| anyhow!("応答にセッションIDがありません"))
    }

    /// ユーザーのセッション一覧を取得
    pub fn sessions(&self, user_id: &str) -> Result<Vec<Value>> {
        let url = format!("{}/session/{}", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("GET {url} に失敗"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("GET {url} がエラー応答: {status}");
        }
        let value: Value = response.json().context("セッション一覧を解析できません")?;
        match value {
            Value::Array(sessions) => Ok(sessions),
            other => bail!("セッション一覧の形式が不正: {other}"),
        }
    }

    /// セッションを緊急としてマークする
    ///
    /// サービス側がこのフラグを契機に保護者へメールを送る
    pub fn mark_emergency(&self, user_id: &str, session_id: &str) -> Result<()> {
        let body = build_emergency_payload(user_id, session_id);
        let value = self.post("/session/emergency", &body)?;
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            // 正常時はセッション記録そのものが返る。message はエラー通知
            bail!("緊急フラグ更新に失敗: {message}");
        }
        Ok(())
    }
}

/// 応答ドキュメントからIDを取り出す（"_id" 優先、なければ "userId"）
fn extract_id(value: &Value) -> Option<String> {
    value
        .get("_id")
        .or_else(|| value.get("userId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
