//! Application Error - Unified error type for the application
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use super::kind::ErrorKind;

/// アプリケーション統一エラー型
///
/// サービス層で使用する標準エラー型です。
/// 入力検証では全ての問題を一度に集めてから返すため、
/// メッセージは単一ではなく `issues` のリストとして保持します。
///
/// ## Fields
/// * `kind` - エラーの分類（HTTP ステータスコードにマッピング）
/// * `issues` - ユーザー向けの問題点（複数可）
/// * `source` - 元のエラー（オプション、デバッグ用）
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// // シンプルなエラー
/// let err = AppError::new(ErrorKind::Unauthorized, "Request requires authentication.");
///
/// // 問題点を積み上げる検証エラー
/// let mut err = AppError::validation();
/// err.add_issue("User ID required.");
/// err.add_issue("User Email required.");
/// assert_eq!(err.issues().count(), 2);
/// ```
pub struct AppError {
    /// エラー種別
    kind: ErrorKind,
    /// ユーザー向けの問題点
    issues: Vec<Cow<'static, str>>,
    /// 元のエラー（デバッグ用）
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

/// アプリケーション結果型エイリアス
///
/// ## Examples
/// ```rust
/// use kernel::error::app_error::{AppError, AppResult};
///
/// fn find_quote(id: &str) -> AppResult<String> {
///     if id.is_empty() {
///         return Err(AppError::not_found("Quote not found."));
///     }
///     Ok("Isn't every truck a hand truck?".to_string())
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// 問題点を一つ持つエラーを作成
    #[inline]
    pub fn new(kind: ErrorKind, issue: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            issues: vec![issue.into()],
            source: None,
        }
    }

    /// 問題点を持たないエラーを作成（後から [`AppError::add_issue`] で追加）
    #[inline]
    pub fn empty(kind: ErrorKind) -> Self {
        Self {
            kind,
            issues: Vec::new(),
            source: None,
        }
    }

    /// 入力検証用の空の 400 エラー
    #[inline]
    pub fn validation() -> Self {
        Self::empty(ErrorKind::BadRequest)
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    /// 400 Bad Request エラー
    #[inline]
    pub fn bad_request(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, issue)
    }

    /// 401 Unauthorized エラー
    #[inline]
    pub fn unauthorized(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Unauthorized, issue)
    }

    /// 403 Forbidden エラー
    #[inline]
    pub fn forbidden(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Forbidden, issue)
    }

    /// 404 Not Found エラー
    #[inline]
    pub fn not_found(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, issue)
    }

    /// 409 Conflict エラー
    #[inline]
    pub fn conflict(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, issue)
    }

    /// 500 Internal Server Error
    #[inline]
    pub fn internal(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalServerError, issue)
    }

    /// 503 Service Unavailable エラー
    #[inline]
    pub fn service_unavailable(issue: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, issue)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// 問題点を追加
    #[inline]
    pub fn add_issue(&mut self, issue: impl Into<Cow<'static, str>>) {
        self.issues.push(issue.into());
    }

    /// 元のエラーを設定（デバッグ用）
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// 問題点が無ければ `Ok(())`、あれば自身を `Err` として返す
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::app_error::AppError;
    ///
    /// assert!(AppError::validation().into_result().is_ok());
    ///
    /// let mut err = AppError::validation();
    /// err.add_issue("Quote must not be blank.");
    /// assert!(err.into_result().is_err());
    /// ```
    pub fn into_result(self) -> AppResult<()> {
        if self.has_issues() { Err(self) } else { Ok(()) }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// エラー種別を取得
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP ステータスコードを取得
    #[inline]
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// 問題点が一つ以上あるか
    #[inline]
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// 問題点を順に返す
    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|issue| issue.as_ref())
    }

    /// 問題点を空白区切りで連結したメッセージ
    pub fn message(&self) -> String {
        self.issues().collect::<Vec<_>>().join(" ")
    }

    /// サーバーエラーかどうか
    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }

    /// クライアントエラーかどうか
    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.kind.is_client_error()
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        builder.field("issues", &self.issues);
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if self.has_issues() {
            write!(f, " {}", self.message())?;
        }
        Ok(())
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}
