use thiserror::Error;

/// Failures surfaced by the record core.
///
/// Normalizers never produce these; they degrade to an empty string instead.
/// Change-log writes never produce these either, since a failed append is
/// logged and swallowed.
#[derive(Debug, Error)]
pub enum HrError {
    /// The backing file is unreadable or not a workbook we can parse.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),
    /// Writing the temporary file or replacing the backing file failed.
    /// The previous backing file is left intact.
    #[error("STORE_WRITE_FAILED: {0}")]
    StoreWriteFailed(String),
    /// Unknown employee, or a media path that is missing or escapes its directory.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
}

impl HrError {
    /// Message safe to show to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            HrError::StoreUnavailable(_) => "직원 DB를 읽을 수 없습니다.",
            HrError::StoreWriteFailed(_) => "직원 DB 저장에 실패했습니다.",
            HrError::NotFound(_) => "해당 직원을 찾을 수 없습니다.",
        }
    }
}

pub type HrResult<T> = Result<T, HrError>;
