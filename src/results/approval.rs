use super::aggregate::ReviewKey;
use crate::api::{ApiClient, ApiError};
use crate::errors::{self, ErrorCode};
use crate::model::{EntityRef, ResultRecord, ResultStatus};
use crate::store::{QueryKey, QueryStore};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn parse(raw: &str) -> Option<ApprovalAction> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Some(ApprovalAction::Approve),
            "reject" | "rejected" => Some(ApprovalAction::Reject),
            _ => None,
        }
    }

    pub fn target_status(self) -> ResultStatus {
        match self {
            ApprovalAction::Approve => ResultStatus::Approved,
            ApprovalAction::Reject => ResultStatus::Rejected,
        }
    }
}

/// Body of `POST /results/approve/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchApproval {
    pub exam: EntityRef,
    #[serde(rename = "class")]
    pub class_name: EntityRef,
    pub action: ApprovalAction,
    pub remarks: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("Please provide a reason for rejection")]
    MissingRejectionReason,
    #[error("results without an exam or class cannot be approved as a batch")]
    UnknownGroup,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ErrorCode for ApprovalError {
    fn error_code(&self) -> &'static str {
        match self {
            ApprovalError::MissingRejectionReason | ApprovalError::UnknownGroup => {
                errors::VALIDATION_FAILED
            }
            ApprovalError::Api(e) => e.error_code(),
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            ApprovalError::Api(e) => e.error_details(),
            _ => None,
        }
    }
}

/// Checks an approval before anything touches the network.
pub fn validate(
    key: &ReviewKey,
    action: ApprovalAction,
    remarks: Option<&str>,
) -> Result<BatchApproval, ApprovalError> {
    let remarks = remarks.map(str::trim).unwrap_or_default();
    if action == ApprovalAction::Reject && remarks.is_empty() {
        return Err(ApprovalError::MissingRejectionReason);
    }
    let (Some(exam), Some(class_name)) = (key.exam.clone(), key.class_name.clone()) else {
        return Err(ApprovalError::UnknownGroup);
    };
    Ok(BatchApproval {
        exam,
        class_name,
        action,
        remarks: remarks.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub action: ApprovalAction,
    /// Count reported by the backend, when it reports one.
    pub updated: Option<u64>,
    /// Fresh records after the refetch. `None` when the refetch failed.
    pub records: Option<Vec<ResultRecord>>,
    pub refresh_error: Option<String>,
}

/// Sends one batch transition for the whole (exam, class) group. The cache
/// is only touched after the backend accepted the batch.
pub fn submit_approval(
    api: &mut ApiClient,
    store: &mut QueryStore,
    key: &ReviewKey,
    action: ApprovalAction,
    remarks: Option<&str>,
) -> Result<ApprovalOutcome, ApprovalError> {
    let batch = validate(key, action, remarks)?;
    let reply = api.approve_batch(&batch)?;
    tracing::info!(
        group = %key,
        status = action.target_status().as_str(),
        updated = ?reply.updated,
        "batch approval accepted"
    );

    store.invalidate(QueryKey::Results);
    let (records, refresh_error) = match store.results(api) {
        Ok(r) => (Some(r), None),
        Err(e) => {
            tracing::warn!(group = %key, "refetch after approval failed: {e}");
            (None, Some(e.to_string()))
        }
    };
    Ok(ApprovalOutcome {
        action,
        updated: reply.updated,
        records,
        refresh_error,
    })
}
