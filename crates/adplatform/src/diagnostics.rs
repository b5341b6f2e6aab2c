//! Credential and permission diagnostics.
//!
//! Runs independent read-only probes (token user, ad account, token
//! permissions, pages the user manages, configured page) and collects the
//! findings into a [`DiagnosticReport`]. A failing probe does not stop
//! the others.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::GraphApiClient;
use crate::error::{FailureKind, PlatformError};

/// Permissions required to create ads attributed to a page.
pub const CRITICAL_PERMISSIONS: &[&str] = &[
    "ads_management",
    "pages_read_engagement",
    "pages_manage_ads",
    "business_management",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_status: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone_name: Option<String>,
    /// Business manager owning the account, when there is one.
    #[serde(default)]
    pub business: Option<BusinessRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// The user the access token belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A page the token user manages. The page access token itself is never
/// kept; only whether one was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedPage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    pub has_access_token: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub granted: Vec<String>,
    pub declined: Vec<String>,
}

impl PermissionSummary {
    /// Critical permissions not in the granted set.
    pub fn missing_critical(&self) -> Vec<String> {
        CRITICAL_PERMISSIONS
            .iter()
            .filter(|p| !self.granted.iter().any(|g| g == *p))
            .map(|p| p.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// A probe that failed, with its classification and remedy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub message: String,
    pub kind: FailureKind,
    pub remedy: String,
}

impl From<&PlatformError> for ProbeFailure {
    fn from(err: &PlatformError) -> Self {
        let kind = err.kind();
        Self {
            message: err.to_string(),
            kind,
            remedy: kind.remedy().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub user: Result<UserInfo, ProbeFailure>,
    pub account: Result<AccountInfo, ProbeFailure>,
    pub permissions: Result<PermissionSummary, ProbeFailure>,
    pub managed_pages: Result<Vec<ManagedPage>, ProbeFailure>,
    /// Configured page id, if any.
    pub page_id: Option<String>,
    /// `None` when no page is configured.
    pub page: Option<Result<PageInfo, ProbeFailure>>,
}

impl DiagnosticReport {
    pub fn missing_critical_permissions(&self) -> Vec<String> {
        match &self.permissions {
            Ok(summary) => summary.missing_critical(),
            Err(_) => Vec::new(),
        }
    }

    /// The configured page as listed among the user's managed pages.
    pub fn configured_managed_page(&self) -> Option<&ManagedPage> {
        let page_id = self.page_id.as_deref()?;
        self.managed_pages
            .as_ref()
            .ok()?
            .iter()
            .find(|page| page.id == page_id)
    }

    /// True when every probe succeeded, no critical permission is missing,
    /// and a page is configured and managed by the token user.
    pub fn is_healthy(&self) -> bool {
        self.user.is_ok()
            && self.account.is_ok()
            && self.permissions.is_ok()
            && self.missing_critical_permissions().is_empty()
            && matches!(self.page, Some(Ok(_)))
            && self.configured_managed_page().is_some()
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// Read-only account probes. Implemented by the HTTP client and by
/// [`crate::fake::FakeAdPlatform`].
#[async_trait]
pub trait AccountProbe: Send + Sync {
    /// Page creatives are attributed to by default.
    fn configured_page_id(&self) -> Option<&str>;

    async fn user_info(&self) -> Result<UserInfo, PlatformError>;

    async fn account_info(&self) -> Result<AccountInfo, PlatformError>;

    async fn permissions(&self) -> Result<PermissionSummary, PlatformError>;

    async fn managed_pages(&self) -> Result<Vec<ManagedPage>, PlatformError>;

    async fn page_info(&self, page_id: &str) -> Result<PageInfo, PlatformError>;
}

#[async_trait]
impl AccountProbe for GraphApiClient {
    fn configured_page_id(&self) -> Option<&str> {
        self.config().page_id.as_deref()
    }

    async fn user_info(&self) -> Result<UserInfo, PlatformError> {
        let body = self.get_json(&self.node_url("me"), &["id", "name"]).await?;
        serde_json::from_value(body).map_err(|e| PlatformError::Decode(format!("user info: {e}")))
    }

    async fn account_info(&self) -> Result<AccountInfo, PlatformError> {
        let url = self.node_url(self.ad_account_id());
        let body = self
            .get_json(
                &url,
                &[
                    "id",
                    "name",
                    "account_status",
                    "currency",
                    "timezone_name",
                    "business",
                ],
            )
            .await?;
        serde_json::from_value(body)
            .map_err(|e| PlatformError::Decode(format!("account info: {e}")))
    }

    async fn permissions(&self) -> Result<PermissionSummary, PlatformError> {
        let body = self.get_json(&self.node_url("me/permissions"), &[]).await?;
        parse_permissions(&body)
    }

    async fn managed_pages(&self) -> Result<Vec<ManagedPage>, PlatformError> {
        let body = self
            .get_json(
                &self.node_url("me/accounts"),
                &["id", "name", "tasks", "access_token"],
            )
            .await?;
        parse_managed_pages(&body)
    }

    async fn page_info(&self, page_id: &str) -> Result<PageInfo, PlatformError> {
        let body = self
            .get_json(&self.node_url(page_id), &["id", "name", "is_published"])
            .await?;
        serde_json::from_value(body).map_err(|e| PlatformError::Decode(format!("page info: {e}")))
    }
}

/// Run every probe against the account and configured page.
pub async fn run_diagnostics<P: AccountProbe + ?Sized>(probe: &P) -> DiagnosticReport {
    let user = probe.user_info().await.map_err(|e| {
        tracing::warn!(error = %e, "User probe failed");
        ProbeFailure::from(&e)
    });

    let account = probe.account_info().await.map_err(|e| {
        tracing::warn!(error = %e, "Ad account probe failed");
        ProbeFailure::from(&e)
    });

    let permissions = probe.permissions().await.map_err(|e| {
        tracing::warn!(error = %e, "Permission probe failed");
        ProbeFailure::from(&e)
    });

    let managed_pages = probe.managed_pages().await.map_err(|e| {
        tracing::warn!(error = %e, "Managed pages probe failed");
        ProbeFailure::from(&e)
    });

    let page_id = probe.configured_page_id().map(str::to_string);
    let page = match page_id.as_deref() {
        Some(page_id) => Some(probe.page_info(page_id).await.map_err(|e| {
            tracing::warn!(page_id, error = %e, "Page probe failed");
            ProbeFailure::from(&e)
        })),
        None => None,
    };

    let report = DiagnosticReport {
        user,
        account,
        permissions,
        managed_pages,
        page_id,
        page,
    };

    if let (Some(page_id), Ok(pages)) = (report.page_id.as_deref(), &report.managed_pages) {
        match report.configured_managed_page() {
            None => tracing::warn!(
                page_id,
                managed = pages.len(),
                "Configured page is not among the pages this user manages",
            ),
            Some(page) if !page.has_access_token => {
                tracing::warn!(page_id, "No page access token issued for the configured page")
            }
            Some(_) => {}
        }
    }

    report
}

/// Parse `{"data": [{"id", "name", "tasks": [...], "access_token"}]}`.
pub fn parse_managed_pages(body: &Value) -> Result<Vec<ManagedPage>, PlatformError> {
    let entries = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| PlatformError::Decode("pages response missing 'data'".into()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(Value::as_str)?;
            Some(ManagedPage {
                id: id.to_string(),
                name: entry.get("name").and_then(Value::as_str).map(str::to_string),
                tasks: entry
                    .get("tasks")
                    .and_then(Value::as_array)
                    .map(|tasks| {
                        tasks
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                has_access_token: entry
                    .get("access_token")
                    .and_then(Value::as_str)
                    .is_some_and(|token| !token.is_empty()),
            })
        })
        .collect())
}

/// Parse `{"data": [{"permission": "...", "status": "granted"|"declined"}]}`.
pub fn parse_permissions(body: &Value) -> Result<PermissionSummary, PlatformError> {
    let entries = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| PlatformError::Decode("permissions response missing 'data'".into()))?;

    let mut summary = PermissionSummary::default();
    for entry in entries {
        let (Some(name), Some(status)) = (
            entry.get("permission").and_then(Value::as_str),
            entry.get("status").and_then(Value::as_str),
        ) else {
            continue;
        };
        match status {
            "granted" => summary.granted.push(name.to_string()),
            "declined" => summary.declined.push(name.to_string()),
            _ => {}
        }
    }
    summary.granted.sort();
    summary.declined.sort();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_split_and_sorted() {
        let body = serde_json::json!({"data": [
            {"permission": "pages_manage_ads", "status": "granted"},
            {"permission": "ads_management", "status": "granted"},
            {"permission": "business_management", "status": "declined"},
            {"permission": "email", "status": "expired"},
            {"bogus": true}
        ]});

        let summary = parse_permissions(&body).unwrap();
        assert_eq!(summary.granted, vec!["ads_management", "pages_manage_ads"]);
        assert_eq!(summary.declined, vec!["business_management"]);
        assert_eq!(
            summary.missing_critical(),
            vec!["pages_read_engagement", "business_management"]
        );
    }

    #[test]
    fn permissions_without_data_is_decode_error() {
        assert!(parse_permissions(&serde_json::json!({})).is_err());
    }

    fn managed(id: &str) -> ManagedPage {
        ManagedPage {
            id: id.into(),
            name: None,
            tasks: vec!["ADVERTISE".into()],
            has_access_token: true,
        }
    }

    fn healthy_report() -> DiagnosticReport {
        let granted = CRITICAL_PERMISSIONS.iter().map(|p| p.to_string()).collect();
        DiagnosticReport {
            user: Ok(UserInfo {
                id: "u1".into(),
                name: Some("Ana".into()),
            }),
            account: Ok(AccountInfo {
                id: "act_1".into(),
                name: Some("Main".into()),
                account_status: Some(1),
                currency: Some("BRL".into()),
                timezone_name: None,
                business: None,
            }),
            permissions: Ok(PermissionSummary {
                granted,
                declined: vec![],
            }),
            managed_pages: Ok(vec![managed("7"), managed("42")]),
            page_id: Some("42".into()),
            page: Some(Ok(PageInfo {
                id: "42".into(),
                name: None,
                is_published: Some(true),
            })),
        }
    }

    #[test]
    fn report_health() {
        let mut report = healthy_report();
        assert!(report.is_healthy());
        assert_eq!(report.configured_managed_page().map(|p| p.id.as_str()), Some("42"));

        report.page = None;
        assert!(!report.is_healthy());
    }

    #[test]
    fn unmanaged_page_is_unhealthy() {
        let mut report = healthy_report();
        report.managed_pages = Ok(vec![managed("7")]);
        assert!(report.configured_managed_page().is_none());
        assert!(!report.is_healthy());
    }

    #[test]
    fn managed_pages_parsed_without_tokens() {
        let body = serde_json::json!({"data": [
            {"id": "42", "name": "Shop", "tasks": ["ADVERTISE", "ANALYZE"], "access_token": "EAAP-secret"},
            {"id": "7", "name": "Blog"},
            {"name": "no id"}
        ]});

        let pages = parse_managed_pages(&body).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].tasks, vec!["ADVERTISE", "ANALYZE"]);
        assert!(pages[0].has_access_token);
        assert!(!pages[1].has_access_token);
        assert!(pages[1].tasks.is_empty());
        assert!(!serde_json::to_string(&pages).unwrap().contains("EAAP-secret"));
    }

    #[test]
    fn account_business_is_optional() {
        let with: AccountInfo = serde_json::from_value(serde_json::json!({
            "id": "act_1",
            "business": {"id": "b9", "name": "Acme"}
        }))
        .unwrap();
        assert_eq!(with.business.map(|b| b.id), Some("b9".to_string()));

        let without: AccountInfo =
            serde_json::from_value(serde_json::json!({"id": "act_1"})).unwrap();
        assert!(without.business.is_none());
    }

    #[test]
    fn probe_failure_carries_remedy() {
        let err = PlatformError::from_response(
            400,
            r#"{"error":{"message":"Error validating access token","code":190}}"#,
        );
        let failure = ProbeFailure::from(&err);
        assert_eq!(failure.kind, FailureKind::Auth);
        assert!(failure.remedy.contains("access token"));
    }
}
