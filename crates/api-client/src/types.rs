//! Wire types for the device view endpoint.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// View layout selector. Accepts the legacy renderer names as aliases so
/// devices keep working against older server releases.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    #[default]
    #[serde(alias = "dual_weekly")]
    Weekly,
    #[serde(alias = "dual_monthly", alias = "monthly_square", alias = "monthly_re")]
    Monthly,
    #[serde(alias = "dual_yearly")]
    Yearly,
    #[serde(alias = "daily")]
    Agenda,
}

/// Device-facing configuration the server returns alongside content.
///
/// `view_type` overrides the locally configured view when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default)]
    pub view_type: Option<ViewType>,
    #[serde(default)]
    pub device_name: Option<String>,
}

/// One calendar entry or shared task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub title: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// "HH:MM" or "HH:MM:SS".
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub shared_by: Option<String>,
}

/// Full payload for one poll cycle. Transient: fetched fresh each cycle and
/// discarded after rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    #[serde(default)]
    pub config: RemoteConfig,
    #[serde(default, alias = "todos")]
    pub items: Vec<ContentItem>,
    /// Server-side content version marker, when provided.
    #[serde(default)]
    pub version: Option<String>,
}

/// Serialization view used for the fallback fingerprint: the version marker
/// itself is excluded so the hash depends only on displayed content.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashView<'a> {
    config: &'a RemoteConfig,
    items: &'a [ContentItem],
}

impl ContentPayload {
    /// Stable fingerprint used for change detection.
    ///
    /// Prefers the server's version marker; falls back to a sha256 over the
    /// canonical JSON encoding when the server does not supply one.
    pub fn content_hash(&self) -> String {
        if let Some(version) = self.version.as_deref() {
            if !version.is_empty() {
                return version.to_string();
            }
        }
        let canonical = serde_json::to_vec(&HashView {
            config: &self.config,
            items: &self.items,
        })
        .unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("sha256:{}", hex)
    }
}

/// Error body shape the server uses for non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

/// Inclusive date window requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Window matching what each view can show: the current Monday-Sunday
    /// week, the current calendar month, the current calendar year, or the
    /// next seven days.
    pub fn for_view(view: ViewType, today: NaiveDate) -> Self {
        match view {
            ViewType::Weekly => {
                let monday =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                Self {
                    start: monday,
                    end: monday + Duration::days(6),
                }
            }
            ViewType::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                let last = first
                    .checked_add_months(chrono::Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(today);
                Self {
                    start: first,
                    end: last,
                }
            }
            ViewType::Yearly => Self {
                start: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                end: NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            },
            ViewType::Agenda => Self {
                start: today,
                end: today + Duration::days(6),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn payload_parses_legacy_field_names() {
        let body = r#"{
            "config": { "viewType": "dual_weekly" },
            "todos": [
                { "title": "Dentist", "startDate": "2025-03-03", "startTime": "09:30", "endTime": "10:30" }
            ]
        }"#;
        let payload: ContentPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.config.view_type, Some(ViewType::Weekly));
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].start_date, Some(date(2025, 3, 3)));
        assert!(payload.version.is_none());
    }

    #[test]
    fn payload_accepts_yearly_view_name() {
        // A server switched to the yearly layout must not break the poll:
        // the whole payload fails to parse if the view name is unknown.
        let body = r#"{ "config": { "viewType": "dual_yearly" }, "todos": [] }"#;
        let payload: ContentPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.config.view_type, Some(ViewType::Yearly));
    }

    #[test]
    fn content_hash_prefers_server_version() {
        let payload = ContentPayload {
            version: Some("v42".to_string()),
            ..Default::default()
        };
        assert_eq!(payload.content_hash(), "v42");
    }

    #[test]
    fn content_hash_fallback_is_stable_and_content_sensitive() {
        let a = ContentPayload::default();
        let b = ContentPayload::default();
        assert_eq!(a.content_hash(), b.content_hash());
        assert!(a.content_hash().starts_with("sha256:"));

        let c = ContentPayload {
            items: vec![ContentItem {
                title: "Standup".to_string(),
                start_date: None,
                start_time: None,
                end_time: None,
                all_day: true,
                shared_by: None,
            }],
            ..Default::default()
        };
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn weekly_range_spans_monday_to_sunday() {
        // 2025-03-05 is a Wednesday.
        let range = DateRange::for_view(ViewType::Weekly, date(2025, 3, 5));
        assert_eq!(range.start, date(2025, 3, 3));
        assert_eq!(range.end, date(2025, 3, 9));
    }

    #[test]
    fn monthly_range_spans_calendar_month() {
        let range = DateRange::for_view(ViewType::Monthly, date(2024, 2, 15));
        assert_eq!(range.start, date(2024, 2, 1));
        assert_eq!(range.end, date(2024, 2, 29));
    }

    #[test]
    fn yearly_range_spans_calendar_year() {
        let range = DateRange::for_view(ViewType::Yearly, date(2025, 3, 5));
        assert_eq!(range.start, date(2025, 1, 1));
        assert_eq!(range.end, date(2025, 12, 31));
    }

    #[test]
    fn agenda_range_is_one_week_ahead() {
        let range = DateRange::for_view(ViewType::Agenda, date(2025, 3, 5));
        assert_eq!(range.start, date(2025, 3, 5));
        assert_eq!(range.end, date(2025, 3, 11));
    }
}
