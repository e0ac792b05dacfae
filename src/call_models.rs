use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::AppError;

/// Statuses / event names that mark a call as finished and worth notifying on.
pub const COMPLETION_STATUSES: &[&str] =
    &["completed", "ended", "done", "call_ended", "call_analyzed"];

/// Inbound webhook body - one of the three known provider shapes.
///
/// Envelope shapes are tried before the flat shape so a provider event is
/// never mistaken for a platform call record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallWebhookPayload {
    /// `{ "event": ..., "call": {...} }` with provider-specific field names.
    Provider(ProviderEventPayload),
    /// `{ "call_metadata": {...} }` envelope.
    Metadata(MetadataEnvelope),
    /// Flat call record with top-level `id` and `status`.
    Platform(PlatformCallPayload),
}

/// Provider event envelope (`event` + `call`).
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEventPayload {
    /// Event name (e.g. "call_started", "call_ended", "call_analyzed").
    pub event: String,
    /// The call object with provider field names.
    pub call: ProviderCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCall {
    pub call_id: String,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub to_number: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub end_timestamp: Option<i64>,
    /// Already in milliseconds for this provider.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub disconnection_reason: Option<String>,
    #[serde(default)]
    pub call_cost: Option<CostPayload>,
    #[serde(default)]
    pub call_analysis: Option<AnalysisPayload>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,

    /// Raw data for any additional fields
    #[serde(flatten)]
    pub raw: Value,
}

/// `call_metadata` envelope shape.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataEnvelope {
    pub call_metadata: CallMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallMetadata {
    pub call_id: String,
    pub call_status: String,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub agent_number: Option<String>,
    /// Duration in SECONDS for this shape.
    #[serde(default)]
    pub call_duration: Option<u64>,

    /// Any additional fields end up in the report's metadata section.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Flat platform call record (camelCase with snake_case fallbacks).
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformCallPayload {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Milliseconds.
    #[serde(default, alias = "durationMs", alias = "duration_ms")]
    pub duration: Option<u64>,
    #[serde(default, alias = "startTime")]
    pub start_time: Option<TimestampValue>,
    #[serde(default, alias = "endTime")]
    pub end_time: Option<TimestampValue>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default, alias = "recordingUrl")]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "disconnectionReason")]
    pub disconnection_reason: Option<String>,
    #[serde(default)]
    pub cost: Option<CostPayload>,
    #[serde(default)]
    pub analysis: Option<AnalysisPayload>,
    #[serde(default)]
    pub logs: Vec<LogEntryPayload>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,

    /// Raw data for any additional fields
    #[serde(flatten)]
    pub raw: Value,
}

/// Timestamp as providers send it: epoch milliseconds or a datetime string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Millis(i64),
    Text(String),
}

impl TimestampValue {
    /// Best-effort conversion; unparseable values are logged and dropped
    /// (optional field, never an error).
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            TimestampValue::Millis(ms) => millis_to_datetime(*ms),
            TimestampValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| {
                    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
                })
                .map_err(|e| {
                    tracing::warn!("Dropping unparseable timestamp '{}': {}", s, e);
                    e
                })
                .ok(),
        }
    }
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostPayload {
    #[serde(default, alias = "combinedCost")]
    pub combined_cost: Option<f64>,
    #[serde(
        default,
        alias = "durationUnitPrice",
        alias = "total_duration_unit_price"
    )]
    pub duration_unit_price: Option<f64>,
    #[serde(default, alias = "productCosts")]
    pub product_costs: Vec<ProductCostPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductCostPayload {
    pub product: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, alias = "call_summary")]
    pub summary: Option<String>,
    #[serde(default, alias = "user_sentiment")]
    pub sentiment: Option<String>,
    #[serde(default, alias = "call_successful")]
    pub successful: Option<bool>,
    #[serde(default, alias = "inVoicemail")]
    pub in_voicemail: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntryPayload {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub message: String,
}

/// Canonical, provider-agnostic call record. All durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub id: String,
    pub status: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub duration_ms: Option<u64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
    pub disconnection_reason: Option<String>,
    pub cost: Option<CallCost>,
    pub analysis: Option<CallAnalysis>,
    pub logs: Vec<CallLogEntry>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallCost {
    pub combined_cost: Option<f64>,
    pub duration_unit_price: Option<f64>,
    pub product_costs: Vec<ProductCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCost {
    pub product: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallAnalysis {
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub successful: Option<bool>,
    pub in_voicemail: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallLogEntry {
    pub timestamp: Option<String>,
    pub message: String,
}

impl From<CostPayload> for CallCost {
    fn from(p: CostPayload) -> Self {
        CallCost {
            combined_cost: p.combined_cost,
            duration_unit_price: p.duration_unit_price,
            product_costs: p
                .product_costs
                .into_iter()
                .map(|pc| ProductCost {
                    product: pc.product,
                    cost: pc.cost,
                })
                .collect(),
        }
    }
}

impl From<AnalysisPayload> for CallAnalysis {
    fn from(p: AnalysisPayload) -> Self {
        CallAnalysis {
            summary: p.summary,
            sentiment: p.sentiment,
            successful: p.successful,
            in_voicemail: p.in_voicemail,
        }
    }
}

impl From<LogEntryPayload> for CallLogEntry {
    fn from(p: LogEntryPayload) -> Self {
        CallLogEntry {
            timestamp: p.timestamp,
            message: p.message,
        }
    }
}

impl CallRecord {
    /// True when the status (or event name) marks the call as finished.
    pub fn is_completed(&self) -> bool {
        let status = self.status.to_ascii_lowercase();
        COMPLETION_STATUSES.contains(&status.as_str())
    }

    /// Merge a secondary detail record fetched from the call platform API.
    /// Fetched values only fill fields the webhook left absent.
    pub fn merge_detail(&mut self, detail: CallDetail) {
        if self.transcript.is_none() {
            self.transcript = detail.transcript;
        }
        if self.recording_url.is_none() {
            self.recording_url = detail.recording_url;
        }
        if self.summary.is_none() {
            self.summary = detail.summary;
        }
        if self.disconnection_reason.is_none() {
            self.disconnection_reason = detail.disconnection_reason;
        }
        if self.cost.is_none() {
            self.cost = detail.cost.map(CallCost::from);
        }
        if self.analysis.is_none() {
            self.analysis = detail.analysis.map(CallAnalysis::from);
        }
        if self.logs.is_empty() {
            self.logs = detail.logs.into_iter().map(CallLogEntry::from).collect();
        }
    }
}

/// Secondary call record fetched from the call platform's detail API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallDetail {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default, alias = "recordingUrl")]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "disconnectionReason")]
    pub disconnection_reason: Option<String>,
    #[serde(default)]
    pub cost: Option<CostPayload>,
    #[serde(default)]
    pub analysis: Option<AnalysisPayload>,
    #[serde(default)]
    pub logs: Vec<LogEntryPayload>,
}

fn stringify_metadata(map: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    map.into_iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, s)
        })
        .collect()
}

impl CallWebhookPayload {
    /// Map the raw shape into the canonical record.
    ///
    /// Shape detection already happened during deserialization; this rejects
    /// only blank identifying fields. Durations are converted to milliseconds.
    pub fn into_record(self) -> Result<CallRecord, AppError> {
        let record = match self {
            CallWebhookPayload::Platform(p) => {
                require_non_blank("id", &p.id)?;
                require_non_blank("status", &p.status)?;
                CallRecord {
                    id: p.id,
                    status: p.status,
                    from: p.from,
                    to: p.to,
                    duration_ms: p.duration,
                    start_time: p.start_time.as_ref().and_then(TimestampValue::to_datetime),
                    end_time: p.end_time.as_ref().and_then(TimestampValue::to_datetime),
                    transcript: p.transcript,
                    recording_url: p.recording_url,
                    summary: p.summary,
                    disconnection_reason: p.disconnection_reason,
                    cost: p.cost.map(CallCost::from),
                    analysis: p.analysis.map(CallAnalysis::from),
                    logs: p.logs.into_iter().map(CallLogEntry::from).collect(),
                    metadata: p.metadata.map(stringify_metadata).unwrap_or_default(),
                }
            }
            CallWebhookPayload::Provider(p) => {
                require_non_blank("call.call_id", &p.call.call_id)?;
                let call = p.call;
                let status = call
                    .call_status
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| p.event.clone());
                CallRecord {
                    id: call.call_id,
                    status,
                    from: call.from_number,
                    to: call.to_number,
                    duration_ms: call.duration_ms,
                    start_time: call.start_timestamp.and_then(millis_to_datetime),
                    end_time: call.end_timestamp.and_then(millis_to_datetime),
                    transcript: call.transcript,
                    recording_url: call.recording_url,
                    summary: None,
                    disconnection_reason: call.disconnection_reason,
                    cost: call.call_cost.map(CallCost::from),
                    analysis: call.call_analysis.map(CallAnalysis::from),
                    logs: Vec::new(),
                    metadata: call.metadata.map(stringify_metadata).unwrap_or_default(),
                }
            }
            CallWebhookPayload::Metadata(envelope) => {
                let meta = envelope.call_metadata;
                require_non_blank("call_metadata.call_id", &meta.call_id)?;
                require_non_blank("call_metadata.call_status", &meta.call_status)?;
                CallRecord {
                    id: meta.call_id,
                    status: meta.call_status,
                    from: meta.caller_number,
                    to: meta.agent_number,
                    // This shape reports seconds; everything downstream is ms.
                    duration_ms: meta.call_duration.map(|secs| secs * 1000),
                    start_time: None,
                    end_time: None,
                    transcript: None,
                    recording_url: None,
                    summary: None,
                    disconnection_reason: None,
                    cost: None,
                    analysis: None,
                    logs: Vec::new(),
                    metadata: stringify_metadata(meta.extra),
                }
            }
        };

        tracing::debug!(
            "Normalized call event: id={}, status={}, duration_ms={:?}",
            record.id,
            record.status,
            record.duration_ms
        );

        Ok(record)
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation {
            message: format!("Field '{}' must not be empty", field),
            example: None,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform_shape() {
        let json = r#"
        {
            "id": "call_123",
            "status": "completed",
            "from": "5551234567",
            "to": "5559876543",
            "duration": 125000,
            "startTime": "2025-06-01T12:00:00Z",
            "recordingUrl": "https://example.com/rec.mp3",
            "summary": "Asked about pricing"
        }
        "#;

        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        let record = payload.into_record().unwrap();
        assert_eq!(record.id, "call_123");
        assert_eq!(record.status, "completed");
        assert_eq!(record.duration_ms, Some(125000));
        assert_eq!(
            record.recording_url.as_deref(),
            Some("https://example.com/rec.mp3")
        );
        assert!(record.start_time.is_some());
        assert!(record.is_completed());
    }

    #[test]
    fn test_parse_provider_event_shape() {
        let json = r#"
        {
            "event": "call_analyzed",
            "call": {
                "call_id": "ret_9",
                "from_number": "+15551234567",
                "to_number": "+15550001111",
                "start_timestamp": 1748779200000,
                "end_timestamp": 1748779325000,
                "duration_ms": 125000,
                "disconnection_reason": "user_hangup",
                "call_cost": {
                    "combined_cost": 12.5,
                    "total_duration_unit_price": 0.1,
                    "product_costs": [{"product": "tts", "cost": 1.25}]
                },
                "call_analysis": {
                    "call_summary": "Caller booked a demo",
                    "user_sentiment": "Positive",
                    "call_successful": true,
                    "in_voicemail": false
                }
            }
        }
        "#;

        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        assert!(matches!(payload, CallWebhookPayload::Provider(_)));
        let record = payload.into_record().unwrap();
        assert_eq!(record.id, "ret_9");
        // No call_status, so the event name becomes the status.
        assert_eq!(record.status, "call_analyzed");
        assert!(record.is_completed());
        assert_eq!(record.duration_ms, Some(125000));
        let cost = record.cost.unwrap();
        assert_eq!(cost.combined_cost, Some(12.5));
        assert_eq!(cost.duration_unit_price, Some(0.1));
        assert_eq!(cost.product_costs.len(), 1);
        let analysis = record.analysis.unwrap();
        assert_eq!(analysis.sentiment.as_deref(), Some("Positive"));
        assert_eq!(analysis.successful, Some(true));
    }

    #[test]
    fn test_parse_metadata_shape_converts_seconds() {
        let json = r#"
        {
            "call_metadata": {
                "call_id": "meta_1",
                "call_status": "ended",
                "caller_number": "555-123-4567",
                "agent_number": "5550001111",
                "call_duration": 65,
                "campaign": "spring"
            }
        }
        "#;

        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        assert!(matches!(payload, CallWebhookPayload::Metadata(_)));
        let record = payload.into_record().unwrap();
        assert_eq!(record.duration_ms, Some(65000));
        assert_eq!(record.from.as_deref(), Some("555-123-4567"));
        assert_eq!(record.metadata.get("campaign").map(String::as_str), Some("spring"));
        assert!(record.is_completed());
    }

    #[test]
    fn test_missing_identifying_fields_rejected() {
        for body in [
            r#"{"from": "5551234567"}"#,
            r#"{"id": "c1"}"#,
            r#"{"status": "completed"}"#,
            r#"{"event": "call_ended"}"#,
            r#"{"call_metadata": {"caller_number": "5551234567"}}"#,
        ] {
            let parsed: Result<CallWebhookPayload, _> = serde_json::from_str(body);
            assert!(parsed.is_err(), "expected rejection for {}", body);
        }
    }

    #[test]
    fn test_blank_id_rejected_after_parse() {
        let json = r#"{"id": "  ", "status": "completed"}"#;
        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        assert!(payload.into_record().is_err());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"id": "c1", "status": "completed", "brand_new_field": {"x": 1}}"#;
        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        let record = payload.into_record().unwrap();
        assert_eq!(record.id, "c1");
    }

    #[test]
    fn test_non_completion_status() {
        let json = r#"{"id": "c2", "status": "in-progress"}"#;
        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        let record = payload.into_record().unwrap();
        assert!(!record.is_completed());
    }

    #[test]
    fn test_merge_detail_fills_only_absent_fields() {
        let json = r#"{"id": "c1", "status": "completed", "transcript": "original"}"#;
        let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
        let mut record = payload.into_record().unwrap();

        let detail: CallDetail = serde_json::from_str(
            r#"{"transcript": "fetched", "recordingUrl": "https://example.com/r.mp3"}"#,
        )
        .unwrap();
        record.merge_detail(detail);

        assert_eq!(record.transcript.as_deref(), Some("original"));
        assert_eq!(
            record.recording_url.as_deref(),
            Some("https://example.com/r.mp3")
        );
    }
}
