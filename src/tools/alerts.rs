//! Alert Tools
//!
//! Alert-rule CRUD plus read-only views of firing alerts and data sources.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::{
    RegisteredTool, ToolBuilder, ToolCategory, ToolContext, ToolRegistry, ToolResult,
};
use super::{parse_args, path_segment, split_id, to_body};
use crate::backend::BackendRequest;

/// Register alert tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(get_firing_alerts_tool());
    registry.register_tool(get_datasources_tool());
    registry.register_tool(create_alert_tool());
    registry.register_tool(get_all_alerts_tool());
    registry.register_tool(update_alert_tool());
    registry.register_tool(delete_alert_tool());
    registry.register_tool(get_specific_alert_tool());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

fn default_for_duration() -> String {
    "5m".to_string()
}

fn default_lookback_seconds() -> u64 {
    600
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateAlertParams {
    title: String,
    severity: AlertSeverity,
    receiver: String,
    description: String,
    datasource: String,
    threshold_value: f64,
    #[serde(default = "default_for_duration")]
    for_duration: String,
    #[serde(default = "default_lookback_seconds")]
    lookback_seconds: u64,
    #[serde(default)]
    prom_expr: Option<String>,
    #[serde(default)]
    log_expr: Option<String>,
}

/// Body of `POST /api/v1/alerts/`
#[derive(Debug, Serialize)]
struct AlertRulePayload {
    title: String,
    for_duration: String,
    severity: AlertSeverity,
    receiver: String,
    lookback_seconds: u64,
    description: String,
    datasource: String,
    threshold_value: f64,
    include_view_data: bool,
    include_dashboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prom_expr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_expr: Option<String>,
}

impl From<CreateAlertParams> for AlertRulePayload {
    fn from(params: CreateAlertParams) -> Self {
        Self {
            title: params.title,
            for_duration: params.for_duration,
            severity: params.severity,
            receiver: params.receiver,
            lookback_seconds: params.lookback_seconds,
            description: params.description,
            datasource: params.datasource,
            threshold_value: params.threshold_value,
            include_view_data: false,
            include_dashboard: false,
            prom_expr: params.prom_expr.filter(|e| !e.is_empty()),
            log_expr: params.log_expr.filter(|e| !e.is_empty()),
        }
    }
}

/// Updatable alert fields. Only the fields that are set go on the wire.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlertChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<AlertSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prom_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_expr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AlertIdParams {
    alert_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AlertUidParams {
    alert_uid: String,
}

// ============================================================================
// get_firing_alerts / get_datasources / get_all_alerts
// ============================================================================

fn get_firing_alerts_tool() -> RegisteredTool {
    ToolBuilder::new("get_firing_alerts")
        .description(
            "Fetch all currently firing alerts from Grafana dashboard. \
             Use when asking about current or active alerts.",
        )
        .category(ToolCategory::Read)
        .build(get_firing_alerts_handler)
}

async fn get_firing_alerts_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let _: NoParams = parse_args(args)?;
    let request = BackendRequest::get("/api/v1/alerts/firing-alerts");
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn get_datasources_tool() -> RegisteredTool {
    ToolBuilder::new("get_datasources")
        .description(
            "Fetch all Grafana data sources (Prometheus, Loki, etc.) configured in the workspace. \
             Use when asking about available data sources.",
        )
        .category(ToolCategory::Read)
        .build(get_datasources_handler)
}

async fn get_datasources_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let _: NoParams = parse_args(args)?;
    let request = BackendRequest::get("/api/v1/alerts/datasources");
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn get_all_alerts_tool() -> RegisteredTool {
    ToolBuilder::new("get_all_alerts")
        .description(
            "Retrieve a list of all alert rules stored in the system. Use when listing all alerts.",
        )
        .category(ToolCategory::Read)
        .build(get_all_alerts_handler)
}

async fn get_all_alerts_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let _: NoParams = parse_args(args)?;
    let request = BackendRequest::get("/api/v1/alerts/get_alerts/");
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

// ============================================================================
// create_alert
// ============================================================================

fn create_alert_tool() -> RegisteredTool {
    ToolBuilder::new("create_alert")
        .description(
            "Create a new alert rule in Grafana using metrics, logs, or both. \
             Use when setting up a new alert or monitoring rule.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "Alert title"},
                "severity": {
                    "type": "string",
                    "enum": ["critical", "warning", "info"],
                    "description": "Alert severity"
                },
                "receiver": {
                    "type": "string",
                    "description": "Alert receiver/notification channel"
                },
                "description": {"type": "string", "description": "Alert description"},
                "datasource": {"type": "string", "description": "Data source (prometheus, loki)"},
                "threshold_value": {
                    "type": "number",
                    "description": "Threshold value for the alert"
                },
                "for_duration": {
                    "type": "string",
                    "default": "5m",
                    "description": "How long condition must be true"
                },
                "lookback_seconds": {
                    "type": "integer",
                    "default": 600,
                    "description": "Lookback window in seconds"
                },
                "prom_expr": {
                    "type": "string",
                    "description": "Prometheus query expression (optional)"
                },
                "log_expr": {
                    "type": "string",
                    "description": "Loki log query expression (optional)"
                }
            },
            "required": [
                "title",
                "severity",
                "receiver",
                "description",
                "datasource",
                "threshold_value"
            ]
        }))
        .category(ToolCategory::Write)
        .build(create_alert_handler)
}

async fn create_alert_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: CreateAlertParams = parse_args(args)?;
    let payload = AlertRulePayload::from(params);
    let request = BackendRequest::post("/api/v1/alerts/")
        .with_body(to_body(&payload)?);
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

// ============================================================================
// update_alert
// ============================================================================

fn update_alert_tool() -> RegisteredTool {
    ToolBuilder::new("update_alert")
        .description(
            "Update an existing alert rule by its ID. Use when modifying an existing alert.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "alert_id": {"type": "string", "description": "The alert ID to update"},
                "title": {"type": "string", "description": "New alert title"},
                "severity": {
                    "type": "string",
                    "enum": ["critical", "warning", "info"],
                    "description": "New severity"
                },
                "receiver": {"type": "string", "description": "New receiver"},
                "description": {"type": "string", "description": "New description"},
                "datasource": {"type": "string", "description": "New datasource"},
                "threshold_value": {"type": "number", "description": "New threshold"},
                "for_duration": {"type": "string", "description": "New duration"},
                "lookback_seconds": {"type": "integer", "description": "New lookback"},
                "prom_expr": {"type": "string", "description": "New Prometheus expression"},
                "log_expr": {"type": "string", "description": "New Loki expression"}
            },
            "required": ["alert_id"]
        }))
        .category(ToolCategory::Write)
        .build(update_alert_handler)
}

async fn update_alert_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let (alert_id, changes): (String, AlertChanges) = split_id(args, "alert_id")?;
    let path = format!("/api/v1/alerts/update_alerts/{}", path_segment(&alert_id));
    let request = BackendRequest::put(path).with_body(to_body(&changes)?);
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

// ============================================================================
// delete_alert / get_specific_alert
// ============================================================================

fn delete_alert_tool() -> RegisteredTool {
    ToolBuilder::new("delete_alert")
        .description("Delete an alert rule by its UID. Use when removing an alert.")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "alert_uid": {
                    "type": "string",
                    "description": "The unique identifier of the alert to delete"
                }
            },
            "required": ["alert_uid"]
        }))
        .category(ToolCategory::Write)
        .build(delete_alert_handler)
}

async fn delete_alert_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: AlertUidParams = parse_args(args)?;
    let path = format!(
        "/api/v1/alerts/delete_alerts/{}",
        path_segment(&params.alert_uid)
    );
    Ok(ctx.gateway.call(&ctx.request, BackendRequest::delete(path)).await)
}

fn get_specific_alert_tool() -> RegisteredTool {
    ToolBuilder::new("get_specific_alert")
        .description(
            "Get details of a specific alert by its ID. Use when asking about a particular alert.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "alert_id": {"type": "string", "description": "The alert ID to retrieve"}
            },
            "required": ["alert_id"]
        }))
        .category(ToolCategory::Read)
        .build(get_specific_alert_handler)
}

async fn get_specific_alert_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: AlertIdParams = parse_args(args)?;
    let path = format!(
        "/api/v1/alerts/specific_alerts/{}",
        path_segment(&params.alert_id)
    );
    Ok(ctx.gateway.call(&ctx.request, BackendRequest::get(path)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use crate::tools::test_support::Recorder;
    use crate::tools::ToolRegistry;
    use axum::http::Method;
    use serde_json::json;

    fn required_create_args() -> Value {
        json!({
            "title": "High CPU",
            "severity": "critical",
            "receiver": "ops-pager",
            "description": "CPU above threshold",
            "datasource": "prometheus",
            "threshold_value": 90.5
        })
    }

    #[tokio::test]
    async fn test_create_alert_applies_defaults_and_omits_unset() {
        let recorder = Recorder::spawn().await;

        create_alert_handler(recorder.ctx.clone(), required_create_args())
            .await
            .unwrap();

        let sent = recorder.last();
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.path, "/api/v1/alerts/");
        assert_eq!(
            sent.body,
            Some(json!({
                "title": "High CPU",
                "for_duration": "5m",
                "severity": "critical",
                "receiver": "ops-pager",
                "lookback_seconds": 600,
                "description": "CPU above threshold",
                "datasource": "prometheus",
                "threshold_value": 90.5,
                "include_view_data": false,
                "include_dashboard": false
            }))
        );
    }

    #[tokio::test]
    async fn test_create_alert_forwards_expressions() {
        let recorder = Recorder::spawn().await;
        let mut args = required_create_args();
        args["prom_expr"] = json!("rate(cpu[5m])");
        args["log_expr"] = json!("");

        create_alert_handler(recorder.ctx.clone(), args).await.unwrap();

        let body = recorder.last().body.unwrap();
        assert_eq!(body["prom_expr"], json!("rate(cpu[5m])"));
        assert!(body.get("log_expr").is_none());
    }

    #[tokio::test]
    async fn test_create_alert_rejects_unknown_severity() {
        let recorder = Recorder::spawn().await;
        let mut args = required_create_args();
        args["severity"] = json!("apocalyptic");

        let err = create_alert_handler(recorder.ctx.clone(), args)
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_update_alert_sends_only_set_fields() {
        let recorder = Recorder::spawn().await;

        update_alert_handler(
            recorder.ctx.clone(),
            json!({"alert_id": "a-1", "severity": "warning", "threshold_value": 75}),
        )
        .await
        .unwrap();

        let sent = recorder.last();
        assert_eq!(sent.method, Method::PUT);
        assert_eq!(sent.path, "/api/v1/alerts/update_alerts/a-1");
        assert_eq!(
            sent.body,
            Some(json!({"severity": "warning", "threshold_value": 75.0}))
        );
    }

    #[tokio::test]
    async fn test_update_alert_rejects_unknown_field() {
        let recorder = Recorder::spawn().await;

        let err = update_alert_handler(
            recorder.ctx.clone(),
            json!({"alert_id": "a-1", "colour": "red"}),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_simple_alert_routes() {
        let recorder = Recorder::spawn().await;
        let registry = ToolRegistry::with_default_tools();

        let cases = [
            ("get_firing_alerts", json!({}), Method::GET, "/api/v1/alerts/firing-alerts"),
            ("get_datasources", json!({}), Method::GET, "/api/v1/alerts/datasources"),
            ("get_all_alerts", json!(null), Method::GET, "/api/v1/alerts/get_alerts/"),
            (
                "delete_alert",
                json!({"alert_uid": "uid-9"}),
                Method::DELETE,
                "/api/v1/alerts/delete_alerts/uid-9",
            ),
            (
                "get_specific_alert",
                json!({"alert_id": "a-2"}),
                Method::GET,
                "/api/v1/alerts/specific_alerts/a-2",
            ),
        ];

        for (name, args, method, path) in cases {
            let tool = registry.resolve(name).unwrap();
            let result = tool.invoke(recorder.ctx.clone(), args).await.unwrap();
            assert!(result.success, "{}", name);

            let sent = recorder.last();
            assert_eq!(sent.method, method, "{}", name);
            assert_eq!(sent.path, path, "{}", name);
        }
    }
}
