//! Metrics Tools
//!
//! Namespace and metadata discovery, plus CRUD over stored metric definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::{
    RegisteredTool, ToolBuilder, ToolCategory, ToolContext, ToolRegistry, ToolResult,
};
use super::{parse_args, path_segment, split_id, to_body};
use crate::backend::BackendRequest;

/// Register metrics tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(get_metrics_namespaces_tool());
    registry.register_tool(get_metrics_metadata_tool());
    registry.register_tool(create_metric_tool());
    registry.register_tool(get_metrics_tool());
    registry.register_tool(update_metric_tool());
    registry.register_tool(delete_metric_tool());
    registry.register_tool(get_metric_by_id_tool());
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamespacesParams {
    account_id: String,
    region: String,
    timerange: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetadataParams {
    account_id: String,
    region: String,
    timerange: String,
    service: String,
}

fn default_metric_type() -> String {
    "gauge".to_string()
}

/// Arguments of `create_metric`; also the outbound payload.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct CreateMetricParams {
    name: String,
    namespace: String,
    account_id: String,
    region: String,
    #[serde(default = "default_metric_type")]
    metric_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListMetricsParams {
    account_id: String,
    region: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    metric_name: Option<String>,
}

/// Updatable metric fields. Only the fields that are set go on the wire.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
}

impl MetricChanges {
    fn without_empty(self) -> Self {
        Self {
            name: non_empty(self.name),
            description: non_empty(self.description),
            metric_type: non_empty(self.metric_type),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetricIdParams {
    metric_id: String,
}

fn metric_id_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "metric_id": {"type": "string", "description": description}
        },
        "required": ["metric_id"]
    })
}

fn metric_path(metric_id: &str) -> String {
    format!("/api/v1/metrics/{}", path_segment(metric_id))
}

// ============================================================================
// Discovery
// ============================================================================

fn get_metrics_namespaces_tool() -> RegisteredTool {
    ToolBuilder::new("get_metrics_namespaces")
        .description(
            "Get available metrics namespaces for an AWS account and region. \
             Use when asking about metrics namespaces or CloudWatch namespaces.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "account_id": {"type": "string", "description": "AWS account ID"},
                "region": {"type": "string", "description": "AWS region (e.g., us-east-1)"},
                "timerange": {
                    "type": "string",
                    "description": "Time range for metrics (e.g., 1h, 24h, 7d)"
                }
            },
            "required": ["account_id", "region", "timerange"]
        }))
        .category(ToolCategory::Read)
        .build(get_metrics_namespaces_handler)
}

async fn get_metrics_namespaces_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: NamespacesParams = parse_args(args)?;
    let request = BackendRequest::get("/metrics-namespaces")
        .with_query("account_id", Some(params.account_id.as_str()))
        .with_query("region", Some(params.region.as_str()))
        .with_query("timerange", Some(params.timerange.as_str()));
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn get_metrics_metadata_tool() -> RegisteredTool {
    ToolBuilder::new("get_metrics_metadata")
        .description(
            "Get metrics metadata for a specific AWS service. \
             Use when asking about metrics details or available metrics for a service.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "account_id": {"type": "string", "description": "AWS account ID"},
                "region": {"type": "string", "description": "AWS region"},
                "timerange": {"type": "string", "description": "Time range for metrics"},
                "service": {
                    "type": "string",
                    "description": "AWS service name (e.g., EC2, Lambda, RDS)"
                }
            },
            "required": ["account_id", "region", "timerange", "service"]
        }))
        .category(ToolCategory::Read)
        .build(get_metrics_metadata_handler)
}

async fn get_metrics_metadata_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: MetadataParams = parse_args(args)?;
    let request = BackendRequest::get("/metrics-metadata")
        .with_query("account_id", Some(params.account_id.as_str()))
        .with_query("region", Some(params.region.as_str()))
        .with_query("timerange", Some(params.timerange.as_str()))
        .with_query("service", Some(params.service.as_str()));
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

// ============================================================================
// Metric definitions
// ============================================================================

fn create_metric_tool() -> RegisteredTool {
    ToolBuilder::new("create_metric")
        .description("Create a metric definition in the backend.")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Metric name"},
                "namespace": {"type": "string", "description": "Metric namespace"},
                "account_id": {"type": "string", "description": "AWS account ID"},
                "region": {"type": "string", "description": "AWS region"},
                "metric_type": {"type": "string", "default": "gauge", "description": "Metric type"},
                "description": {"type": "string", "description": "Metric description (optional)"}
            },
            "required": ["name", "namespace", "account_id", "region"]
        }))
        .category(ToolCategory::Write)
        .build(create_metric_handler)
}

async fn create_metric_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let mut params: CreateMetricParams = parse_args(args)?;
    params.description = non_empty(params.description);
    let request = BackendRequest::post("/api/v1/metrics")
        .with_body(to_body(&params)?);
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn get_metrics_tool() -> RegisteredTool {
    ToolBuilder::new("get_metrics")
        .description("Retrieve metrics from the backend, optionally filtered by namespace or name.")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "account_id": {"type": "string", "description": "AWS account ID"},
                "region": {"type": "string", "description": "AWS region"},
                "namespace": {"type": "string", "description": "Filter by namespace (optional)"},
                "metric_name": {"type": "string", "description": "Filter by metric name (optional)"}
            },
            "required": ["account_id", "region"]
        }))
        .category(ToolCategory::Read)
        .build(get_metrics_handler)
}

async fn get_metrics_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: ListMetricsParams = parse_args(args)?;
    let namespace = non_empty(params.namespace);
    let metric_name = non_empty(params.metric_name);
    let request = BackendRequest::get("/api/v1/metrics")
        .with_query("account_id", Some(params.account_id.as_str()))
        .with_query("region", Some(params.region.as_str()))
        .with_query("namespace", namespace.as_deref())
        .with_query("metric_name", metric_name.as_deref());
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn update_metric_tool() -> RegisteredTool {
    ToolBuilder::new("update_metric")
        .description("Update an existing metric by ID in the backend.")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "metric_id": {"type": "string", "description": "The metric ID to update"},
                "name": {"type": "string", "description": "New metric name"},
                "description": {"type": "string", "description": "New description"},
                "metric_type": {"type": "string", "description": "New metric type"}
            },
            "required": ["metric_id"]
        }))
        .category(ToolCategory::Write)
        .build(update_metric_handler)
}

async fn update_metric_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let (metric_id, changes): (String, MetricChanges) = split_id(args, "metric_id")?;
    let request = BackendRequest::put(metric_path(&metric_id))
        .with_body(to_body(&changes.without_empty())?);
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn delete_metric_tool() -> RegisteredTool {
    ToolBuilder::new("delete_metric")
        .description("Delete a metric by ID in the backend.")
        .input_schema(metric_id_schema("The metric ID to delete"))
        .category(ToolCategory::Write)
        .build(delete_metric_handler)
}

async fn delete_metric_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: MetricIdParams = parse_args(args)?;
    let request = BackendRequest::delete(metric_path(&params.metric_id));
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

fn get_metric_by_id_tool() -> RegisteredTool {
    ToolBuilder::new("get_metric_by_id")
        .description("Retrieve a metric by ID from the backend.")
        .input_schema(metric_id_schema("The metric ID to retrieve"))
        .category(ToolCategory::Read)
        .build(get_metric_by_id_handler)
}

async fn get_metric_by_id_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: MetricIdParams = parse_args(args)?;
    let request = BackendRequest::get(metric_path(&params.metric_id));
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use crate::tools::test_support::Recorder;
    use crate::tools::ToolRegistry;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_namespaces_sends_query() {
        let recorder = Recorder::spawn().await;

        get_metrics_namespaces_handler(
            recorder.ctx.clone(),
            json!({"account_id": "123", "region": "us-east-1", "timerange": "1h"}),
        )
        .await
        .unwrap();

        let sent = recorder.last();
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.path, "/metrics-namespaces");
        assert_eq!(
            sent.query.as_deref(),
            Some("account_id=123&region=us-east-1&timerange=1h")
        );
    }

    #[tokio::test]
    async fn test_metadata_requires_service() {
        let recorder = Recorder::spawn().await;

        let err = get_metrics_metadata_handler(
            recorder.ctx.clone(),
            json!({"account_id": "123", "region": "us-east-1", "timerange": "1h"}),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_create_metric_defaults_type_and_omits_description() {
        let recorder = Recorder::spawn().await;

        create_metric_handler(
            recorder.ctx.clone(),
            json!({
                "name": "latency",
                "namespace": "app",
                "account_id": "1",
                "region": "eu-west-1"
            }),
        )
        .await
        .unwrap();

        let sent = recorder.last();
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.path, "/api/v1/metrics");
        assert_eq!(
            sent.body,
            Some(json!({
                "name": "latency",
                "namespace": "app",
                "account_id": "1",
                "region": "eu-west-1",
                "metric_type": "gauge"
            }))
        );
    }

    #[tokio::test]
    async fn test_get_metrics_skips_unset_filters() {
        let recorder = Recorder::spawn().await;

        get_metrics_handler(
            recorder.ctx.clone(),
            json!({"account_id": "1", "region": "r", "metric_name": "cpu"}),
        )
        .await
        .unwrap();

        assert_eq!(
            recorder.last().query.as_deref(),
            Some("account_id=1&region=r&metric_name=cpu")
        );
    }

    #[tokio::test]
    async fn test_update_metric_sends_only_set_fields() {
        let recorder = Recorder::spawn().await;

        update_metric_handler(
            recorder.ctx.clone(),
            json!({"metric_id": "m 1", "description": "p99", "name": ""}),
        )
        .await
        .unwrap();

        let sent = recorder.last();
        assert_eq!(sent.method, Method::PUT);
        assert_eq!(sent.path, "/api/v1/metrics/m%201");
        assert_eq!(sent.body, Some(json!({"description": "p99"})));
    }

    #[tokio::test]
    async fn test_metric_by_id_routes() {
        let recorder = Recorder::spawn().await;
        let registry = ToolRegistry::with_default_tools();

        let tool = registry.resolve("delete_metric").unwrap();
        tool.invoke(recorder.ctx.clone(), json!({"metric_id": "m-2"}))
            .await
            .unwrap();
        assert_eq!(recorder.last().method, Method::DELETE);
        assert_eq!(recorder.last().path, "/api/v1/metrics/m-2");

        let tool = registry.resolve("get_metric_by_id").unwrap();
        tool.invoke(recorder.ctx.clone(), json!({"metric_id": "m-3"}))
            .await
            .unwrap();
        assert_eq!(recorder.last().method, Method::GET);
        assert_eq!(recorder.last().path, "/api/v1/metrics/m-3");
    }
}
