//! Prometheus 쿼리 API 클라이언트
//!
//! 수집기 인스턴스의 `/api/v1/query` 엔드포인트를 감싸는 얇은
//! 클라이언트입니다. 응답은 Prometheus의 instant vector JSON 형식을
//! 따릅니다.

use std::time::Duration;

use serde_json::Value;

use crate::error::MetricsError;

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Prometheus 쿼리 클라이언트
#[derive(Debug, Clone)]
pub struct MetricsQuery {
    client: reqwest::Client,
}

impl MetricsQuery {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// 단일 메트릭의 현재 값을 조회합니다.
    ///
    /// 결과 벡터가 비어 있으면 `None`입니다.
    pub async fn instant(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<Option<f64>, MetricsError> {
        let results = self.query_vector(endpoint, query).await?;
        let Some(first) = results.first() else {
            return Ok(None);
        };

        let value = first
            .get("value")
            .and_then(|v| v.get(1))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                MetricsError::InvalidResponse("result entry has no value".to_owned())
            })?;

        value
            .parse::<f64>()
            .map(Some)
            .map_err(|e| MetricsError::InvalidResponse(format!("non-numeric value '{value}': {e}")))
    }

    /// 한 스크레이프 인스턴스의 모든 시계열을 텍스트 라인으로 덤프합니다.
    ///
    /// 각 라인은 `name{label="v",...} value` 형식입니다.
    pub async fn series_for_instance(
        &self,
        endpoint: &str,
        instance: &str,
    ) -> Result<Vec<String>, MetricsError> {
        let query = format!("{{instance=\"{instance}\"}}");
        let results = self.query_vector(endpoint, &query).await?;

        let mut lines = Vec::with_capacity(results.len());
        for result in &results {
            lines.push(render_series(result)?);
        }
        Ok(lines)
    }

    async fn query_vector(&self, endpoint: &str, query: &str) -> Result<Vec<Value>, MetricsError> {
        let url = format!("{endpoint}/api/v1/query");
        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| MetricsError::Query(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetricsError::Query(format!(
                "GET {url}: unexpected status {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MetricsError::InvalidResponse(format!("GET {url}: {e}")))?;

        if body.get("status").and_then(|s| s.as_str()) != Some("success") {
            return Err(MetricsError::InvalidResponse(format!(
                "query '{query}' did not succeed"
            )));
        }

        let results = body
            .get("data")
            .and_then(|d| d.get("result"))
            .and_then(|r| r.as_array())
            .ok_or_else(|| {
                MetricsError::InvalidResponse("response has no data.result array".to_owned())
            })?;

        Ok(results.clone())
    }
}

impl Default for MetricsQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// instant vector의 한 항목을 `name{labels} value` 라인으로 만듭니다.
fn render_series(result: &Value) -> Result<String, MetricsError> {
    let metric = result
        .get("metric")
        .and_then(|m| m.as_object())
        .ok_or_else(|| MetricsError::InvalidResponse("result entry has no metric".to_owned()))?;

    let name = metric
        .get("__name__")
        .and_then(|n| n.as_str())
        .unwrap_or("unnamed");

    let mut labels: Vec<String> = metric
        .iter()
        .filter(|(k, _)| *k != "__name__")
        .map(|(k, v)| format!("{k}=\"{}\"", v.as_str().unwrap_or_default()))
        .collect();
    labels.sort();

    let value = result
        .get("value")
        .and_then(|v| v.get(1))
        .and_then(|v| v.as_str())
        .ok_or_else(|| MetricsError::InvalidResponse("result entry has no value".to_owned()))?;

    if labels.is_empty() {
        Ok(format!("{name} {value}"))
    } else {
        Ok(format!("{name}{{{}}} {value}", labels.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn series_line_includes_sorted_labels() {
        let entry = json!({
            "metric": {
                "__name__": "node_peers_total",
                "instance": "10.0.0.2:33000",
                "job": "storage-nodes"
            },
            "value": [1724580000.0, "12"]
        });

        let line = render_series(&entry).unwrap();
        assert_eq!(
            line,
            "node_peers_total{instance=\"10.0.0.2:33000\",job=\"storage-nodes\"} 12"
        );
    }

    #[test]
    fn series_line_without_labels() {
        let entry = json!({
            "metric": { "__name__": "up" },
            "value": [1724580000.0, "1"]
        });
        assert_eq!(render_series(&entry).unwrap(), "up 1");
    }

    #[test]
    fn missing_value_is_an_error() {
        let entry = json!({ "metric": { "__name__": "up" } });
        assert!(render_series(&entry).is_err());
    }
}
