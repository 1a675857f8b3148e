//! Extractor Chain - 提取后端回退链
//!
//! 按固定优先级依次尝试各提取后端，第一个成功者短路整条链；
//! 全部失败时聚合逐后端的失败原因。

use std::sync::Arc;
use thiserror::Error;

use crate::application::ports::{ExtractionBackendPort, ExtractionResult};
use crate::domain::track::VideoReference;

/// 单个后端的失败记录
#[derive(Debug, Clone)]
pub struct BackendFailure {
    pub backend: &'static str,
    pub reason: String,
}

/// 所有后端均已耗尽的聚合错误
///
/// 携带每个后端的失败原因，而不仅是最后一个。
#[derive(Debug, Error)]
#[error("all extraction backends failed: {}", format_attempts(.attempts))]
pub struct ExtractionFailed {
    pub attempts: Vec<BackendFailure>,
}

fn format_attempts(attempts: &[BackendFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.backend, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 提取后端回退链
pub struct ExtractorChain {
    backends: Vec<Arc<dyn ExtractionBackendPort>>,
}

impl ExtractorChain {
    pub fn new(backends: Vec<Arc<dyn ExtractionBackendPort>>) -> Self {
        Self { backends }
    }

    /// 依次尝试所有后端，返回第一个成功的提取结果
    pub async fn extract(
        &self,
        reference: &VideoReference,
    ) -> Result<ExtractionResult, ExtractionFailed> {
        let mut attempts = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            tracing::debug!(
                backend = backend.name(),
                video_id = %reference.id(),
                "Trying extraction backend"
            );

            match backend.extract(reference).await {
                Ok(result) => {
                    tracing::info!(
                        backend = backend.name(),
                        video_id = %reference.id(),
                        kind = result.kind(),
                        "Extraction backend succeeded"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        video_id = %reference.id(),
                        error = %e,
                        "Extraction backend failed, trying next"
                    );
                    attempts.push(BackendFailure {
                        backend: backend.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(ExtractionFailed { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ByteStream, ExtractError, StreamFormat};
    use async_trait::async_trait;

    struct OkBackend;

    #[async_trait]
    impl ExtractionBackendPort for OkBackend {
        fn name(&self) -> &'static str {
            "ok"
        }

        async fn extract(
            &self,
            _reference: &VideoReference,
        ) -> Result<ExtractionResult, ExtractError> {
            let stream: ByteStream = Box::new(std::io::Cursor::new(vec![1u8, 2, 3]));
            Ok(ExtractionResult::Stream {
                stream,
                hint: Some(StreamFormat::WebmOpus),
            })
        }
    }

    struct FailBackend(&'static str);

    #[async_trait]
    impl ExtractionBackendPort for FailBackend {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn extract(
            &self,
            _reference: &VideoReference,
        ) -> Result<ExtractionResult, ExtractError> {
            Err(ExtractError::Network("connection refused".to_string()))
        }
    }

    fn reference() -> VideoReference {
        crate::domain::track::resolver::resolve("dQw4w9WgXcQ").unwrap()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let chain = ExtractorChain::new(vec![Arc::new(OkBackend), Arc::new(FailBackend("b"))]);
        let result = chain.extract(&reference()).await.unwrap();
        assert_eq!(result.kind(), "stream");
        assert_eq!(result.hint(), Some(StreamFormat::WebmOpus));
    }

    #[tokio::test]
    async fn test_fallback_to_second_backend() {
        let chain = ExtractorChain::new(vec![Arc::new(FailBackend("a")), Arc::new(OkBackend)]);
        let result = chain.extract(&reference()).await.unwrap();
        assert_eq!(result.kind(), "stream");
    }

    #[tokio::test]
    async fn test_all_failed_lists_every_backend() {
        let chain = ExtractorChain::new(vec![
            Arc::new(FailBackend("resolver")),
            Arc::new(FailBackend("stream_proxy")),
        ]);
        let err = chain.extract(&reference()).await.unwrap_err();
        assert_eq!(err.attempts.len(), 2);

        let message = err.to_string();
        assert!(message.contains("resolver: network error: connection refused"));
        assert!(message.contains("stream_proxy: network error: connection refused"));
    }
}
