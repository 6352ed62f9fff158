//! 链接检查 - 基础设施层
//!
//! 持有 HTTP 客户端，只暴露"这些链接哪些打不开"的能力。

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::error::AgentError;

pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AgentError::service("validate_links", e.to_string()))?;
        Ok(Self { client })
    }

    /// 返回无法访问的链接（保持输入顺序）
    ///
    /// 单个链接请求失败只算该链接失效，不算服务错误。
    pub async fn find_broken(&self, urls: &[String]) -> Vec<String> {
        let checks = urls.iter().map(|url| async move {
            let live = self.is_live(url).await;
            debug!("链接检查 {} -> {}", url, if live { "可用" } else { "失效" });
            (url, live)
        });

        join_all(checks)
            .await
            .into_iter()
            .filter(|(_, live)| !live)
            .map(|(url, _)| url.clone())
            .collect()
    }

    async fn is_live(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) if is_ok_status(resp.status()) => true,
            // 部分服务器不支持 HEAD，退回 GET
            Ok(resp)
                if matches!(
                    resp.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                matches!(
                    self.client.get(url).send().await,
                    Ok(resp) if is_ok_status(resp.status())
                )
            }
            Ok(_) | Err(_) => false,
        }
    }
}

fn is_ok_status(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}
