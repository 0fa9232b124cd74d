

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{info, warn};

use super::base::{LlmProvider, LlmProviderError, Prompt, Reply};


pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: Arc<dyn LlmProvider>,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {

    pub fn new(primary: Arc<dyn LlmProvider>, fallback: Arc<dyn LlmProvider>) -> Self {
        info!(
            "LlmProviderWithFallback initialized: primary={}/{}, fallback={}/{}",
            primary.provider_name(),
            primary.model_name(),
            fallback.provider_name(),
            fallback.model_name()
        );

        Self {
            primary,
            fallback,
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            primary_failures: AtomicUsize::new(0),
        }
    }


    async fn complete_with_fallback(
        &self,
        prompt: Prompt<'_>,
        original_error: &LlmProviderError,
    ) -> Result<Reply, LlmProviderError> {
        warn!(
            "Falling back to {} ({}) for {} due to: {}",
            self.fallback.provider_name(),
            self.fallback.model_name(),
            prompt.kind,
            original_error
        );

        let mut reply = self.fallback.complete(prompt).await?;
        reply.fallback_used = true;

        self.using_fallback.store(true, Ordering::SeqCst);
        self.fallback_count.fetch_add(1, Ordering::SeqCst);

        info!(
            "Fallback successful! total_fallbacks={}",
            self.fallback_count.load(Ordering::SeqCst)
        );

        Ok(reply)
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn primary_failures(&self) -> usize {
        self.primary_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn complete(&self, prompt: Prompt<'_>) -> Result<Reply, LlmProviderError> {
        match self.primary.complete(prompt).await {
            Ok(reply) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                Ok(reply)
            }
            Err(e) => {
                self.primary_failures.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Primary LLM provider failed ({}x): {}",
                    self.primary_failures.load(Ordering::SeqCst),
                    e
                );
                self.complete_with_fallback(prompt, &e).await
            }
        }
    }

    fn provider_name(&self) -> &str {
        if self.using_fallback.load(Ordering::SeqCst) {
            self.fallback.provider_name()
        } else {
            self.primary.provider_name()
        }
    }

    fn model_name(&self) -> &str {
        if self.using_fallback.load(Ordering::SeqCst) {
            self.fallback.model_name()
        } else {
            self.primary.model_name()
        }
    }
}
