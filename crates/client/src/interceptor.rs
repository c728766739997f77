use crate::context::Context;
use crate::error::CallError;
use document::Value;
use transport::{HttpRequest, HttpResponse};

/// A caller-supplied hook invoked at pipeline checkpoints (spec §4.4,
/// GLOSSARY "Interceptor"). Every method has a no-op default; an
/// implementation only overrides the checkpoints it cares about. Hooks run
/// in the fixed order of §4.4's numbered list, once per attempt — across
/// retries they run again for each new attempt (spec §5).
#[async_trait::async_trait]
pub trait Interceptor: Send + Sync {
    async fn read_before_execution(&self, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn modify_before_serialization(&self, _input: &mut Value, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn read_before_serialization(&self, _input: &Value, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn modify_before_signing(&self, _request: &mut HttpRequest, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn modify_before_transmit(&self, _request: &mut HttpRequest, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn read_before_transmit(&self, _request: &HttpRequest, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn read_after_transmit(&self, _response: &HttpResponse, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }

    async fn modify_before_deserialization(
        &self,
        _response: &mut HttpResponse,
        _context: &Context,
    ) -> Result<(), CallError> {
        Ok(())
    }

    async fn read_after_deserialization(&self, _output: &Value, _context: &Context) -> Result<(), CallError> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counting(AtomicU32);

    #[async_trait::async_trait]
    impl Interceptor for Counting {
        async fn read_before_execution(&self, _context: &Context) -> Result<(), CallError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn unoverridden_hooks_are_no_ops() {
        let interceptor = Counting::default();
        interceptor.modify_before_signing(&mut HttpRequest::new(http::Method::GET, http::Uri::from_static("https://x.test")), &Context::new())
            .await
            .unwrap();
        assert_eq!(interceptor.0.load(Ordering::SeqCst), 0);

        interceptor.read_before_execution(&Context::new()).await.unwrap();
        assert_eq!(interceptor.0.load(Ordering::SeqCst), 1);
    }
}
