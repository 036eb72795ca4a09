#[cfg(test)]
pub mod mocks {
    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use std::sync::{Arc, Mutex};

    use crate::domain::{
        entities::Session,
        providers::{SessionError, SessionProvider},
    };
    use crate::presentation::middleware::logging::{LogSinkError, RequestLogRecord, RequestLogSink};

    /// In-memory sink keeping every record it receives
    #[derive(Clone, Default)]
    pub struct RecordingLogSink {
        records: Arc<Mutex<Vec<RequestLogRecord>>>,
    }

    impl RecordingLogSink {
        /// # Panics
        /// Panics if the internal mutex is poisoned
        pub fn records(&self) -> Vec<RequestLogRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl RequestLogSink for RecordingLogSink {
        fn record(&self, record: &RequestLogRecord) -> Result<(), LogSinkError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Sink that rejects every record
    #[derive(Clone, Copy, Default)]
    pub struct FailingLogSink;

    impl RequestLogSink for FailingLogSink {
        fn record(&self, _record: &RequestLogRecord) -> Result<(), LogSinkError> {
            Err(LogSinkError::Unavailable("sink offline".to_string()))
        }
    }

    /// Session provider with a fixed answer
    #[derive(Clone, Debug)]
    pub enum StaticSessionProvider {
        Anonymous,
        SignedIn(Session),
        Failing,
    }

    impl StaticSessionProvider {
        pub fn signed_in(user_id: &str, role: &str) -> Self {
            Self::SignedIn(Session::new(user_id, role))
        }

        pub fn failing() -> Self {
            Self::Failing
        }
    }

    #[async_trait]
    impl SessionProvider for StaticSessionProvider {
        async fn session(&self, _headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
            match self {
                Self::Anonymous => Ok(None),
                Self::SignedIn(session) => Ok(Some(session.clone())),
                Self::Failing => Err(SessionError::Unavailable("auth backend down".to_string())),
            }
        }
    }
}
