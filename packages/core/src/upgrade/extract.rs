//! Hand-off of a connection from inside the HTTP transport
//!
//! hyper does not return the connection a request went over. The task driving
//! the connection only gets it back once the exchange is finished, which can
//! be after the response has already reached the caller. The signal here is a
//! single slot: the driver fires it exactly once with the connection, the
//! attempt drains it once after the round trip returns.
//!
//! This is only sound because every transport is built for a single request
//! and then thrown away. A pooled transport could fire the signal with a
//! connection that served some other request.

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::{self, IntegrationFailure, Result};

/// Writer half, owned by whatever drives the connection.
#[derive(Debug)]
pub struct ConnectionSignal<T> {
    tx: oneshot::Sender<T>,
}

impl<T> ConnectionSignal<T> {
    /// Publishes the connection. Consumes the signal, so it fires at most once.
    ///
    /// If the extractor is already gone the connection is dropped, closing it.
    pub fn fire(self, conn: T) {
        if self.tx.send(conn).is_err() {
            tracing::trace!("connection signaled after the attempt was abandoned");
        }
    }
}

/// Reader half, owned by the attempt that issued the request.
#[derive(Debug)]
pub struct ConnectionExtractor<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> ConnectionExtractor<T> {
    pub fn channel() -> (ConnectionSignal<T>, ConnectionExtractor<T>) {
        let (tx, rx) = oneshot::channel();
        (ConnectionSignal { tx }, ConnectionExtractor { rx })
    }

    /// Takes the connection if it has already been signaled.
    ///
    /// Never waits. An empty slot is reported as an integration error, the
    /// same as a signal that was dropped without firing.
    pub fn try_extract(&mut self) -> Result<T> {
        match self.rx.try_recv() {
            Ok(conn) => Ok(conn),
            Err(TryRecvError::Empty | TryRecvError::Closed) => {
                Err(error::integration(IntegrationFailure::NoConnectionSignaled))
            }
        }
    }

    /// Waits for the signal to fire or be dropped.
    ///
    /// Call this only after the round trip has returned: from then on the
    /// driver is finishing up and will either fire or drop the signal, so
    /// this resolves promptly.
    pub async fn extract(self) -> Result<T> {
        self.rx
            .await
            .map_err(|_| error::integration(IntegrationFailure::NoConnectionSignaled))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn extract_returns_signaled_connection() {
        let (signal, extractor) = ConnectionExtractor::channel();
        signal.fire(42u32);
        assert_eq!(extractor.extract().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn extract_reports_missing_signal_without_blocking() {
        let (signal, extractor) = ConnectionExtractor::<u32>::channel();
        drop(signal);

        let result = tokio::time::timeout(Duration::from_secs(1), extractor.extract())
            .await
            .expect("extract must not block once the signal is gone");
        assert!(result.unwrap_err().is_integration());
    }

    #[test]
    fn try_extract_never_waits() {
        let (signal, mut extractor) = ConnectionExtractor::<&str>::channel();
        assert!(extractor.try_extract().unwrap_err().is_integration());

        signal.fire("conn");
        assert_eq!(extractor.try_extract().unwrap(), "conn");
    }

    #[tokio::test]
    async fn signal_fired_from_another_task() {
        let (signal, extractor) = ConnectionExtractor::channel();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            signal.fire(String::from("from driver"));
        });
        assert_eq!(extractor.extract().await.unwrap(), "from driver");
    }
}
