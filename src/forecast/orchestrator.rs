//! Forecast request lifecycle.
//!
//! The orchestrator owns the single `RequestState` and drives it through
//! `Idle -> InFlight -> Succeeded | Failed`. The outbound call runs on a worker
//! thread and reports back over a channel; callers either `poll()` from an
//! event loop or `wait()` for the current request to settle.
//!
//! Every accepted request gets a fresh `RequestToken`. A settlement whose token
//! is not the one currently in flight is dropped, so a late response from a
//! cancelled request can never overwrite newer state.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use tracing::{debug, info, warn};

use crate::data::{lookup, synthesize_with};
use crate::domain::{
    ACTUAL_SPI, DebtPolicy, FORECAST_HORIZON, ForecastResult, RequestState, TimelineSeries,
};
use crate::error::ForecastError;
use crate::forecast::client::ForecastClient;

/// Correlates a settlement with the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Outcome of `request_forecast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The request was accepted and the outbound call started.
    Started(RequestToken),
    /// A request is already in flight; nothing was sent.
    Rejected { in_flight: RequestToken },
}

struct Pending {
    token: RequestToken,
    country: String,
    expected_len: usize,
}

struct Settlement {
    token: RequestToken,
    outcome: Result<ForecastResult, ForecastError>,
}

pub struct ForecastOrchestrator<C> {
    client: Arc<C>,
    debt_policy: DebtPolicy,
    state: RequestState,
    pending: Option<Pending>,
    next_token: u64,
    tx: Sender<Settlement>,
    rx: Receiver<Settlement>,
}

impl<C: ForecastClient + 'static> ForecastOrchestrator<C> {
    pub fn new(client: C) -> Self {
        Self::with_client(Arc::new(client))
    }

    pub fn with_client(client: Arc<C>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            debt_policy: DebtPolicy::default(),
            state: RequestState::Idle,
            pending: None,
            next_token: 0,
            tx,
            rx,
        }
    }

    pub fn with_debt_policy(mut self, debt_policy: DebtPolicy) -> Self {
        self.debt_policy = debt_policy;
        self
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Country of the request currently in flight.
    pub fn in_flight_country(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.country.as_str())
    }

    /// Current reconciled timeline for rendering.
    pub fn timeline(&self) -> TimelineSeries {
        crate::report::reconcile(&ACTUAL_SPI, &self.state)
    }

    /// Start a forecast for `country`.
    ///
    /// Rejected while another request is in flight. An unknown country fails
    /// immediately (state becomes `Failed`) without contacting the service.
    pub fn request_forecast(&mut self, country: &str) -> Result<Dispatch, ForecastError> {
        if let Some(pending) = &self.pending {
            debug!(
                country,
                in_flight = pending.token.value(),
                "forecast request rejected: another request is in flight"
            );
            return Ok(Dispatch::Rejected {
                in_flight: pending.token,
            });
        }

        // Accepting a request always discards the previous result or error.
        self.state = RequestState::Idle;

        let baseline = match lookup(country) {
            Ok(baseline) => baseline,
            Err(err) => {
                warn!(country, "forecast request for unknown country");
                self.state = RequestState::Failed(err.clone());
                return Err(err);
            }
        };
        let batch = synthesize_with(&baseline, FORECAST_HORIZON, self.debt_policy);

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        let expected_len = batch.len();

        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("spi-forecast-{}", token.value()))
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| client.predict(&batch)))
                    .unwrap_or_else(|_| {
                        Err(ForecastError::Transport(
                            "Forecast worker terminated unexpectedly.".to_string(),
                        ))
                    });
                // The orchestrator may already be gone; nothing to report to then.
                let _ = tx.send(Settlement { token, outcome });
            });

        if let Err(e) = spawned {
            let err = ForecastError::Transport(format!("Failed to start forecast request: {e}"));
            self.state = RequestState::Failed(err.clone());
            return Err(err);
        }

        info!(country, token = token.value(), "forecast request dispatched");
        self.pending = Some(Pending {
            token,
            country: country.to_string(),
            expected_len,
        });
        self.state = RequestState::InFlight;
        Ok(Dispatch::Started(token))
    }

    /// Abandon the request in flight, if any. Its response will be discarded.
    ///
    /// Returns `true` when a request was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                info!(
                    country = %pending.country,
                    token = pending.token.value(),
                    "forecast request cancelled"
                );
                self.state = RequestState::Idle;
                true
            }
            None => false,
        }
    }

    /// Apply any settlements that have arrived, without blocking.
    ///
    /// Returns `true` when the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(settlement) => changed |= self.settle(settlement),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Block until the current request settles (returns immediately when idle).
    pub fn wait(&mut self) -> &RequestState {
        while self.pending.is_some() {
            match self.rx.recv() {
                Ok(settlement) => {
                    self.settle(settlement);
                }
                Err(_) => break,
            }
        }
        &self.state
    }

    fn settle(&mut self, settlement: Settlement) -> bool {
        let Some(pending) = self
            .pending
            .take_if(|p| p.token == settlement.token)
        else {
            debug!(
                token = settlement.token.value(),
                "discarding stale forecast response"
            );
            return false;
        };

        self.state = match settlement.outcome {
            Ok(result) => match validate(&result, pending.expected_len) {
                Ok(()) => {
                    info!(
                        country = %pending.country,
                        token = pending.token.value(),
                        "forecast succeeded"
                    );
                    RequestState::Succeeded(result)
                }
                Err(err) => {
                    warn!(country = %pending.country, error = %err, "forecast rejected");
                    RequestState::Failed(err)
                }
            },
            Err(err) => {
                warn!(
                    country = %pending.country,
                    kind = err.kind(),
                    error = %err,
                    "forecast failed"
                );
                RequestState::Failed(err)
            }
        };
        true
    }
}

fn validate(result: &ForecastResult, expected_len: usize) -> Result<(), ForecastError> {
    if result.len() != expected_len {
        return Err(ForecastError::MalformedResponse(format!(
            "expected {expected_len} predictions, got {}",
            result.len()
        )));
    }
    if let Some(v) = result.values().iter().find(|v| !v.is_finite()) {
        return Err(ForecastError::MalformedResponse(format!(
            "non-finite prediction {v}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::domain::SnapshotBatch;

    fn spi(values: &[f64]) -> ForecastResult {
        ForecastResult::new(values.to_vec())
    }

    /// Returns the same outcome for every call.
    struct FixedClient {
        outcome: Result<ForecastResult, ForecastError>,
        calls: AtomicUsize,
        last_batch: Mutex<Option<SnapshotBatch>>,
    }

    impl FixedClient {
        fn new(outcome: Result<ForecastResult, ForecastError>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                last_batch: Mutex::new(None),
            }
        }
    }

    impl ForecastClient for FixedClient {
        fn predict(&self, batch: &SnapshotBatch) -> Result<ForecastResult, ForecastError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_batch.lock().unwrap() = Some(batch.clone());
            self.outcome.clone()
        }
    }

    /// Blocks every call until the test supplies its reply.
    ///
    /// A call holds `replies` for its whole duration and announces itself on
    /// `entered` once it does, so replies are handed out in call order.
    struct ScriptedClient {
        calls: AtomicUsize,
        entered: Mutex<mpsc::Sender<()>>,
        replies: Mutex<mpsc::Receiver<Result<ForecastResult, ForecastError>>>,
    }

    struct Script {
        entered: mpsc::Receiver<()>,
        replies: mpsc::Sender<Result<ForecastResult, ForecastError>>,
    }

    impl Script {
        fn await_call(&self) {
            self.entered
                .recv_timeout(Duration::from_secs(5))
                .expect("client was not called");
        }
    }

    fn scripted() -> (Arc<ScriptedClient>, Script) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let client = Arc::new(ScriptedClient {
            calls: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            replies: Mutex::new(reply_rx),
        });
        (
            client,
            Script {
                entered: entered_rx,
                replies: reply_tx,
            },
        )
    }

    impl ForecastClient for ScriptedClient {
        fn predict(&self, _batch: &SnapshotBatch) -> Result<ForecastResult, ForecastError> {
            let replies = self.replies.lock().unwrap();
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.lock().unwrap().send(()).unwrap();
            replies
                .recv()
                .unwrap_or_else(|_| Err(ForecastError::Transport("script closed".to_string())))
        }
    }

    struct PanickingClient;

    impl ForecastClient for PanickingClient {
        fn predict(&self, _batch: &SnapshotBatch) -> Result<ForecastResult, ForecastError> {
            panic!("model exploded");
        }
    }

    #[test]
    fn starts_idle_without_forecast() {
        let orch = ForecastOrchestrator::new(FixedClient::new(Ok(spi(&[0.0; 6]))));
        assert_eq!(orch.state(), &RequestState::Idle);
        assert!(orch.timeline().forecast.is_none());
    }

    #[test]
    fn success_exposes_forecast_in_order() {
        let values = [52.0, 53.5, 55.0, 54.0, 56.0, 57.25];
        let client = Arc::new(FixedClient::new(Ok(spi(&values))));
        let mut orch = ForecastOrchestrator::with_client(Arc::clone(&client));

        let dispatch = orch.request_forecast("Finland").unwrap();
        assert!(matches!(dispatch, Dispatch::Started(_)));
        assert_eq!(orch.wait(), &RequestState::Succeeded(spi(&values)));

        let timeline = orch.timeline();
        assert_eq!(timeline.forecast.as_deref(), Some(&values[..]));
        assert_eq!(timeline.labels.len(), 12);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        let sent = client.last_batch.lock().unwrap().clone().unwrap();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent.snapshots()[2].food, 340.0);
    }

    #[test]
    fn short_response_is_malformed() {
        let mut orch = ForecastOrchestrator::new(FixedClient::new(Ok(spi(&[1.0, 2.0, 3.0, 4.0, 5.0]))));
        orch.request_forecast("Germany").unwrap();
        let state = orch.wait().clone();
        assert!(
            matches!(state, RequestState::Failed(ForecastError::MalformedResponse(_))),
            "{state:?}"
        );
        assert!(orch.timeline().forecast.is_none());
    }

    #[test]
    fn non_finite_prediction_is_malformed() {
        let values = [1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0];
        let mut orch = ForecastOrchestrator::new(FixedClient::new(Ok(spi(&values))));
        orch.request_forecast("USA").unwrap();
        assert!(matches!(
            orch.wait(),
            RequestState::Failed(ForecastError::MalformedResponse(_))
        ));
    }

    #[test]
    fn server_detail_becomes_failure_message() {
        let mut orch = ForecastOrchestrator::new(FixedClient::new(Err(ForecastError::Server {
            status: 503,
            detail: "model unavailable".to_string(),
        })));
        orch.request_forecast("Romania").unwrap();
        let err = orch.wait().error().cloned().unwrap();
        assert_eq!(err.to_string(), "model unavailable");
    }

    #[test]
    fn unknown_country_fails_without_calling_the_service() {
        let client = Arc::new(FixedClient::new(Ok(spi(&[0.0; 6]))));
        let mut orch = ForecastOrchestrator::with_client(Arc::clone(&client));

        let err = orch.request_forecast("Atlantis").unwrap_err();
        assert_eq!(err, ForecastError::UnknownCountry("Atlantis".to_string()));
        assert_eq!(orch.state(), &RequestState::Failed(err));
        assert!(!orch.is_in_flight());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn request_while_in_flight_is_rejected() {
        let (client, script) = scripted();
        let mut orch = ForecastOrchestrator::with_client(Arc::clone(&client));

        let Dispatch::Started(first) = orch.request_forecast("Finland").unwrap() else {
            panic!("first request should start");
        };
        script.await_call();

        let second = orch.request_forecast("Finland").unwrap();
        assert_eq!(second, Dispatch::Rejected { in_flight: first });
        assert_eq!(orch.request_forecast("Germany").unwrap(), Dispatch::Rejected { in_flight: first });
        assert!(orch.state().is_in_flight());

        script.replies.send(Ok(spi(&[1.0; 6]))).unwrap();
        assert!(matches!(orch.wait(), RequestState::Succeeded(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_request_clears_previous_forecast() {
        let (client, script) = scripted();
        let mut orch = ForecastOrchestrator::with_client(client);

        orch.request_forecast("Finland").unwrap();
        script.await_call();
        script.replies.send(Ok(spi(&[1.0; 6]))).unwrap();
        assert!(matches!(orch.wait(), RequestState::Succeeded(_)));

        orch.request_forecast("USA").unwrap();
        assert_eq!(orch.state(), &RequestState::InFlight);
        assert!(orch.timeline().forecast.is_none());
        assert_eq!(orch.in_flight_country(), Some("USA"));

        script.await_call();
        script
            .replies
            .send(Err(ForecastError::Transport("connection reset".to_string())))
            .unwrap();
        assert_eq!(
            orch.wait(),
            &RequestState::Failed(ForecastError::Transport("connection reset".to_string()))
        );
    }

    #[test]
    fn cancelled_request_response_is_discarded() {
        let (client, script) = scripted();
        let mut orch = ForecastOrchestrator::with_client(client);

        orch.request_forecast("Finland").unwrap();
        script.await_call();
        assert!(orch.cancel());
        assert_eq!(orch.state(), &RequestState::Idle);
        assert!(!orch.cancel());

        let Dispatch::Started(second) = orch.request_forecast("Germany").unwrap() else {
            panic!("request after cancel should start");
        };
        assert_eq!(second.value(), 2);

        // The abandoned call answers first; its reply must not land.
        script.replies.send(Ok(spi(&[9.0; 6]))).unwrap();
        script.await_call();
        script.replies.send(Ok(spi(&[2.0; 6]))).unwrap();

        assert_eq!(orch.wait(), &RequestState::Succeeded(spi(&[2.0; 6])));
        assert!(!orch.poll());
    }

    #[test]
    fn stale_response_after_cancel_leaves_idle() {
        let (client, script) = scripted();
        let mut orch = ForecastOrchestrator::with_client(client);

        orch.request_forecast("Finland").unwrap();
        script.await_call();
        orch.cancel();
        script.replies.send(Ok(spi(&[9.0; 6]))).unwrap();

        // Give the worker time to deliver, then drain.
        thread::sleep(Duration::from_millis(100));
        assert!(!orch.poll());
        assert_eq!(orch.state(), &RequestState::Idle);
    }

    #[test]
    fn poll_applies_settlement_without_blocking() {
        let (client, script) = scripted();
        let mut orch = ForecastOrchestrator::with_client(client);

        orch.request_forecast("Finland").unwrap();
        script.await_call();
        assert!(!orch.poll());
        assert!(orch.state().is_in_flight());

        script.replies.send(Ok(spi(&[3.0; 6]))).unwrap();
        let mut changed = false;
        for _ in 0..100 {
            if orch.poll() {
                changed = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(changed);
        assert_eq!(orch.state(), &RequestState::Succeeded(spi(&[3.0; 6])));
    }

    #[test]
    fn panicking_client_settles_as_transport_error() {
        let mut orch = ForecastOrchestrator::new(PanickingClient);
        orch.request_forecast("Finland").unwrap();
        assert!(matches!(
            orch.wait(),
            RequestState::Failed(ForecastError::Transport(_))
        ));
    }

    #[test]
    fn clamp_policy_reaches_the_client() {
        let client = Arc::new(FixedClient::new(Ok(spi(&[0.0; 6]))));
        let mut orch =
            ForecastOrchestrator::with_client(Arc::clone(&client)).with_debt_policy(DebtPolicy::Clamp);
        orch.request_forecast("Romania").unwrap();
        orch.wait();

        let sent = client.last_batch.lock().unwrap().clone().unwrap();
        assert!(sent.snapshots().iter().all(|s| s.debt >= 0.0));
        assert_eq!(sent.snapshots()[5].debt, 40.0);
    }
}
