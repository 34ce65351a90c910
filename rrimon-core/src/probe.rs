//! Retry and report controller.
//!
//! Runs attempts until one succeeds or the retry budget is spent, then
//! reports. Every failed attempt gets its own failure report (log line plus
//! an `available=0` metric line), including attempts that were retried.
//! The reports of retried attempts are emitted after the final outcome, most
//! recent first, which is the order a retry-then-report chain unwinds in.
//! Downstream consumers may count these lines, so the cardinality is kept
//! even though a single failure line per run would arguably be cleaner.

use std::io::Write;

use tracing::{info, warn};

use crate::config::ProbeConfig;
use crate::error::RriError;
use crate::report::Reporter;
use crate::retry::RetryBudget;
use crate::session::{RegistryConnector, SessionRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Available,
    Unavailable,
}

impl Outcome {
    /// 0 for success, 2 for failure. No other code is ever produced.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Available => 0,
            Outcome::Unavailable => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub outcome: Outcome,
    /// Attempts made, including the initial one.
    pub attempts: u32,
    /// Failure reports written.
    pub failures: u32,
}

impl ProbeOutcome {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

pub struct Probe<C> {
    connector: C,
    config: ProbeConfig,
}

impl<C: RegistryConnector> Probe<C> {
    pub fn new(connector: C, config: ProbeConfig) -> Self {
        Self { connector, config }
    }

    pub async fn run<O: Write, E: Write>(&self, reporter: &mut Reporter<O, E>) -> ProbeOutcome {
        let mut runner = SessionRunner::new(&self.connector, &self.config);
        let mut budget = RetryBudget::new(self.config.max_retries);
        // Failed attempts awaiting their report, oldest first.
        let mut pending: Vec<RriError> = Vec::new();
        let mut attempts = 0u32;

        let outcome = loop {
            attempts += 1;
            match runner.attempt().await {
                Ok(timings) => {
                    reporter.report_success(&timings);
                    runner.release().await;
                    info!(attempts, total_ms = timings.total_ms(), "RRI available");
                    break Outcome::Available;
                }
                Err(e) => {
                    warn!(attempt = attempts, error = %e, "Attempt failed");
                    pending.push(e);
                    if !budget.try_consume() {
                        break Outcome::Unavailable;
                    }
                    // The next attempt logs out the held connection before dialing.
                }
            }
        };

        let failures = pending.len() as u32;
        while let Some(error) = pending.pop() {
            reporter.report_failure(&error);
            runner.release().await;
        }

        if outcome == Outcome::Unavailable {
            warn!(attempts, "RRI unavailable, retries exhausted");
        }

        ProbeOutcome {
            outcome,
            attempts,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::error::Result;
    use crate::rri::Response;
    use crate::session::{RegistrySession, TransportOptions};

    #[derive(Debug, Clone, Copy)]
    enum Step {
        ConnectFails,
        LoginFails,
        QueryFails,
        Negative,
        Succeeds,
    }

    #[derive(Default)]
    struct Calls {
        connects: AtomicUsize,
        logouts: AtomicUsize,
    }

    struct ScriptedConnector {
        script: Mutex<Vec<Step>>,
        calls: Arc<Calls>,
    }

    impl ScriptedConnector {
        fn new(steps: &[Step]) -> Self {
            let mut script = steps.to_vec();
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Arc::new(Calls::default()),
            }
        }
    }

    struct ScriptedSession {
        step: Step,
        attempt: usize,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl RegistryConnector for ScriptedConnector {
        type Session = ScriptedSession;

        async fn connect(
            &self,
            _target: &str,
            _options: &TransportOptions,
        ) -> Result<ScriptedSession> {
            let attempt = self.calls.connects.fetch_add(1, Ordering::SeqCst) + 1;
            let step = self
                .script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Step::ConnectFails);
            if let Step::ConnectFails = step {
                return Err(RriError::Other(format!("refused #{}", attempt)));
            }
            Ok(ScriptedSession {
                step,
                attempt,
                calls: self.calls.clone(),
            })
        }
    }

    #[async_trait]
    impl RegistrySession for ScriptedSession {
        async fn login(&mut self, _account: &str, _secret: &str) -> Result<()> {
            match self.step {
                Step::LoginFails => Err(RriError::Other(format!("bad login #{}", self.attempt))),
                _ => Ok(()),
            }
        }

        async fn check_domain(&mut self, _domain: &str) -> Result<Response> {
            match self.step {
                Step::QueryFails => Err(RriError::Other(format!("reset #{}", self.attempt))),
                Step::Negative => Ok(Response::failed()),
                _ => Ok(Response::success()),
            }
        }

        async fn logout(&mut self) -> Result<()> {
            self.calls.logouts.fetch_add(1, Ordering::SeqCst);
            Err(RriError::Other("logout always fails here".to_string()))
        }
    }

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    struct Run {
        result: ProbeOutcome,
        stdout: Vec<String>,
        stderr: String,
        connects: usize,
        logouts: usize,
    }

    async fn execute(steps: &[Step], retries: u32) -> Run {
        let connector = ScriptedConnector::new(steps);
        let calls = connector.calls.clone();
        let config =
            ProbeConfig::new("rri.test", "acc", "pw", "denic.de").with_max_retries(retries);
        let probe = Probe::new(connector, config);

        let mut reporter = Reporter::new(Vec::new(), Vec::new(), started());
        let result = probe.run(&mut reporter).await;
        let (out, err) = reporter.into_inner();

        Run {
            result,
            stdout: String::from_utf8(out)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect(),
            stderr: String::from_utf8(err).unwrap(),
            connects: calls.connects.load(Ordering::SeqCst),
            logouts: calls.logouts.load(Ordering::SeqCst),
        }
    }

    const FAILURE_LINE: &str =
        "extmon,service=rri,ordertype=CHECK available=0,login=0,order=0,total=0 1709294400";

    #[tokio::test]
    async fn test_first_attempt_success() {
        let run = execute(&[Step::Succeeds], 3).await;
        assert_eq!(run.result.outcome, Outcome::Available);
        assert_eq!(run.result.exit_code(), 0);
        assert_eq!(run.result.attempts, 1);
        assert_eq!(run.stdout.len(), 1);
        assert!(run.stdout[0].starts_with("extmon,service=rri,ordertype=CHECK available=1,"));
        assert!(run.stdout[0].ends_with(" 1709294400"));
        assert_eq!(run.logouts, 1);
    }

    #[tokio::test]
    async fn test_failing_login_reports_once_per_attempt() {
        let run = execute(&[Step::LoginFails; 8], 3).await;
        assert_eq!(run.result.exit_code(), 2);
        assert_eq!(run.result.attempts, 4);
        assert_eq!(run.result.failures, 4);
        assert_eq!(run.connects, 4);
        assert_eq!(run.stdout, vec![FAILURE_LINE; 4]);
        assert_eq!(run.stderr.matches("ERROR: login failed: bad login").count(), 4);
    }

    #[tokio::test]
    async fn test_failure_reports_unwind_most_recent_first() {
        let run = execute(&[Step::LoginFails; 3], 2).await;
        let first = run.stderr.find("bad login #3").unwrap();
        let second = run.stderr.find("bad login #2").unwrap();
        let third = run.stderr.find("bad login #1").unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let run = execute(
            &[Step::ConnectFails, Step::Negative, Step::Succeeds],
            3,
        )
        .await;
        assert_eq!(run.result.outcome, Outcome::Available);
        assert_eq!(run.result.attempts, 3);
        assert_eq!(run.result.failures, 2);
        assert_eq!(run.stdout.len(), 3);
        assert_eq!(
            run.stdout.iter().filter(|l| l.contains("available=1")).count(),
            1
        );
        assert_eq!(
            run.stdout.iter().filter(|l| l.as_str() == FAILURE_LINE).count(),
            2
        );
        assert!(run.stderr.contains("ERROR: invalid response from RRI"));
        assert!(run.stderr.contains("ERROR: could not connect to RRI server: refused #1"));
    }

    #[tokio::test]
    async fn test_success_on_last_allowed_attempt() {
        let run = execute(&[Step::QueryFails, Step::QueryFails, Step::Succeeds], 2).await;
        assert_eq!(run.result.exit_code(), 0);
        assert_eq!(run.result.failures, 2);
        assert!(run.stderr.contains("ERROR: SendQuery() failed: reset #2"));
    }

    #[tokio::test]
    async fn test_no_retries_means_single_attempt() {
        let run = execute(&[Step::Negative, Step::Succeeds], 0).await;
        assert_eq!(run.result.exit_code(), 2);
        assert_eq!(run.connects, 1);
        assert_eq!(run.stdout, vec![FAILURE_LINE]);
    }

    #[tokio::test]
    async fn test_held_connections_released_before_reconnect_and_at_end() {
        // Three connections open, each is logged out exactly once.
        let run = execute(&[Step::Negative, Step::LoginFails, Step::QueryFails], 2).await;
        assert_eq!(run.connects, 3);
        assert_eq!(run.logouts, 3);
        assert_eq!(run.result.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_connect_failures_never_logout_missing_connection() {
        let run = execute(&[Step::ConnectFails; 4], 3).await;
        assert_eq!(run.logouts, 0);
        assert_eq!(run.stdout, vec![FAILURE_LINE; 4]);
    }

    #[tokio::test]
    async fn test_exit_code_is_always_zero_or_two() {
        let scripts: [&[Step]; 5] = [
            &[Step::Succeeds],
            &[Step::ConnectFails],
            &[Step::LoginFails, Step::Succeeds],
            &[Step::QueryFails, Step::Negative],
            &[Step::Negative, Step::Negative, Step::Negative, Step::Succeeds],
        ];
        for script in scripts {
            let run = execute(script, 1).await;
            let available = run.stdout.iter().filter(|l| l.contains("available=1")).count();
            match run.result.exit_code() {
                0 => assert_eq!(available, 1),
                2 => assert_eq!(available, 0),
                other => panic!("unexpected exit code {}", other),
            }
        }
    }
}
