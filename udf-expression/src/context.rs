use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Parser;
use tracing::{debug, trace};
use udf_data::{DateTimePattern, SessionTimezone, DEFAULT_TIMESTAMP_PATTERN};
use udf_errors::UdfResult;

/// Source of the current instant
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Per-session settings which affect the result of built-in functions
#[derive(Parser, Debug, Clone)]
pub struct SessionOptions {
    /// Timezone used to convert instants into civil time.
    ///
    /// Accepts IANA names (`Asia/Seoul`) or fixed offsets (`GMT+9`, `UTC-05:30`).
    #[arg(long, env = "TIMEZONE", default_value = "GMT")]
    pub timezone: String,

    /// Pattern used by `sysdate()` when called without one
    #[arg(long, env = "SYSDATE_FORMAT", default_value = DEFAULT_TIMESTAMP_PATTERN)]
    pub sysdate_format: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timezone: "GMT".to_owned(),
            sysdate_format: DEFAULT_TIMESTAMP_PATTERN.to_owned(),
        }
    }
}

/// Read-only state shared by every evaluation within a single statement.
///
/// The current instant is read from the clock at most once per context: the first evaluation that
/// needs it captures it, and every later evaluation (on any thread) sees the same value.
#[derive(Debug)]
pub struct EvaluationContext {
    timezone: SessionTimezone,
    default_pattern: DateTimePattern,
    clock: Arc<dyn Clock>,
    statement_time: OnceLock<DateTime<Utc>>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new(SessionTimezone::default())
    }
}

impl EvaluationContext {
    pub fn new(timezone: SessionTimezone) -> Self {
        Self {
            timezone,
            default_pattern: DateTimePattern::default(),
            clock: Arc::new(SystemClock),
            statement_time: OnceLock::new(),
        }
    }

    /// Resolve the timezone and default pattern given in `options`.
    pub fn from_options(options: &SessionOptions) -> UdfResult<Self> {
        let timezone: SessionTimezone = options.timezone.parse()?;
        debug!(%timezone, sysdate_format = %options.sysdate_format, "Resolved session options");
        Self::new(timezone).with_default_pattern(&options.sysdate_format)
    }

    pub fn with_default_pattern(mut self, pattern: &str) -> UdfResult<Self> {
        self.default_pattern = DateTimePattern::compile(pattern)?;
        Ok(self)
    }

    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn timezone(&self) -> SessionTimezone {
        self.timezone
    }

    pub fn default_pattern(&self) -> &DateTimePattern {
        &self.default_pattern
    }

    /// The instant the statement is considered to run at
    pub fn statement_time(&self) -> DateTime<Utc> {
        *self.statement_time.get_or_init(|| {
            let now = self.clock.now();
            trace!(%now, "Captured statement time");
            now
        })
    }

    /// The statement time, as civil time in the session timezone
    pub fn civil_now(&self) -> NaiveDateTime {
        self.timezone.civil_now(&self.statement_time())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::TimeZone;

    use super::*;

    /// Advances by one second every time it is read
    #[derive(Debug, Default)]
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.0.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(1_459_468_800 + secs, 0).unwrap()
        }
    }

    #[test]
    fn statement_time_is_captured_once() {
        let ctx = EvaluationContext::default().with_clock(TickingClock::default());
        let first = ctx.statement_time();
        assert_eq!(ctx.statement_time(), first);
        assert_eq!(ctx.statement_time(), first);
    }

    #[test]
    fn fresh_contexts_read_the_clock_again() {
        let clock = Arc::new(TickingClock::default());
        #[derive(Debug)]
        struct Shared(Arc<TickingClock>);
        impl Clock for Shared {
            fn now(&self) -> DateTime<Utc> {
                self.0.now()
            }
        }

        let a = EvaluationContext::default().with_clock(Shared(clock.clone()));
        let b = EvaluationContext::default().with_clock(Shared(clock));
        assert_ne!(a.statement_time(), b.statement_time());
    }

    #[test]
    fn civil_now_uses_timezone() {
        let instant = Utc.with_ymd_and_hms(2016, 3, 31, 20, 0, 0).unwrap();
        let ctx = EvaluationContext::new("Asia/Seoul".parse().unwrap())
            .with_clock(FixedClock(instant));
        assert_eq!(ctx.civil_now().to_string(), "2016-04-01 05:00:00");
    }

    #[test]
    fn from_options() {
        let options = SessionOptions::parse_from([
            "test",
            "--timezone",
            "GMT-6",
            "--sysdate-format",
            "yyyyMMdd",
        ]);
        let ctx = EvaluationContext::from_options(&options).unwrap();
        assert_eq!(ctx.timezone().to_string(), "GMT-06:00");
        assert_eq!(ctx.default_pattern().as_str(), "yyyyMMdd");

        let options = SessionOptions {
            timezone: "Nowhere/Special".to_owned(),
            ..Default::default()
        };
        assert!(EvaluationContext::from_options(&options).is_err());
    }

    #[test]
    fn new_uses_default_timestamp_pattern() {
        let ctx = EvaluationContext::new(SessionTimezone::default());
        assert_eq!(ctx.default_pattern().as_str(), DEFAULT_TIMESTAMP_PATTERN);
        assert_eq!(
            ctx.default_pattern(),
            &DateTimePattern::compile(DEFAULT_TIMESTAMP_PATTERN).unwrap()
        );
    }

    #[test]
    fn malformed_default_pattern() {
        let res = EvaluationContext::default().with_default_pattern("\"YYYY");
        assert!(res.unwrap_err().is_malformed_pattern());
    }
}
