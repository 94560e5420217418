//! Adaptive session lifetime.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Upper bound on any session lifetime (30 days).
pub const MAX_LIFETIME_SECS: i64 = 2_592_000;

/// Lifetime granted to crawlers and other bots.
pub const BOT_LIFETIME_SECS: i64 = 30;

/// Seconds granted per cubed read.
pub const READ_FACTOR_SECS: i64 = 30;

/// User agent tokens that mark a client as a bot (case-insensitive).
pub const DEFAULT_BOT_PATTERN: &str = "bot|crawl|slurp|spider|mediapartners";

/// Above this many reads the cube already exceeds the cap.
const CUBE_READS_LIMIT: i64 = 100;

static DEFAULT_BOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(DEFAULT_BOT_PATTERN)
        .case_insensitive(true)
        .build()
        .expect("default bot pattern is valid")
});

/// Computes how long a session lives from its read count and client.
///
/// Bots get a short fixed lifetime. Everyone else gets
/// `reads³ × read_factor_secs`, capped at `max_lifetime_secs`.
#[derive(Debug, Clone)]
pub struct LifetimePolicy {
    pub max_lifetime_secs: i64,
    pub bot_lifetime_secs: i64,
    pub read_factor_secs: i64,
    bot_pattern: Regex,
}

impl Default for LifetimePolicy {
    fn default() -> Self {
        Self {
            max_lifetime_secs: MAX_LIFETIME_SECS,
            bot_lifetime_secs: BOT_LIFETIME_SECS,
            read_factor_secs: READ_FACTOR_SECS,
            bot_pattern: DEFAULT_BOT_REGEX.clone(),
        }
    }
}

impl LifetimePolicy {
    /// Create a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lifetime cap.
    pub fn with_max_lifetime(mut self, secs: i64) -> Self {
        self.max_lifetime_secs = secs;
        self
    }

    /// Set the bot lifetime.
    pub fn with_bot_lifetime(mut self, secs: i64) -> Self {
        self.bot_lifetime_secs = secs;
        self
    }

    /// Set the per-read factor.
    pub fn with_read_factor(mut self, secs: i64) -> Self {
        self.read_factor_secs = secs;
        self
    }

    /// Replace the bot signature, matched case-insensitively.
    pub fn with_bot_pattern(mut self, pattern: &str) -> crate::Result<Self> {
        self.bot_pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(self)
    }

    /// The bot signature in use.
    pub fn bot_pattern(&self) -> &str {
        self.bot_pattern.as_str()
    }

    /// Whether the user agent looks like a bot.
    pub fn is_bot(&self, user_agent: &str) -> bool {
        self.bot_pattern.is_match(user_agent)
    }

    /// Lifetime in seconds for a session read `reads` times by `user_agent`.
    pub fn calculate(&self, reads: i64, user_agent: &str) -> i64 {
        if self.is_bot(user_agent) {
            return self.bot_lifetime_secs;
        }

        let reads = reads.max(0);
        let lifetime = if reads > CUBE_READS_LIMIT {
            self.max_lifetime_secs
        } else {
            reads.pow(3).saturating_mul(self.read_factor_secs)
        };

        lifetime.min(self.max_lifetime_secs)
    }

    /// Lifetime assumed for a session that was read once and never written.
    pub fn unwritten_lifetime_secs(&self) -> i64 {
        self.calculate(1, "")
    }
}

/// Lifetime under the default policy.
pub fn calculate_lifetime(reads: i64, user_agent: &str) -> i64 {
    LifetimePolicy::default().calculate(reads, user_agent)
}
