//! Channel name resolution from process launch arguments
//!
//! Every editor process joins exactly one channel for its lifetime. The
//! channel is picked once, at startup, from the launch arguments:
//!
//! - `--detached` as the only argument selects detached mode (no bus
//!   participation, pure local editing);
//! - `--channel <NAME>` selects an explicit channel;
//! - anything else falls through to the default shared channel, so
//!   unconfigured instances synchronize with each other out of the box.

use std::fmt;

/// Channel joined by all instances launched without arguments
pub const DEFAULT_CHANNEL: &str = "allusers";

/// Reserved name for the detached (local-only) mode
const DETACHED_NAME: &str = "detached";

/// The broadcast domain an editor process participates in
///
/// Resolved once at startup and fixed for the process lifetime. Detached
/// mode means no registration, no subscription, and no outbound events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelName {
    /// No bus participation; local editing only
    Detached,
    /// A named broadcast domain shared with other processes
    Named(String),
}

impl ChannelName {
    /// Resolve the channel from raw launch arguments (`argv`, including
    /// the program name at index 0)
    ///
    /// Precedence:
    /// 1. exactly one argument and it is `--detached` => detached mode;
    /// 2. `--channel` followed by a value => that value, verbatim;
    /// 3. otherwise => [`DEFAULT_CHANNEL`].
    ///
    /// Malformed argument lists (a bare `--channel`, unknown flags) fall
    /// through to the default; there are no error conditions.
    ///
    /// An explicit `--channel detached` is normalized to detached mode:
    /// the reserved name always means "no synchronization".
    pub fn from_args(args: &[String]) -> Self {
        if args.len() == 2 && args[1] == "--detached" {
            return ChannelName::Detached;
        }
        if args.len() > 2 && args[1] == "--channel" {
            return Self::named(&args[2]);
        }
        ChannelName::Named(DEFAULT_CHANNEL.to_string())
    }

    /// Create a channel from an explicit name, normalizing the reserved
    /// `detached` name to detached mode
    pub fn named(name: &str) -> Self {
        if name == DETACHED_NAME {
            ChannelName::Detached
        } else {
            ChannelName::Named(name.to_string())
        }
    }

    /// The default shared channel
    pub fn default_shared() -> Self {
        ChannelName::Named(DEFAULT_CHANNEL.to_string())
    }

    /// Whether this process stays off the bus entirely
    pub fn is_detached(&self) -> bool {
        matches!(self, ChannelName::Detached)
    }

    /// The channel name as a plain string (`detached` for detached mode)
    pub fn as_str(&self) -> &str {
        match self {
            ChannelName::Detached => DETACHED_NAME,
            ChannelName::Named(name) => name,
        }
    }

    /// The addressable peer name this process registers under on the bus
    ///
    /// Scoped by the channel so that registration conflicts only occur
    /// between instances of the same channel.
    pub fn peer_name(&self) -> String {
        format!("org.padsync.{}", self.as_str())
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
