//! Capability interface for the continuous audio sink
//!
//! The sink is the voice-call transport endpoint that reads a live PCM
//! input file. The binary provides a local playout implementation; a real
//! deployment plugs the voice transport in here.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Lowest volume accepted by the sink, in percent
pub const MIN_VOLUME: u16 = 1;
/// Highest volume accepted by the sink, in percent
pub const MAX_VOLUME: u16 = 200;

/// Edge-triggered notifications raised by the sink
///
/// `PlayoutEnded` is raised exactly once per stream exhaustion; the
/// transport glue forwards it to
/// [`SessionController::on_playout_ended`](crate::SessionController::on_playout_ended).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    PlayoutEnded,
}

/// Continuous audio sink operations consumed by the controller
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Attach to the voice transport and begin reading the input
    async fn start(&self) -> Result<()>;

    /// Stop the current playout without detaching
    async fn stop_playout(&self) -> Result<()>;

    /// Replay the current input from the beginning
    async fn restart_playout(&self) -> Result<()>;

    /// Point the sink at a new PCM input file
    async fn set_input(&self, path: &Path) -> Result<()>;

    /// Set playout volume in percent (1-200, validated by the controller)
    async fn set_volume(&self, percent: u16) -> Result<()>;

    /// Suspend playout in place
    async fn pause(&self) -> Result<()>;

    /// Resume a suspended playout
    async fn resume(&self) -> Result<()>;

    /// Whether the sink is attached to the voice transport
    fn is_connected(&self) -> bool;

    /// Detach from the voice transport
    async fn leave(&self) -> Result<()>;

    /// Detach and re-attach to the voice transport
    async fn rejoin(&self) -> Result<()>;
}
