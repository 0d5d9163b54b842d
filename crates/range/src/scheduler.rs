//! Plays cue schedules back on tokio timers.

use std::time::Duration;

use anyhow::Result;
use armory_core::Cue;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct CuePlayer {
    realtime: bool,
}

impl CuePlayer {
    pub fn new(realtime: bool) -> Self {
        Self { realtime }
    }

    /// Write each cue to `out` after its delay. Returns the schedule's total length.
    pub async fn play<W>(&self, cues: &[Cue], out: &mut W) -> Result<Duration>
    where
        W: AsyncWrite + Unpin,
    {
        let mut elapsed = Duration::ZERO;
        for cue in cues {
            if self.realtime && !cue.delay.is_zero() {
                tokio::time::sleep(cue.delay).await;
            }
            elapsed += cue.delay;
            trace!(cue = %cue.kind, blocking = cue.blocking, "cue");
            let marker = if cue.blocking { "*" } else { " " };
            let line = format!("  {marker} {:>6.2}s  {}\n", elapsed.as_secs_f64(), cue.kind);
            out.write_all(line.as_bytes()).await?;
        }
        out.flush().await?;
        Ok(elapsed)
    }
}
