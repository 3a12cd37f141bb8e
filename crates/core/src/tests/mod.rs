//! Supervisor scenarios driven with a paused tokio clock
