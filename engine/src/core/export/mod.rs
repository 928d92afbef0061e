//! Export Module
//!
//! Synchronized export of the composited preview into a single media file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Export Orchestrator                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  models.rs   - phases, progress, options, artifact naming       │
//! │  host.rs     - playback / stream / recorder / sink interfaces   │
//! │  session.rs  - the phase state machine and single-flight gate   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod host;
pub mod models;
pub mod session;

pub use host::{
    host_channel, negotiate, ArtifactSink, CombinedStream, HostEvent, HostEventReceiver,
    HostEventSender, PlaybackHost, Recorder, StreamSource,
};
pub use models::{
    extension_for, progress_percent, ExportArtifact, ExportOptions, ExportPhase, ExportProgress,
    ExportReport, RecorderConfig, MIME_PREFERENCES,
};
pub use session::{ExportOrchestrator, ExportSession};
