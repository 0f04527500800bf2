//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                position,
                operation,
            } => {
                info!(
                    "START | position={} operation={}",
                    position.label(),
                    operation.label()
                );
            }
            AppEvent::DriveChanged(drive) => {
                info!("DRIVE | {}", drive.label());
            }
            AppEvent::OperationChanged { from, to } => {
                info!("OP    | {} -> {}", from.label(), to.label());
            }
            AppEvent::ReachedCard(card) => {
                info!("SEQ   | reached {}", card);
            }
            AppEvent::RecoveryRetracted => {
                info!("SEQ   | fully retracted, extending to middle");
            }
            AppEvent::SequenceComplete(report) => {
                info!("SEQ   | complete | {}", report.summary());
                debug!("SEQ   | report {}", report.to_json());
            }
            AppEvent::PositionCaptured(report) => {
                info!("CAL   | middle captured | {}", report.summary());
                debug!("CAL   | report {}", report.to_json());
            }
            AppEvent::DriftUpdated {
                card,
                accumulated_ms,
            } => {
                info!("DRIFT | {} accumulator={}ms", card, accumulated_ms);
            }
            AppEvent::TimingCaptured { elapsed_ms } => {
                info!("CAL   | manual timing {}ms", elapsed_ms);
            }
            AppEvent::TimedComplete(label) => {
                info!("TIMED | {}", label);
            }
            AppEvent::LegacyTapComplete => {
                info!("TAP   | legacy tap complete");
            }
            AppEvent::TapRedirected { requested } => {
                warn!("SEQ   | {} requested away from middle, resetting", requested);
            }
            AppEvent::SafetyStop { drive } => {
                warn!("SAFETY| {} stopped by watchdog", drive.label());
            }
            AppEvent::PowerSourceChanged(source) => {
                info!("POWER | {}", source);
            }
            AppEvent::CommandRejected { command, reason } => {
                warn!("REJECT| {}: {}", command, reason);
            }
        }
    }
}
