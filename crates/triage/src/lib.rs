//! Fast triage classification — the cheap pre-pass run before the main
//! response is generated.
//!
//! One lightweight LLM call (temperature 0, bounded output) classifies the
//! incoming message into a safety level, emotion, and route. Every failure
//! mode — missing credentials, transport errors, unparseable output,
//! missing fields — degrades to the same hard-coded safe default. This is
//! a deliberate fail-open policy for availability, not a fail-closed
//! safety policy: `analyze` never returns an error.

mod classifier;

pub use classifier::TriageClassifier;
