//! # Test Suite for the Prediction Service
//!
//! Exercises the service, the per-station windows and the chart overlay
//! against in-process oracles, so no external predictor is needed.

mod fakes;
