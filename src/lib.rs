//! band-trader - Band automaton for spread and single-instrument strategies
//!
//! Computes a decision statistic from rolling history, derives entry and exit
//! bands from it and drives a FLAT / LONG_SPREAD / SHORT_SPREAD position
//! through absolute target commands. Pairs can be gated by an Engle-Granger
//! cointegration test.
//!
//! # Modules
//!
//! - `domain`: Core value types (Side, PositionState, Series, InstrumentPair)
//! - `ports`: Trait abstractions (MarketDataPort, ExecutionPort)
//! - `strategy`: Statistics, bands, sizing and the position automaton
//! - `application`: Pair engine, reconciler and session tracking
//! - `config`: Configuration loading and validation
//! - `adapters`: Replay feed, paper broker and CLI

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod application;
pub mod config;
pub mod adapters;
