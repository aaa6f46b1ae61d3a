//! Integration tests for the dagfs virtual filesystem

mod end_to_end;
mod persistence_round_trip;
mod properties;
mod structural_sharing;
mod support;
