//! Test Helper Utilities
//!
//! Shared utilities for testing tunegraph-enrich

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;

pub use db_utils::{
    catalog_track, create_music_files, create_test_db, music_mapper, seed_track, test_orchestrator,
};
pub use fakes::{
    FakeCatalog, FakeFeatures, FakeFingerprints, FakeSocial, FakeTagProbe, FakeTempo,
};
