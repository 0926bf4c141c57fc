//! Infrastructure layer - Storage backends and process setup

pub mod logging;
pub mod storage;
pub mod webhook;
