//! Runtime Information
//!
//! A tree mirroring the execution tree, attached after a successful
//! `compute_result`: descriptor, timing, rows produced, and child
//! runtime-info records (§4.5, grounded on `RuntimeInformation` as
//! referenced from `HasPredicateScan.cpp`'s `getRuntimeInfo()`/
//! `addChild()`).

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RuntimeInfo {
    pub descriptor: String,
    pub rows_produced: usize,
    pub cols_produced: usize,
    pub elapsed: Duration,
    pub children: Vec<RuntimeInfo>,
}

impl RuntimeInfo {
    pub fn new(descriptor: impl Into<String>) -> Self {
        RuntimeInfo {
            descriptor: descriptor.into(),
            ..Default::default()
        }
    }

    pub fn with_result(mut self, rows: usize, cols: usize, elapsed: Duration) -> Self {
        self.rows_produced = rows;
        self.cols_produced = cols;
        self.elapsed = elapsed;
        self
    }

    pub fn add_child(&mut self, child: RuntimeInfo) {
        self.children.push(child);
    }
}
