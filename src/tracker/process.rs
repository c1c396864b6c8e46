//! Mapping of OS thread and process IDs to unique internal IDs (utid/upid).
//!
//! A thread is identified by its `(pid, tid)` pair, so a tid reused by a
//! different process gets a fresh utid. Values are handed out sequentially
//! and written to the process and thread tables as they are created.

use std::collections::HashMap;

use crate::storage::{TraceStorage, Upid, Utid};

/// Initial capacity for thread ID map. Sized to handle typical systems without rehashing.
const INITIAL_TID_CAPACITY: usize = 4096;

/// Initial capacity for process ID map. Typically fewer processes than threads.
const INITIAL_PID_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct ProcessTracker {
    /// Mapping from (pid, tid) -> utid
    threads: HashMap<(i32, i32), Utid>,

    /// Mapping from pid -> upid
    processes: HashMap<i32, Upid>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self {
            threads: HashMap::with_capacity(INITIAL_TID_CAPACITY),
            processes: HashMap::with_capacity(INITIAL_PID_CAPACITY),
        }
    }

    /// Get or create the upid for `pid`.
    pub fn get_or_create_process(&mut self, storage: &mut TraceStorage, pid: i32) -> Upid {
        *self
            .processes
            .entry(pid)
            .or_insert_with(|| storage.insert_process(pid))
    }

    /// Get or create the utid for thread `tid` of process `pid`.
    pub fn update_thread(&mut self, storage: &mut TraceStorage, tid: i32, pid: i32) -> Utid {
        if let Some(utid) = self.threads.get(&(pid, tid)) {
            return *utid;
        }
        let upid = self.get_or_create_process(storage, pid);
        let utid = storage.insert_thread(tid, upid);
        self.threads.insert((pid, tid), utid);
        utid
    }

    /// Get utid for a thread if it exists, without creating a new one.
    pub fn get_thread(&self, tid: i32, pid: i32) -> Option<Utid> {
        self.threads.get(&(pid, tid)).copied()
    }
}

impl Default for ProcessTracker {
    fn default() -> Self {
        Self::new()
    }
}
