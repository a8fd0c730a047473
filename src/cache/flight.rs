use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::cache::CacheKey;
use crate::error::ResizeError;
use crate::models::Outcome;

pub type FlightResult = Result<Outcome, ResizeError>;

struct Flight {
    result: Mutex<Option<FlightResult>>,
    cv: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn set(&self, result: FlightResult) {
        let mut slot = self.result.lock();
        *slot = Some(result);
        self.cv.notify_all();
    }

    fn wait(&self) -> FlightResult {
        let mut guard = self.result.lock();
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            self.cv.wait(&mut guard);
        }
    }
}

/// Collapses concurrent work on the same key: one caller runs it, the others
/// wait for and share its result.
#[derive(Default)]
pub struct FlightMap {
    flights: Mutex<HashMap<CacheKey, Arc<Flight>>>,
}

// Publishes a result and removes the flight even if the leader unwinds
struct Leader<'a> {
    map: &'a FlightMap,
    key: &'a CacheKey,
    flight: Arc<Flight>,
    done: bool,
}

impl Leader<'_> {
    fn finish(mut self, result: FlightResult) {
        self.publish(result);
        self.done = true;
    }

    fn publish(&self, result: FlightResult) {
        self.flight.set(result);
        self.map.flights.lock().remove(self.key);
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.publish(Err(ResizeError::Generation(format!(
                "generation of {} was abandoned",
                self.key
            ))));
        }
    }
}

impl FlightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless another caller already is. Returns the
    /// result and whether this caller ran it.
    pub fn run<F>(&self, key: &CacheKey, work: F) -> (FlightResult, bool)
    where
        F: FnOnce() -> FlightResult,
    {
        let (flight, is_leader) = self.join(key);

        // Someone else is already on it; wait for their result
        if !is_leader {
            log::debug!("Waiting on in-flight generation of {}", key);
            return (flight.wait(), false);
        }

        let leader = Leader {
            map: self,
            key,
            flight,
            done: false,
        };
        let result = work();
        leader.finish(result.clone());
        (result, true)
    }

    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    fn join(&self, key: &CacheKey) -> (Arc<Flight>, bool) {
        let mut map = self.flights.lock();
        if let Some(existing) = map.get(key) {
            return (Arc::clone(existing), false);
        }

        let flight = Arc::new(Flight::new());
        map.insert(key.clone(), Arc::clone(&flight));
        (flight, true)
    }
}
