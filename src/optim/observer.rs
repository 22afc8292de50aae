//! Iteration callbacks for running fits
//!
//! [`CallbackObserver`] plugs into an argmin executor and hands a [`Progress`]
//! snapshot to a closure after every iteration, e.g. to drive a progress display.

use argmin::core::{observers::Observe, Error, State, KV};

/// Progress of a running fit, reported after every iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub iteration: u64,
    pub cost: f64,
    pub best_cost: f64,
}

/// An observer that forwards the progress of every iteration to a callback.
pub struct CallbackObserver {
    pub callback: Box<dyn Fn(Progress) + Send>,
}

impl CallbackObserver {
    pub fn new<F: Fn(Progress) + Send + 'static>(callback: F) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl<I> Observe<I> for CallbackObserver
where
    I: State<Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        (self.callback)(Progress {
            iteration: state.get_iter(),
            cost: state.get_cost(),
            best_cost: state.get_best_cost(),
        });
        Ok(())
    }
}
