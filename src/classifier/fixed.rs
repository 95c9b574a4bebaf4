//! Classifier that answers with a preset verdict.
//!
//! Used where the outcome must be known up front: scripted demos, tests, and
//! as the shape a real model integration plugs into.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::classifier::adapter::{Classifier, Verdict};
use crate::error::ClassificationError;
use crate::intake::upload::ImageHandle;

#[derive(Debug)]
enum Response {
    Verdict(Verdict),
    Failure(String),
}

#[derive(Debug)]
pub struct FixedClassifier {
    response: Response,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn verdict(verdict: Verdict) -> Self {
        Self {
            response: Response::Verdict(verdict),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Response::Failure(reason.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of classify calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn classify(&self, _image: &ImageHandle) -> Result<Verdict, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.response {
            Response::Verdict(v) => Ok(v.clone()),
            Response::Failure(reason) => Err(ClassificationError::Failed(reason.clone())),
        }
    }
}
