use super::{DimensionProbe, ImageInfo, ImageRequest};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

/// Answers from a fixed table, optionally after sleeping.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProbe {
    known: HashMap<String, ImageInfo>,
    delay: Option<Duration>,
}

impl InMemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, cid: &str, info: ImageInfo) -> Self {
        self.known.insert(cid.to_string(), info);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl DimensionProbe for InMemoryProbe {
    fn probe(&self, request: &ImageRequest) -> Option<ImageInfo> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.known.get(&request.cid).cloned()
    }
}
