//! Ordered chain of request stages.
//!
//! A [`Pipeline`] owns the iteration over its stages: each stage reports an
//! [`Outcome`] and the pipeline decides whether the next one runs. Stages never call
//! each other.
//!
//! ```no_run
//! use micro_ingest_web::{AcceptGuard, BodyParserConfig, Pipeline, Request};
//!
//! # async fn run(mut req: Request) -> Result<(), micro_ingest_web::BodyError> {
//! let pipeline = Pipeline::builder()
//!     .add_last(AcceptGuard::new(["json"]))
//!     .body_parser(BodyParserConfig::default().max_body_size(1024 * 1024))
//!     .build();
//!
//! let flow = pipeline.execute(&mut req).await?;
//! # Ok(())
//! # }
//! ```

use crate::body::ResponseBody;
use crate::config::{BodyParserConfig, PipelineConfig};
use crate::error::BodyError;
use crate::guard::{AcceptGuard, DateGuard, ExpiryGuard};
use crate::ingest::body_parser;
use crate::request::Request;
use async_trait::async_trait;
use http::Response;
use std::fmt;
use tracing::{debug, trace};

/// What a stage decided about the request.
#[derive(Debug)]
pub enum Outcome {
    Continue,
    Abort(BodyError),
    /// The stage answered the request itself, later stages must not run.
    Terminate(Response<ResponseBody>),
}

impl From<Result<(), BodyError>> for Outcome {
    fn from(result: Result<(), BodyError>) -> Self {
        match result {
            Ok(()) => Outcome::Continue,
            Err(e) => Outcome::Abort(e),
        }
    }
}

/// How a pipeline run ended when no stage aborted.
#[derive(Debug)]
pub enum Flow {
    Completed,
    Terminated(Response<ResponseBody>),
}

#[async_trait]
pub trait Stage: Send + Sync {
    async fn process(&self, req: &mut Request) -> Outcome;

    fn name(&self) -> &'static str;
}

pub struct Pipeline {
    inner: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Assembles the standard chain: accept, date and expiry guards followed by the
    /// body reader and dispatcher, each only when its section is configured.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut builder = Self::builder();

        if let Some(accept) = &config.accept {
            builder = builder.add_last(AcceptGuard::new(accept.acceptable.iter()));
        }
        if let Some(date) = &config.date {
            builder = builder.add_last(DateGuard::new(date.clock_skew));
        }
        if let Some(expiry) = &config.expiry {
            builder = builder.add_last(ExpiryGuard::new(expiry.header.clone()));
        }
        if let Some(body_parser) = &config.body_parser {
            builder = builder.body_parser(body_parser.clone());
        }

        builder.build()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.inner.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order until one of them aborts or terminates.
    pub async fn execute(&self, req: &mut Request) -> Result<Flow, BodyError> {
        for stage in &self.inner {
            trace!(stage = stage.name(), "run stage");
            match stage.process(req).await {
                Outcome::Continue => {}
                Outcome::Abort(e) => {
                    debug!(stage = stage.name(), code = e.code(), cause = %e, "pipeline aborted");
                    return Err(e);
                }
                Outcome::Terminate(response) => {
                    debug!(stage = stage.name(), status = %response.status(), "pipeline terminated");
                    return Ok(Flow::Terminated(response));
                }
            }
        }
        Ok(Flow::Completed)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.stage_names()).finish()
    }
}

#[async_trait]
impl Stage for Pipeline {
    async fn process(&self, req: &mut Request) -> Outcome {
        match self.execute(req).await {
            Ok(Flow::Completed) => Outcome::Continue,
            Ok(Flow::Terminated(response)) => Outcome::Terminate(response),
            Err(e) => Outcome::Abort(e),
        }
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

pub struct PipelineBuilder {
    inner: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn add_last<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.inner.push(Box::new(stage));
        self
    }

    pub fn add_first<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.inner.insert(0, Box::new(stage));
        self
    }

    /// Appends the body reader and the body dispatcher sharing one configuration.
    pub fn body_parser(mut self, config: BodyParserConfig) -> Self {
        self.inner.extend(body_parser(config));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline { inner: self.inner }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder").field("stages", &self.inner.len()).finish()
    }
}
