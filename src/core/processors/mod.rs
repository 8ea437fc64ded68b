// src/core/processors/mod.rs

//! Record transformations. Each processor is a pure function from one
//! record to a list of output rows; the selector fails fast on unknown
//! names, before any record is ingested.

pub mod copy;
pub mod news;
pub mod rottentomatoes;

use crate::core::errors::PipelineError;
use crate::core::record::{OutputRow, Record};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    Copy,
    News,
    RottenTomatoes,
}

impl FromStr for Processor {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy" => Ok(Processor::Copy),
            "news" => Ok(Processor::News),
            "rottentomatoes" => Ok(Processor::RottenTomatoes),
            other => Err(PipelineError::UnknownProcessor(other.to_string())),
        }
    }
}

impl Processor {
    /// Applies the transformation. A failure here is converted by the worker
    /// into a single error row; the pipeline never dies on a processor
    /// fault.
    pub fn process(&self, record: &Record) -> Result<Vec<OutputRow>, PipelineError> {
        match self {
            Processor::Copy => copy::process(record),
            Processor::News => news::process(record),
            Processor::RottenTomatoes => rottentomatoes::process(record),
        }
    }
}
