//! Core types: the processor capability and tracing setup.

pub mod processor;
pub mod tracing;

pub use processor::{
    BoxFuture, ProcessingError, ProcessingResult, Processor, ProcessorOutput, SharedProcessor,
};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
