//! Result records and host event types

pub mod event;
pub mod result;

pub use event::{
    AttemptResult, ErrorInfo, HostEvent, RawAttachment, RawStep, RunStatus, SourceLocation,
    TestCaseInfo, TestOutcome,
};
pub use result::{Annotation, Step, StepStatus, TestResult, TestStatus};
