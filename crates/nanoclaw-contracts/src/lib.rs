//! Boundary contracts for the container agent runner.
//!
//! The host writes one [`ContainerInput`] to the runner's stdin and reads one
//! [`ContainerOutput`] back from stdout, framed between the sentinel lines in
//! [`framing`].

pub mod framing;
pub mod request;
pub mod response;

pub use framing::{OUTPUT_END_MARKER, OUTPUT_START_MARKER, extract_framed_output, frame_output};
pub use request::{
    ApprovalPolicy, AuthMethod, CodexConfig, ContainerInput, InputError, Provider, ProviderConfig,
};
pub use response::{ContainerOutput, OutputStatus};
