//! gRPC transport for the Armada submit and jobs services.
//!
//! [`GrpcJobService`] implements [`armada_core::JobService`] on top of a lazily connected
//! `tonic` channel. Messages are declared by hand in [`proto`] with the field numbers of the
//! Armada API, so no protobuf toolchain is needed at build time.
pub mod pod;
pub use pod::ContainerSpec;

pub mod proto;

mod client;
pub use client::ArmadaClient;

mod config;
pub use config::ChannelConfig;

mod convert;

mod error;
pub use error::{GrpcError, service_error};

mod service;
pub use service::GrpcJobService;

#[cfg(test)]
mod testing;
