//! # comfy-cloud-video
//!
//! Async Rust client for [ComfyUI Cloud](https://cloud.comfy.org) text-to-video
//! generation with the LTX-2 model.
//!
//! Provides a workflow builder for the two-pass LTX-2 graph, a client for the
//! submit / poll / history / download job API, and the driver behind the
//! `generate-video` command-line tool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use comfy_cloud_video::{CloudClient, LtxVideoRequest};
//! use std::time::Duration;
//!
//! # async fn example() -> comfy_cloud_video::Result<()> {
//! let client = CloudClient::new(std::env::var("COMFY_UI_API_KEY").unwrap_or_default());
//!
//! let (workflow, seed) = LtxVideoRequest::new("a red fox running through snow")
//!     .frames(121)
//!     .fps(24)
//!     .build();
//! println!("Seed: {}", seed);
//!
//! let prompt_id = client.submit(&workflow).await?;
//! client
//!     .wait_for_completion(
//!         &prompt_id,
//!         Duration::from_secs(5),
//!         Duration::from_secs(600),
//!         |u| eprintln!("[{}] {}s", u.status, u.elapsed.as_secs()),
//!     )
//!     .await?;
//!
//! let filename = client.output_filename(&prompt_id).await?;
//! let bytes = client.download(&filename, "fox.mp4").await?;
//! println!("Saved {} bytes", bytes);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod error;
pub mod logging;
pub mod types;
pub mod workflow;

pub use client::CloudClient;
pub use error::{CloudError, Result};
pub use types::{GenerationResult, JobHistory, JobState, JobStatus, StatusUpdate};
pub use workflow::{InputValue, LtxVideoRequest, NodeSpec, WorkflowGraph, WorkflowParams};
