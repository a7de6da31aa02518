//! Real-time background replacement for a webcam feed.
//!
//! Frames flow capture → [`scheduler`] → [`pipeline`] (segmentation and
//! pose models, [`refine`], [`limbs`]) → [`compositor`] → output device.

pub mod capture;
pub mod compositor;
pub mod config;
pub mod control;
pub mod geometry;
pub mod inference;
pub mod limbs;
pub mod output;
pub mod pipeline;
pub mod pose;
pub mod raster;
pub mod refine;
pub mod scheduler;
pub mod segmentation;
pub mod services;
