//! Venue Adapters
//!
//! Execution clients that hand commands to venue tasks.

mod channel_client;

pub use channel_client::{ChannelExecutionClient, VenueCommand};
