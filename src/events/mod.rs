//! # Events Module
//!
//! Progress reporting over channels.
//!
//! The core library emits events through a channel so the CLI (or any other
//! front-end) can render progress without the library knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = event_channel();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Batch(BatchEvent::FileCompleted(p)) = event {
//!             println!("{}/{} {}", p.completed, p.total, p.path.display());
//!         }
//!     }
//! });
//!
//! orchestrator.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{event_channel, null_sender, EventReceiver, EventSender};
pub use types::*;
