//! Host substrate for the motive animation engine.
//!
//! The engine never talks to a windowing system or render loop directly.
//! Everything it needs from the outside world is expressed here:
//! - `Host`: frame scheduling, a monotonic clock, and interaction handles
//! - `HeadlessHost`: a deterministic implementation for tests, tools, and
//!   the demo binary
//! - `InteractionRegistry`: counted handles signalling "animation in flight"
//!
//! A real embedding implements `Host` on top of its own frame callback
//! mechanism (vsync, display link, event loop timer) and hands the engine a
//! shared handle.

pub mod headless;
pub mod host;
pub mod interaction;

pub use headless::HeadlessHost;
pub use host::{FrameCallback, FrameToken, Host, InteractionHandle};
pub use interaction::InteractionRegistry;
