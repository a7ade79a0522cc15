//! Stateful Firmata board engine
//!
//! Sits on top of [`firmata_protocol`] and adds everything a running
//! connection needs: pin, port, and channel state tables, bounded
//! observation histories, change detection, idempotent outbound writes,
//! and a typed event stream. The engine is single-threaded and
//! poll-driven; call [`Board::update`] from your loop and act on the
//! events it returns.
//!
//! ```
//! use firmata_board::{Board, BoardEvent, MemoryTransport};
//!
//! let mut board = Board::new(MemoryTransport::new());
//! board.connect().unwrap();
//!
//! // The board answers the firmware query
//! board
//!     .transport_mut()
//!     .feed(&[0xF0, 0x79, 0x02, 0x05, b'S', 0, b'F', 0, 0xF7]);
//!
//! let events = board.update().unwrap();
//! assert!(events.contains(&BoardEvent::Initialized));
//! assert_eq!(board.identity().firmware_name, "SF");
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod state;
pub mod transport;

pub use engine::{Board, BoardConfig};
pub use error::BoardError;
pub use events::BoardEvent;
pub use history::History;
pub use state::{AnalogChannelState, BoardIdentity, PinState, PortState};
pub use transport::{MemoryTransport, SerialTransport, Transport};
